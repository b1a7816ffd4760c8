//! Run notifications.

use tracing::info;

/// Receives the outcome of a run as a subject line and a body. Delivery is
/// best effort: a notifier never fails the run.
pub trait Notifier {
  fn notify(&self, subject: &str, body: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, subject: &str, body: &str) { info!(subject, "{body}"); }
}
