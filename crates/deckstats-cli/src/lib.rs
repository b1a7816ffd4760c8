//! The `deckstats` pipeline: configuration, the run itself, the report
//! writer and run notifications.

pub mod config;
pub mod notifier;
pub mod pipeline;
pub mod writer;

pub use config::PipelineConfig;
pub use notifier::{LogNotifier, Notifier};
pub use pipeline::{Pipeline, Run};
pub use writer::JsonLinesWriter;
