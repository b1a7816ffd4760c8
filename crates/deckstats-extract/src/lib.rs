//! Extraction stage: paginated, rate-limited reads from the deck API.
//!
//! [`Paginator`] owns page indexing, retry/backoff and request spacing;
//! [`Extractor`] drains it into a flat record list; [`Preparer`] works out
//! which season to fetch and since when.

mod extractor;
mod paginator;
mod preparer;
mod source;

pub mod error;

pub use error::{Error, Result};
pub use extractor::Extractor;
pub use paginator::{Pages, Paginator, RETRYABLE_STATUSES, RetryPolicy};
pub use preparer::{Prepared, Preparer, SEASON_FLOOR};
pub use source::{HttpSource, PageSource, Params, RawResponse};
