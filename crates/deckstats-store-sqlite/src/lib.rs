//! SQLite backend for the deckstats pipeline.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Loads go through staging tables: the
//! batch is streamed into a scratch copy of the destination, checked, and
//! merged with a single `INSERT … SELECT … ON CONFLICT` per table.

mod copy;
mod encode;
mod loader;
mod plan;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use loader::{BulkLoader, ChangedParents, Conflict};
pub use plan::{LoadPlan, deck_columns};
pub use store::SqliteStore;
