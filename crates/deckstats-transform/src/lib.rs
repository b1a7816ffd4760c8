//! Transformation stage: raw API records to a typed deck dataset.
//!
//! A [`Transformer`] runs an ordered list of enrichment [`Step`]s over the
//! raw [`Table`](deckstats_core::table::Table), then casts and projects it to
//! the columns declared by a [`Schema`].

mod schema;
mod steps;
mod transformer;

pub mod error;

pub use error::{Error, Result};
pub use schema::{ColumnSpec, DType, Schema};
pub use steps::{Step, deck_steps};
pub use transformer::Transformer;
