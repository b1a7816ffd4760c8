//! Deck domain types, the tabular dataset passed between stages, and the
//! [`DeckStore`](store::DeckStore) seam. No HTTP or database code lives here.

#![allow(async_fn_in_trait)]

pub mod deck;
pub mod error;
pub mod store;
pub mod table;

pub use error::{Error, Result};
