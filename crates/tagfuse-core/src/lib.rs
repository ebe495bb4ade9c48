//! Core types, pure matching logic and store-driven engines for the tagfuse
//! tag vocabulary.
//!
//! The normalizer, matcher and grouper are pure and synchronous. The merge
//! engine, alias resolver and metadata syncer talk to any [`store::TagStore`];
//! this crate has no database dependency.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alias;
pub mod error;
pub mod grouping;
pub mod history;
pub mod merge;
pub mod normalize;
pub mod similarity;
pub mod store;
pub mod sync;
pub mod tag;

pub use error::{Error, Result};

#[cfg(test)]
mod memory;
