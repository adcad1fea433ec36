//! Core data structures for Splice.
//!
//! - Source units, the smallest embeddable piece of library code
//! - The unit store, an immutable index from type identifiers to units

pub mod store;
pub mod unit;

pub use store::{StoreError, UnitStore};
pub use unit::SourceUnit;
