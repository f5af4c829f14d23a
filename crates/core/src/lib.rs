//! Domain logic for the dealer portal pricing backend.
//!
//! Pure functions and types only; no database access. The `db` crate loads
//! rows, this crate decides what they mean.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod money;
pub mod pricing;
pub mod sanitize;
pub mod sync;
pub mod types;
