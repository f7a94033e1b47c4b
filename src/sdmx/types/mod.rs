//! Foundational data structures, keys, queries and error types.

pub mod error;
pub mod key;
pub mod language;
pub mod models;
pub mod query;
