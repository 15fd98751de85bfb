//! Parse boundary and the per-run source unit cache.

pub mod lang;
pub mod parse;
pub mod store;
