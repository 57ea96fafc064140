//! Graph store domain logic.

pub mod edits;
pub mod errors;
pub mod mapping;
pub mod merge;
pub mod store;
