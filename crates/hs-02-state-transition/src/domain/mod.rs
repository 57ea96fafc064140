//! State transition domain logic.

pub mod coherence;
pub mod conflict;
pub mod history;
pub mod proofs;
