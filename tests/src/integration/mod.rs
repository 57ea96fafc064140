//! # Integration Scenarios
//!
//! | File | Covers |
//! |------|--------|
//! | `propagation.rs` | local edit → broadcast → merge on every replica, sync on join |
//! | `merge_gates.rs` | dimension, fingerprint, coherence claim, signature, references |
//! | `conflicts.rs` | concurrent edits under one id converge everywhere |

#[cfg(test)]
mod cluster;

pub mod conflicts;
pub mod merge_gates;
pub mod propagation;
