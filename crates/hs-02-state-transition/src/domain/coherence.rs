//! # Coherence Criterion
//!
//! A candidate state is coherent when its validity score reaches the
//! threshold and its connectivity graph is one tree: β₀ = 1, β₁ = 0.

use shared_types::{Invariants, RejectReason, StateMatrix};

/// Outcome of analysing `State + Delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The candidate state that was analysed.
    pub candidate: StateMatrix,
    /// Spectral agreement with the weighted reconstruction, in [0, 1].
    pub validity: f64,
    /// Structural invariants of the candidate.
    pub invariants: Invariants,
}

impl Evaluation {
    pub fn is_coherent(&self, threshold: f64) -> bool {
        self.validity >= threshold && self.invariants.is_coherent()
    }

    /// `Ok` when coherent, otherwise the rejection to report.
    pub fn check(&self, threshold: f64) -> Result<(), RejectReason> {
        if self.is_coherent(threshold) {
            Ok(())
        } else {
            Err(RejectReason::CoherenceRejected {
                validity: self.validity,
                invariants: self.invariants,
            })
        }
    }
}
