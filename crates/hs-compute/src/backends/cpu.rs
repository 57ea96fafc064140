//! CPU analysis backend
//!
//! Plain sequential kernels from [`crate::domain`], run on the worker thread.

use crate::domain::{abs_cosine, decompose, power_iteration, structural_invariants};
use crate::{Analysis, AnalysisBackend, ComputeError, KernelParams};
use shared_types::StateMatrix;
use std::sync::atomic::AtomicBool;

/// CPU-based analysis backend.
pub struct CpuBackend {
    params: KernelParams,
}

impl CpuBackend {
    pub fn new(params: KernelParams) -> Self {
        Self { params }
    }
}

impl AnalysisBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn analyse(
        &self,
        candidate: &StateMatrix,
        cancel: &AtomicBool,
    ) -> Result<Analysis, ComputeError> {
        let components = decompose(candidate, self.params.zero_tolerance);
        let invariants = structural_invariants(&components, self.params.zero_tolerance);

        if !candidate.is_finite() {
            return Ok(Analysis {
                validity: 0.0,
                invariants,
                iterations: (0, 0),
            });
        }

        let reconstruction = components.reconstruct(&self.params.weights);
        let max = self.params.max_power_iterations;
        let principal = power_iteration(candidate, max, cancel)?;
        let reconstructed = power_iteration(&reconstruction, max, cancel)?;

        let validity = match (&principal.vector, &reconstructed.vector) {
            (Some(a), Some(b)) => abs_cosine(a, b),
            _ => 0.0,
        };

        Ok(Analysis {
            validity,
            invariants,
            iterations: (principal.iterations, reconstructed.iterations),
        })
    }
}
