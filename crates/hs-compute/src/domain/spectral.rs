//! Principal eigenvector estimate by power iteration.

use crate::ComputeError;
use shared_types::StateMatrix;
use std::sync::atomic::{AtomicBool, Ordering};

/// Iterates closer than this (in max-norm) count as converged.
const CONVERGENCE_EPSILON: f64 = 1e-12;

/// Norms below this mean the matrix annihilated the iterate.
const DEGENERATE_NORM: f64 = 1e-300;

/// Outcome of a capped power iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerIteration {
    /// Unit-norm estimate, or `None` when the iteration degenerated
    /// (zero or non-finite products).
    pub vector: Option<Vec<f64>>,
    /// Iterations actually run.
    pub iterations: u32,
}

/// Estimate the principal eigenvector of `matrix`.
///
/// Starts from the uniform unit vector so two agents analysing the same
/// matrix always get the same answer. Stops after `max_iterations` or on
/// convergence, whichever comes first.
pub fn power_iteration(
    matrix: &StateMatrix,
    max_iterations: u32,
    cancel: &AtomicBool,
) -> Result<PowerIteration, ComputeError> {
    let n = matrix.dimension();
    if n == 0 {
        return Ok(PowerIteration {
            vector: None,
            iterations: 0,
        });
    }

    let mut current = vec![1.0 / (n as f64).sqrt(); n];
    let mut iterations = 0;

    while iterations < max_iterations {
        if cancel.load(Ordering::Acquire) {
            return Err(ComputeError::Cancelled);
        }
        iterations += 1;

        let product = matrix.mul_vec(&current);
        let norm = product.iter().map(|v| v * v).sum::<f64>().sqrt();
        if !norm.is_finite() || norm < DEGENERATE_NORM {
            return Ok(PowerIteration {
                vector: None,
                iterations,
            });
        }

        let next: Vec<f64> = product.iter().map(|v| v / norm).collect();
        let delta = next
            .iter()
            .zip(&current)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        current = next;

        if delta < CONVERGENCE_EPSILON {
            break;
        }
    }

    Ok(PowerIteration {
        vector: Some(current),
        iterations,
    })
}

/// `|a·b| / (|a||b|)`, clamped to [0, 1]. Sign-insensitive because an
/// eigenvector and its negation describe the same direction.
pub fn abs_cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot.abs() / (norm_a * norm_b)).clamp(0.0, 1.0)
}
