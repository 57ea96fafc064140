//! Four-way decomposition of a state matrix.
//!
//! ```text
//! stability    = diag(M)
//! rotation     = (M - Mᵀ) / 2
//! growth       = (M + Mᵀ) / 2 - diag(M)
//! connectivity = [i != j and (|M_ij| > tol or |M_ji| > tol)]
//! ```
//!
//! `stability + rotation + growth == M` exactly; connectivity is the binary
//! shadow of the off-diagonal structure.

use shared_types::{ComponentWeights, StateMatrix};

/// The four interpretable components of a state matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Components {
    pub stability: StateMatrix,
    pub rotation: StateMatrix,
    pub growth: StateMatrix,
    pub connectivity: StateMatrix,
}

impl Components {
    /// Weighted four-component sum.
    pub fn reconstruct(&self, weights: &ComponentWeights) -> StateMatrix {
        let n = self.stability.dimension();
        let mut out = StateMatrix::zeros(n);
        for row in 0..n {
            for col in 0..n {
                let value = weights.stability * self.stability.get(row, col)
                    + weights.rotation * self.rotation.get(row, col)
                    + weights.growth * self.growth.get(row, col)
                    + weights.connectivity * self.connectivity.get(row, col);
                out.set(row, col, value);
            }
        }
        out
    }
}

/// Split `matrix` into its components.
pub fn decompose(matrix: &StateMatrix, zero_tolerance: f64) -> Components {
    let n = matrix.dimension();
    let mut stability = StateMatrix::zeros(n);
    let mut rotation = StateMatrix::zeros(n);
    let mut growth = StateMatrix::zeros(n);
    let mut connectivity = StateMatrix::zeros(n);

    for row in 0..n {
        stability.set(row, row, matrix.get(row, row));
        for col in 0..n {
            if row == col {
                continue;
            }
            let upper = matrix.get(row, col);
            let lower = matrix.get(col, row);
            rotation.set(row, col, (upper - lower) / 2.0);
            growth.set(row, col, (upper + lower) / 2.0);
            if upper.abs() > zero_tolerance || lower.abs() > zero_tolerance {
                connectivity.set(row, col, 1.0);
            }
        }
    }

    Components {
        stability,
        rotation,
        growth,
        connectivity,
    }
}
