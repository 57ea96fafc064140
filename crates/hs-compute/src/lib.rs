//! # HS-Compute: Offloaded State Analysis
//!
//! Runs the numerically heavy half of a state transition on its own OS
//! thread so the agent's network/control thread never computes:
//!
//! 1. **Decomposition** into stability, rotation, growth and connectivity
//! 2. **Principal eigenvector estimates** (capped power iteration) of the
//!    candidate matrix and of its weighted reconstruction
//! 3. **Structural invariants** (β₀, β₁) of the connectivity component
//!
//! ## Sandbox
//!
//! A backend is constructed from [`KernelParams`] alone. The worker thread
//! owns the backend and its job receiver and nothing else: no socket, file or
//! signing key is reachable from a computation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hs_compute::{ComputeWorker, CpuBackend, KernelParams};
//!
//! let worker = ComputeWorker::spawn(CpuBackend::new(KernelParams::from(&params)), timeout)?;
//! let analysis = worker.analyse(candidate).await?;
//! println!("validity {} {}", analysis.validity, analysis.invariants);
//! ```

pub mod backends;
pub mod domain;
pub mod worker;

use shared_types::{ComponentWeights, Invariants, NetworkParams, StateMatrix};
use std::sync::atomic::AtomicBool;
use thiserror::Error;

pub use backends::cpu::CpuBackend;
pub use worker::ComputeWorker;

/// Compute worker errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("Worker thread could not be started: {0}")]
    SpawnFailed(String),

    #[error("Worker is no longer running")]
    WorkerGone,

    #[error("Timeout waiting for result")]
    Timeout,

    #[error("Computation cancelled")]
    Cancelled,
}

/// Numeric parameters a backend is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub weights: ComponentWeights,
    pub zero_tolerance: f64,
    pub max_power_iterations: u32,
}

impl From<&NetworkParams> for KernelParams {
    fn from(params: &NetworkParams) -> Self {
        Self {
            weights: params.weights,
            zero_tolerance: params.zero_tolerance,
            max_power_iterations: params.max_power_iterations,
        }
    }
}

/// Result of analysing one candidate state.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Absolute cosine between the principal eigenvector estimates of the
    /// matrix and of its weighted reconstruction. In [0, 1].
    pub validity: f64,
    /// β₀ / β₁ of the connectivity component.
    pub invariants: Invariants,
    /// Power iterations spent on (matrix, reconstruction).
    pub iterations: (u32, u32),
}

/// Analysis backend - implemented by the CPU kernels, and by test doubles.
///
/// Runs on the worker thread. Long computations must poll `cancel` and bail
/// out with [`ComputeError::Cancelled`] once it is set.
pub trait AnalysisBackend: Send + 'static {
    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    /// Analyse a candidate state matrix.
    fn analyse(&self, candidate: &StateMatrix, cancel: &AtomicBool)
        -> Result<Analysis, ComputeError>;
}
