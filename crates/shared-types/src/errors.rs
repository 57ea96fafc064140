//! # Error Types
//!
//! Errors shared across subsystems. [`RejectReason`] is the recoverable,
//! per-message taxonomy: every variant is handled where it occurs and never
//! takes down the control thread.

use crate::entities::{EntityId, Invariants};
use thiserror::Error;

/// Matrix shape errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// Operands of different sizes.
    #[error("Matrix dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// Value buffer does not match the declared dimension.
    #[error("Matrix of dimension {dimension} cannot hold {len} values")]
    ShapeMismatch { dimension: usize, len: usize },
}

/// Invalid network parameters. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    /// The matrix must fit the fixed basis coordinates.
    #[error("Matrix dimension {0} out of range (4..=1024)")]
    DimensionOutOfRange(usize),

    /// Weights must be finite, positive and sum to one.
    #[error("Component weights must be positive and sum to 1.0, got {0}")]
    InvalidWeights(f64),

    /// Threshold outside [0, 1].
    #[error("Validity threshold {0} outside [0, 1]")]
    InvalidThreshold(f64),

    /// Datagram limit too small to carry a proof.
    #[error("Datagram limit {0} bytes is below the {1}-byte minimum")]
    DatagramTooSmall(usize, usize),

    /// Any other out-of-range value.
    #[error("Invalid parameter {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Why a proposed or received transition was not applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    /// Proof computed under a different matrix dimension.
    #[error("config mismatch: dimension {actual} differs from local {expected}")]
    DimensionMismatch { expected: u16, actual: u16 },

    /// Sender runs with different network parameters (weights, thresholds...).
    #[error("config mismatch: network parameter fingerprint differs")]
    ParamsMismatch,

    /// Validity score or invariants fail the coherence criterion.
    #[error("coherence rejected: validity {validity:.4}, {invariants}")]
    CoherenceRejected {
        validity: f64,
        invariants: Invariants,
    },

    /// The computation worker did not answer within the budget.
    #[error("computation timed out")]
    ComputationTimeout,

    /// Signature does not verify against the claimed agent id.
    #[error("invalid signature")]
    InvalidSignature,

    /// Sender is not in the configured trusted set.
    #[error("untrusted agent {0}")]
    UntrustedAgent(String),

    /// A hyperedge references a node that is neither stored nor in the batch.
    #[error("entity {entity} references unknown node {node}")]
    UnknownNode { entity: EntityId, node: EntityId },

    /// Structurally invalid entity (empty id, too few members...).
    #[error("invalid entity: {0}")]
    InvalidEntity(String),
}

impl RejectReason {
    /// Both dimension and fingerprint mismatches are configuration errors.
    pub fn is_config_mismatch(&self) -> bool {
        matches!(
            self,
            RejectReason::DimensionMismatch { .. } | RejectReason::ParamsMismatch
        )
    }
}
