//! # Domain Errors
//!
//! Error types for the Graph Store subsystem.

use shared_types::{EntityId, MatrixError, RejectReason};
use thiserror::Error;

/// Errors raised while validating, storing or serializing entities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// A hyperedge references a node that is not stored and not in the batch.
    #[error("entity {entity} references unknown node {node}")]
    UnknownNode { entity: EntityId, node: EntityId },

    /// Structurally invalid entity.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// Insert of an id that is already taken.
    #[error("entity id already present: {0}")]
    DuplicateId(EntityId),

    /// Replace of an id that is not stored.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// Canonical serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Delta arithmetic on mismatched dimensions.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

impl From<GraphError> for RejectReason {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UnknownNode { entity, node } => RejectReason::UnknownNode { entity, node },
            other => RejectReason::InvalidEntity(other.to_string()),
        }
    }
}
