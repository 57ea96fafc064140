//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the Graph Store needs from its environment.

use crate::domain::errors::GraphError;
use shared_types::Entity;

/// Canonical byte form of entity lists.
///
/// Every agent in a network must use an implementation that yields identical
/// bytes for identical input: transition summaries are signed over it.
pub trait CanonicalSerializer: Send + Sync {
    /// Serialize entities in the order given.
    fn encode(&self, entities: &[&Entity]) -> Result<Vec<u8>, GraphError>;
}
