//! # Conflict Ordering
//!
//! Two transitions conflict when they carry different payloads under one
//! entity id. Every replica must pick the same winner from the same pair, so
//! the decision only looks at the entities and their proof keys:
//!
//! 1. a node beats a hyperedge (hyperedges may reference the id)
//! 2. otherwise the larger `(sequence, address)` key wins
//! 3. equal keys keep the incumbent
//!
//! Rule 2 is a placeholder ordering: it is total and deterministic but
//! carries no notion of causality or fairness between agents.

use shared_types::{Entity, ProofKey};

/// Which side keeps the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The stored entity is replaced by the incoming one.
    IncomingWins,
    /// The stored entity stays.
    IncumbentHolds,
}

/// Decide a conflict.
pub fn resolve(
    incumbent: &Entity,
    incumbent_key: ProofKey,
    incoming: &Entity,
    incoming_key: ProofKey,
) -> Resolution {
    match (incumbent, incoming) {
        (Entity::Node(_), Entity::Hyperedge(_)) => Resolution::IncumbentHolds,
        (Entity::Hyperedge(_), Entity::Node(_)) => Resolution::IncomingWins,
        _ if incoming_key > incumbent_key => Resolution::IncomingWins,
        _ => Resolution::IncumbentHolds,
    }
}
