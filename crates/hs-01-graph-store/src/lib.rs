//! # Graph Store & Merge (hs-01)
//!
//! The agent's replica of the shared hypergraph.
//!
//! ## Responsibilities
//!
//! - Hold every accepted [`Entity`](shared_types::Entity) together with the
//!   [`ProofKey`](shared_types::ProofKey) of the transition that introduced it
//! - Turn entities into additive state deltas (exact binary fractions, so
//!   replicas agree bit for bit regardless of arrival order)
//! - Plan the merge of a remote batch: fresh entities, idempotent duplicates
//!   and same-id conflicts; unknown node references reject the whole batch
//! - Produce the canonical byte form used for transition summaries and
//!   replica digests
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Immutable Entities | A stored entity only changes when a conflict is lost |
//! | 2 | Closed References | Every hyperedge member resolves to a stored node |
//! | 3 | Never Deleted | Entities are replaced, never removed |
//! | 4 | Canonical Order | Serialization walks entities in id order |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Store, edits, delta mapping, merge planning
//! - `ports/` - Canonical serializer port
//! - `adapters/` - bincode serializer

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::bincode::BincodeSerializer;
pub use domain::edits::LocalEdit;
pub use domain::errors::GraphError;
pub use domain::mapping::{delta_for_entities, delta_for_entity, RelationKind};
pub use domain::merge::{plan_merge, Conflict, MergeOutcome, MergePlan, MergeReport};
pub use domain::store::{GraphStore, StoredEntity};
pub use ports::outbound::CanonicalSerializer;
