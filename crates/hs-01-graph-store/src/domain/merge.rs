//! # Merge Planning
//!
//! Classifies every entity of a remote batch against the local store before
//! anything is touched:
//!
//! - **fresh**: id not stored yet
//! - **duplicate**: id stored with the same payload (idempotent re-merge)
//! - **conflict**: id stored with a different payload
//!
//! A single unresolvable reference rejects the whole batch. Winners of
//! conflicts are picked by the caller, which owns the proof keys.

use crate::domain::edits::validate_entity;
use crate::domain::errors::GraphError;
use crate::domain::store::{GraphStore, StoredEntity};
use crate::ports::outbound::CanonicalSerializer;
use shared_types::{Entity, EntityId, RejectReason};
use std::collections::{HashMap, HashSet};

/// Same id, different payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// What the store holds now.
    pub incumbent: StoredEntity,
    /// What the batch brought.
    pub incoming: Entity,
}

/// Classification of one remote batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    pub fresh: Vec<Entity>,
    pub duplicates: Vec<EntityId>,
    pub conflicts: Vec<Conflict>,
}

impl MergePlan {
    /// Nothing new: every entity is already stored as is.
    pub fn is_noop(&self) -> bool {
        self.fresh.is_empty() && self.conflicts.is_empty()
    }
}

/// Counters for an applied merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Local sequence number of the transition that recorded the merge.
    pub sequence: u64,
    /// Entities newly stored.
    pub accepted: usize,
    /// Entities already present.
    pub duplicates: usize,
    /// Conflicts where the incoming entity took the id.
    pub conflicts_won: usize,
    /// Conflicts where the stored entity kept the id.
    pub conflicts_lost: usize,
}

/// Result of merging one remote batch. Rejections are values, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// At least one entity was stored or swapped.
    Applied(MergeReport),
    /// Every entity was already present.
    Duplicate,
    /// Nothing changed; the reason is logged and counted by the caller.
    Rejected(RejectReason),
}

impl MergeOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, MergeOutcome::Rejected(_))
    }
}

/// Classify `batch` against `store`.
pub fn plan_merge<S: CanonicalSerializer>(
    store: &GraphStore<S>,
    batch: &[Entity],
) -> Result<MergePlan, GraphError> {
    let mut seen: HashMap<&str, &Entity> = HashMap::with_capacity(batch.len());
    for entity in batch {
        validate_entity(entity)?;
        if let Some(previous) = seen.insert(entity.id(), entity) {
            if !previous.same_payload(entity) {
                return Err(GraphError::InvalidEntity(format!(
                    "batch carries two versions of {}",
                    entity.id()
                )));
            }
        }
    }

    for entity in batch {
        for member in entity.references() {
            let in_batch = matches!(seen.get(member.as_str()), Some(Entity::Node(_)));
            if !in_batch && !store.contains_node(member) {
                return Err(GraphError::UnknownNode {
                    entity: entity.id().to_string(),
                    node: member.clone(),
                });
            }
        }
    }

    let mut plan = MergePlan::default();
    let mut planned: HashSet<&str> = HashSet::with_capacity(batch.len());
    for entity in batch {
        if !planned.insert(entity.id()) {
            continue;
        }
        match store.get(entity.id()) {
            None => plan.fresh.push(entity.clone()),
            Some(stored) if stored.entity.same_payload(entity) => {
                plan.duplicates.push(entity.id().to_string())
            }
            Some(stored) => plan.conflicts.push(Conflict {
                incumbent: stored.clone(),
                incoming: entity.clone(),
            }),
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AgentId, Hyperedge, Node, ProofAddress, ProofKey};

    fn key(sequence: u64) -> ProofKey {
        ProofKey {
            sequence,
            address: ProofAddress([0; 16]),
        }
    }

    fn node(id: &str, label: &str) -> Entity {
        Entity::Node(Node {
            id: id.into(),
            label: label.into(),
            creator: AgentId([2; 32]),
            sequence: 1,
        })
    }

    fn edge(id: &str, members: &[&str]) -> Entity {
        Entity::Hyperedge(Hyperedge {
            id: id.into(),
            relation: "knows".into(),
            members: members.iter().map(|m| m.to_string()).collect(),
            creator: AgentId([2; 32]),
            sequence: 1,
        })
    }

    fn store_with(entities: &[Entity]) -> GraphStore {
        let mut store = GraphStore::new();
        for entity in entities {
            store.insert(entity.clone(), key(1)).unwrap();
        }
        store
    }

    #[test]
    fn test_fresh_entities_planned() {
        let store = GraphStore::new();
        let batch = vec![node("n1", "a"), node("n2", "b"), edge("e1", &["n1", "n2"])];

        let plan = plan_merge(&store, &batch).unwrap();
        assert_eq!(plan.fresh.len(), 3);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_same_payload_is_duplicate() {
        let store = store_with(&[node("n1", "a")]);
        let mut again = node("n1", "a");
        if let Entity::Node(n) = &mut again {
            n.creator = AgentId([9; 32]);
        }

        let plan = plan_merge(&store, &[again]).unwrap();
        assert_eq!(plan.duplicates, vec!["n1".to_string()]);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_different_payload_is_conflict() {
        let store = store_with(&[node("n1", "alpha")]);

        let plan = plan_merge(&store, &[node("n1", "beta")]).unwrap();
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].incumbent.entity, node("n1", "alpha"));
        assert_eq!(plan.conflicts[0].incoming, node("n1", "beta"));
    }

    #[test]
    fn test_unknown_reference_rejects_whole_batch() {
        let store = store_with(&[node("n1", "a")]);
        let batch = vec![node("n2", "b"), edge("e1", &["n1", "n3"])];

        assert_eq!(
            plan_merge(&store, &batch),
            Err(GraphError::UnknownNode {
                entity: "e1".into(),
                node: "n3".into()
            })
        );
    }

    #[test]
    fn test_reference_to_hyperedge_is_unknown_node() {
        let store = store_with(&[node("n1", "a"), node("n2", "b"), edge("e1", &["n1", "n2"])]);
        let batch = vec![edge("e2", &["n1", "e1"])];

        assert!(matches!(
            plan_merge(&store, &batch),
            Err(GraphError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_two_versions_in_one_batch_rejected() {
        let store = GraphStore::new();
        let batch = vec![node("n1", "a"), node("n1", "b")];
        assert!(matches!(
            plan_merge(&store, &batch),
            Err(GraphError::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_repeated_entity_in_batch_planned_once() {
        let store = GraphStore::new();
        let batch = vec![node("n1", "a"), node("n1", "a")];
        let plan = plan_merge(&store, &batch).unwrap();
        assert_eq!(plan.fresh.len(), 1);
    }

    #[test]
    fn test_outcome_rejection_flag() {
        assert!(MergeOutcome::Rejected(RejectReason::InvalidSignature).is_rejected());
        assert!(!MergeOutcome::Duplicate.is_rejected());
    }
}
