//! # Graph Store
//!
//! Id-ordered map of accepted entities. Each entry remembers the proof key of
//! the transition that introduced it; conflicts compare against that key.

use crate::adapters::bincode::BincodeSerializer;
use crate::domain::errors::GraphError;
use crate::ports::outbound::CanonicalSerializer;
use shared_crypto::{Blake3Hasher, Hash};
use shared_types::{Entity, EntityId, ProofKey, StateMatrix};
use std::collections::BTreeMap;

const SUMMARY_CONTEXT: &str = "hypersync 2024 transition summary v1";
const DIGEST_CONTEXT: &str = "hypersync 2024 replica digest v1";

/// An accepted entity and the key of the proof that brought it in.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub entity: Entity,
    pub provenance: ProofKey,
}

/// Local hypergraph replica.
pub struct GraphStore<S: CanonicalSerializer = BincodeSerializer> {
    entities: BTreeMap<EntityId, StoredEntity>,
    serializer: S,
}

impl GraphStore {
    /// Empty store with the default serializer.
    pub fn new() -> Self {
        Self::with_serializer(BincodeSerializer)
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CanonicalSerializer> GraphStore<S> {
    /// Empty store with a custom serializer.
    pub fn with_serializer(serializer: S) -> Self {
        Self {
            entities: BTreeMap::new(),
            serializer,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.entities
            .values()
            .filter(|s| matches!(s.entity, Entity::Node(_)))
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.entities.len() - self.node_count()
    }

    pub fn get(&self, id: &str) -> Option<&StoredEntity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// True when `id` is stored and is a node.
    pub fn contains_node(&self, id: &str) -> bool {
        matches!(
            self.entities.get(id),
            Some(StoredEntity {
                entity: Entity::Node(_),
                ..
            })
        )
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredEntity> {
        self.entities.values()
    }

    /// Hyperedge members that do not resolve to a stored node.
    pub fn missing_references<'a>(&self, entity: &'a Entity) -> Vec<&'a EntityId> {
        entity
            .references()
            .iter()
            .filter(|id| !self.contains_node(id))
            .collect()
    }

    /// Store a new entity. The id must be free and every reference resolved.
    pub fn insert(&mut self, entity: Entity, provenance: ProofKey) -> Result<(), GraphError> {
        if self.entities.contains_key(entity.id()) {
            return Err(GraphError::DuplicateId(entity.id().to_string()));
        }
        if let Some(node) = self.missing_references(&entity).first() {
            return Err(GraphError::UnknownNode {
                entity: entity.id().to_string(),
                node: (*node).clone(),
            });
        }
        let id = entity.id().to_string();
        self.entities.insert(id, StoredEntity { entity, provenance });
        Ok(())
    }

    /// Swap the entity under an existing id for a conflict winner. Returns
    /// the displaced entry.
    pub fn replace(
        &mut self,
        entity: Entity,
        provenance: ProofKey,
    ) -> Result<StoredEntity, GraphError> {
        let slot = self
            .entities
            .get_mut(entity.id())
            .ok_or_else(|| GraphError::NotFound(entity.id().to_string()))?;
        Ok(std::mem::replace(slot, StoredEntity { entity, provenance }))
    }

    /// BLAKE3 over the dimension, the delta and the canonical bytes of the
    /// entities a transition carries. Signed by the proposer; re-derived by
    /// every receiver from the datagram contents.
    pub fn transition_summary(
        &self,
        delta: &StateMatrix,
        entities: &[Entity],
    ) -> Result<Hash, GraphError> {
        let refs: Vec<&Entity> = entities.iter().collect();
        let encoded = self.serializer.encode(&refs)?;
        let mut hasher = Blake3Hasher::new(SUMMARY_CONTEXT);
        hasher
            .update_field(&delta.to_be_bytes())
            .update_field(&encoded);
        Ok(hasher.finalize())
    }

    /// Canonical bytes of the whole replica, in id order. Provenance is not
    /// part of the content.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, GraphError> {
        let refs: Vec<&Entity> = self.entities.values().map(|s| &s.entity).collect();
        self.serializer.encode(&refs)
    }

    /// Digest identifying the replica content.
    pub fn digest(&self) -> Result<Hash, GraphError> {
        let mut hasher = Blake3Hasher::new(DIGEST_CONTEXT);
        hasher.update(&self.snapshot_bytes()?);
        Ok(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AgentId, Hyperedge, Node, ProofAddress};

    fn key(sequence: u64) -> ProofKey {
        ProofKey {
            sequence,
            address: ProofAddress([sequence as u8; 16]),
        }
    }

    fn node(id: &str, label: &str) -> Entity {
        Entity::Node(Node {
            id: id.into(),
            label: label.into(),
            creator: AgentId([1; 32]),
            sequence: 1,
        })
    }

    fn edge(id: &str, members: &[&str]) -> Entity {
        Entity::Hyperedge(Hyperedge {
            id: id.into(),
            relation: "knows".into(),
            members: members.iter().map(|m| m.to_string()).collect(),
            creator: AgentId([1; 32]),
            sequence: 2,
        })
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut store = GraphStore::new();
        store.insert(node("n1", "a"), key(1)).unwrap();
        store.insert(node("n2", "b"), key(1)).unwrap();
        store.insert(edge("e1", &["n1", "n2"]), key(2)).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        assert!(store.contains_node("n1"));
        assert!(!store.contains_node("e1"));
        assert_eq!(store.get("e1").unwrap().provenance, key(2));
    }

    #[test]
    fn test_insert_rejects_taken_id() {
        let mut store = GraphStore::new();
        store.insert(node("n1", "a"), key(1)).unwrap();
        assert_eq!(
            store.insert(node("n1", "b"), key(2)),
            Err(GraphError::DuplicateId("n1".into()))
        );
    }

    #[test]
    fn test_insert_rejects_dangling_edge() {
        let mut store = GraphStore::new();
        store.insert(node("n1", "a"), key(1)).unwrap();
        assert_eq!(
            store.insert(edge("e1", &["n1", "ghost"]), key(2)),
            Err(GraphError::UnknownNode {
                entity: "e1".into(),
                node: "ghost".into()
            })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut store = GraphStore::new();
        store.insert(node("n1", "alpha"), key(1)).unwrap();

        let old = store.replace(node("n1", "beta"), key(5)).unwrap();
        assert_eq!(old.entity, node("n1", "alpha"));
        assert_eq!(store.get("n1").unwrap().entity, node("n1", "beta"));
        assert_eq!(store.get("n1").unwrap().provenance, key(5));

        assert!(matches!(
            store.replace(node("n9", "x"), key(1)),
            Err(GraphError::NotFound(_))
        ));
    }

    #[test]
    fn test_digest_ignores_insertion_order_and_provenance() {
        let mut a = GraphStore::new();
        a.insert(node("n1", "a"), key(1)).unwrap();
        a.insert(node("n2", "b"), key(2)).unwrap();

        let mut b = GraphStore::new();
        b.insert(node("n2", "b"), key(7)).unwrap();
        b.insert(node("n1", "a"), key(9)).unwrap();

        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        b.replace(node("n2", "c"), key(8)).unwrap();
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_summary_binds_delta_and_entities() {
        let store = GraphStore::new();
        let entities = vec![node("n1", "a")];
        let mut delta = StateMatrix::zeros(8);
        delta.add_at(0, 0, 0.125);

        let summary = store.transition_summary(&delta, &entities).unwrap();
        assert_eq!(summary, store.transition_summary(&delta, &entities).unwrap());

        let other_entities = vec![node("n1", "b")];
        assert_ne!(
            summary,
            store.transition_summary(&delta, &other_entities).unwrap()
        );

        let other_delta = StateMatrix::zeros(8);
        assert_ne!(
            summary,
            store.transition_summary(&other_delta, &entities).unwrap()
        );
    }
}
