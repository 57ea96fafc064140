//! # Entity → Delta Mapping
//!
//! Every entity contributes a fixed additive delta to the state matrix. All
//! steps are exact binary fractions, so any order of accumulation yields the
//! same bits.
//!
//! ```text
//! node                  (0,0) += 1/8
//! hyperedge link        (0,1) += 1/8   (1,0) += 1/8
//!   + stability         (1,1) += 1/8
//!   + rotation          (0,1) += 1/32  (1,0) -= 1/32
//!   + growth            (0,1) += 1/16  (1,0) += 1/16
//!   + connectivity      (0,2) += 1/8   (2,0) += 1/8
//! ```
//!
//! The relation-specific term is picked by a BLAKE3 hash of the relation
//! label, modulo 4.

use shared_crypto::blake3_hash;
use shared_types::{Entity, StateMatrix};

const RELATION_CONTEXT: &str = "hypersync 2024 relation class v1";

/// Anchor coordinate every node accumulates on.
const ANCHOR: usize = 0;
/// Coordinate linked to the anchor by every hyperedge.
const PARTNER: usize = 1;
/// Coordinate reached by connectivity relations.
const BRANCH: usize = 2;

const NODE_STEP: f64 = 0.125;
const LINK_STEP: f64 = 0.125;
const STABILITY_STEP: f64 = 0.125;
const ROTATION_STEP: f64 = 0.03125;
const GROWTH_STEP: f64 = 0.0625;
const CONNECTIVITY_STEP: f64 = 0.125;

/// Which state component a relation label feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Stability,
    Rotation,
    Growth,
    Connectivity,
}

impl RelationKind {
    /// Classify a relation label.
    pub fn classify(relation: &str) -> Self {
        let digest = blake3_hash(RELATION_CONTEXT, relation.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        match u64::from_be_bytes(head) % 4 {
            0 => RelationKind::Stability,
            1 => RelationKind::Rotation,
            2 => RelationKind::Growth,
            _ => RelationKind::Connectivity,
        }
    }
}

/// Add `entity`'s contribution to `delta` in place.
pub fn accumulate(delta: &mut StateMatrix, entity: &Entity) {
    match entity {
        Entity::Node(_) => delta.add_at(ANCHOR, ANCHOR, NODE_STEP),
        Entity::Hyperedge(edge) => {
            delta.add_at(ANCHOR, PARTNER, LINK_STEP);
            delta.add_at(PARTNER, ANCHOR, LINK_STEP);
            match RelationKind::classify(&edge.relation) {
                RelationKind::Stability => delta.add_at(PARTNER, PARTNER, STABILITY_STEP),
                RelationKind::Rotation => {
                    delta.add_at(ANCHOR, PARTNER, ROTATION_STEP);
                    delta.add_at(PARTNER, ANCHOR, -ROTATION_STEP);
                }
                RelationKind::Growth => {
                    delta.add_at(ANCHOR, PARTNER, GROWTH_STEP);
                    delta.add_at(PARTNER, ANCHOR, GROWTH_STEP);
                }
                RelationKind::Connectivity => {
                    delta.add_at(ANCHOR, BRANCH, CONNECTIVITY_STEP);
                    delta.add_at(BRANCH, ANCHOR, CONNECTIVITY_STEP);
                }
            }
        }
    }
}

/// Delta contributed by one entity.
pub fn delta_for_entity(entity: &Entity, dimension: usize) -> StateMatrix {
    let mut delta = StateMatrix::zeros(dimension);
    accumulate(&mut delta, entity);
    delta
}

/// Delta contributed by a batch of entities.
pub fn delta_for_entities<'a>(
    entities: impl IntoIterator<Item = &'a Entity>,
    dimension: usize,
) -> StateMatrix {
    let mut delta = StateMatrix::zeros(dimension);
    for entity in entities {
        accumulate(&mut delta, entity);
    }
    delta
}
