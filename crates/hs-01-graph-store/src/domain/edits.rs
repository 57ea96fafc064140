//! # Local Edits
//!
//! User-originated changes before they become signed entities, plus the
//! structural checks every entity has to pass whether it was typed at the
//! console or arrived over the wire.

use crate::domain::errors::GraphError;
use shared_types::{AgentId, Entity, EntityId, Hyperedge, Node};
use std::collections::HashSet;

/// Longest accepted id, relation or label in bytes.
pub const MAX_TEXT_BYTES: usize = 255;

/// Most members a single hyperedge may join.
pub const MAX_MEMBERS: usize = 64;

/// Separator between an id and the creator suffix of a conflict loser.
pub const DISAMBIGUATION_SEPARATOR: char = '~';

/// A pending change to the local replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    /// Create a node.
    AddNode { id: EntityId, label: String },
    /// Create a hyperedge over existing nodes.
    AddEdge {
        id: EntityId,
        relation: String,
        members: Vec<EntityId>,
    },
}

impl LocalEdit {
    /// Id the edit will occupy.
    pub fn id(&self) -> &str {
        match self {
            LocalEdit::AddNode { id, .. } | LocalEdit::AddEdge { id, .. } => id,
        }
    }

    /// Materialise the edit as an entity stamped with its creator and the
    /// sequence number of the transition that will carry it.
    pub fn into_entity(self, creator: AgentId, sequence: u64) -> Result<Entity, GraphError> {
        let entity = match self {
            LocalEdit::AddNode { id, label } => Entity::Node(Node {
                id,
                label,
                creator,
                sequence,
            }),
            LocalEdit::AddEdge {
                id,
                relation,
                members,
            } => Entity::Hyperedge(Hyperedge {
                id,
                relation,
                members,
                creator,
                sequence,
            }),
        };
        validate_entity(&entity)?;
        Ok(entity)
    }

    /// Re-queue a conflict loser under `<id>~<creator prefix>`, keeping its
    /// label or relation and members.
    pub fn disambiguated(loser: &Entity) -> Self {
        let id = format!(
            "{}{}{}",
            loser.id(),
            DISAMBIGUATION_SEPARATOR,
            loser.creator().short_hex()
        );
        match loser {
            Entity::Node(node) => LocalEdit::AddNode {
                id,
                label: node.label.clone(),
            },
            Entity::Hyperedge(edge) => LocalEdit::AddEdge {
                id,
                relation: edge.relation.clone(),
                members: edge.members.clone(),
            },
        }
    }
}

/// Structural checks independent of the store contents.
pub fn validate_entity(entity: &Entity) -> Result<(), GraphError> {
    check_text("id", entity.id())?;
    match entity {
        Entity::Node(node) => check_text("label", &node.label),
        Entity::Hyperedge(edge) => {
            check_text("relation", &edge.relation)?;
            if edge.members.len() < 2 {
                return Err(GraphError::InvalidEntity(format!(
                    "hyperedge {} joins {} node(s), needs at least 2",
                    edge.id,
                    edge.members.len()
                )));
            }
            if edge.members.len() > MAX_MEMBERS {
                return Err(GraphError::InvalidEntity(format!(
                    "hyperedge {} joins {} nodes, limit is {}",
                    edge.id,
                    edge.members.len(),
                    MAX_MEMBERS
                )));
            }
            let mut seen = HashSet::with_capacity(edge.members.len());
            for member in &edge.members {
                check_text("member", member)?;
                if !seen.insert(member.as_str()) {
                    return Err(GraphError::InvalidEntity(format!(
                        "hyperedge {} lists {} twice",
                        edge.id, member
                    )));
                }
            }
            Ok(())
        }
    }
}

fn check_text(field: &str, value: &str) -> Result<(), GraphError> {
    if value.is_empty() && field != "label" {
        return Err(GraphError::InvalidEntity(format!("empty {field}")));
    }
    if value.len() > MAX_TEXT_BYTES {
        return Err(GraphError::InvalidEntity(format!(
            "{field} is {} bytes, limit is {MAX_TEXT_BYTES}",
            value.len()
        )));
    }
    if value.chars().any(char::is_whitespace) && field != "label" {
        return Err(GraphError::InvalidEntity(format!(
            "{field} {value:?} contains whitespace"
        )));
    }
    Ok(())
}
