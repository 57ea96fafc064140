//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Graph**: [`Node`], [`Hyperedge`], [`Entity`]
//! - **Identity**: [`AgentId`]
//! - **Proofs**: [`Proof`], [`Invariants`], [`ProofAddress`], [`ProofKey`]

use serde::{Deserialize, Serialize};
use shared_crypto::{
    truncated_hash, AgentPublicKey, AgentSignature, Blake3Hasher, CryptoError, Hash,
    SIGNATURE_LENGTH,
};
use std::fmt;
use std::net::Ipv6Addr;

/// Identifier of a node or hyperedge.
pub type EntityId = String;

/// Context string for proof signing messages.
const PROOF_SIGNING_CONTEXT: &str = "hypersync 2024 proof signing message v1";

/// Context string for the signature hash folded into proof addresses.
const PROOF_ADDRESS_CONTEXT: &str = "hypersync 2024 proof address v1";

// =============================================================================
// IDENTITY
// =============================================================================

/// Agent identifier: the raw bytes of the agent's Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub [u8; 32]);

impl AgentId {
    /// Parse the id back into a verified public key.
    pub fn public_key(&self) -> Result<AgentPublicKey, CryptoError> {
        AgentPublicKey::from_bytes(self.0)
    }

    /// First four bytes in hex, used in logs and disambiguated entity ids.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<AgentPublicKey> for AgentId {
    fn from(key: AgentPublicKey) -> Self {
        Self(*key.as_bytes())
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.short_hex())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_hex())
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// A hypergraph node. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: EntityId,
    /// Free-form label.
    pub label: String,
    /// Agent that created the node.
    pub creator: AgentId,
    /// Creator's sequence number at creation time.
    pub sequence: u64,
}

/// A multi-way edge over two or more distinct nodes. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperedge {
    /// Unique identifier.
    pub id: EntityId,
    /// Relation type; selects which state component the edge feeds.
    pub relation: String,
    /// Ordered member node ids.
    pub members: Vec<EntityId>,
    /// Agent that created the edge.
    pub creator: AgentId,
    /// Creator's sequence number at creation time.
    pub sequence: u64,
}

/// Either kind of graph entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    /// A node.
    Node(Node),
    /// A hyperedge.
    Hyperedge(Hyperedge),
}

impl Entity {
    /// Entity id.
    pub fn id(&self) -> &str {
        match self {
            Entity::Node(node) => &node.id,
            Entity::Hyperedge(edge) => &edge.id,
        }
    }

    /// Creating agent.
    pub fn creator(&self) -> AgentId {
        match self {
            Entity::Node(node) => node.creator,
            Entity::Hyperedge(edge) => edge.creator,
        }
    }

    /// Node ids this entity depends on (empty for nodes).
    pub fn references(&self) -> &[EntityId] {
        match self {
            Entity::Node(_) => &[],
            Entity::Hyperedge(edge) => &edge.members,
        }
    }

    /// Whether two entities carry the same user-visible content, ignoring
    /// who created them and when. Equal payloads under one id are the same
    /// entity; different payloads under one id are a conflict.
    pub fn same_payload(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Node(a), Entity::Node(b)) => a.id == b.id && a.label == b.label,
            (Entity::Hyperedge(a), Entity::Hyperedge(b)) => {
                a.id == b.id && a.relation == b.relation && a.members == b.members
            }
            _ => false,
        }
    }

    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Node(_) => "node",
            Entity::Hyperedge(_) => "hyperedge",
        }
    }
}

// =============================================================================
// PROOFS
// =============================================================================

/// Structural invariants (β₀, β₁) of the connectivity component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Invariants {
    /// Number of connected components.
    pub betti_0: u16,
    /// Number of independent cycles.
    pub betti_1: u16,
}

impl Invariants {
    /// Create from raw counts.
    pub fn new(betti_0: u16, betti_1: u16) -> Self {
        Self { betti_0, betti_1 }
    }

    /// Single connected component with no redundant cycles.
    pub fn is_coherent(&self) -> bool {
        self.betti_0 == 1 && self.betti_1 == 0
    }
}

impl fmt::Display for Invariants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "β₀={} β₁={}", self.betti_0, self.betti_1)
    }
}

/// 16-byte diagnostic address derived from a proof.
///
/// Layout: `β₀ (u16 BE) | β₁ (u16 BE) | BLAKE3(signature)[..12]`. Carries no
/// routing meaning; it is only a stable, opaque tie-break key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProofAddress(pub [u8; 16]);

impl ProofAddress {
    /// Derive the address from invariants and signature bytes.
    pub fn derive(invariants: Invariants, signature: &[u8; SIGNATURE_LENGTH]) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..2].copy_from_slice(&invariants.betti_0.to_be_bytes());
        bytes[2..4].copy_from_slice(&invariants.betti_1.to_be_bytes());
        let digest: [u8; 12] = truncated_hash(PROOF_ADDRESS_CONTEXT, signature);
        bytes[4..16].copy_from_slice(&digest);
        Self(bytes)
    }
}

impl fmt::Display for ProofAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv6Addr::from(self.0))
    }
}

impl fmt::Debug for ProofAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofAddress({self})")
    }
}

/// Conflict-resolution ordering key: sequence number first, then address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProofKey {
    /// Sequence number of the proof.
    pub sequence: u64,
    /// Derived address, compared as opaque bytes.
    pub address: ProofAddress,
}

/// A signed, versioned summary of one state transition.
///
/// The only unit exchanged over the network. Immutable once signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proof {
    /// Signing agent.
    pub agent_id: AgentId,
    /// Agent-local sequence number `k` of the resulting state.
    pub sequence: u64,
    /// Matrix dimension the transition was computed under.
    pub dimension: u16,
    /// Invariants of the resulting state.
    pub invariants: Invariants,
    /// Signature over (state summary, k, invariants).
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl Proof {
    /// Bytes that get signed for a transition.
    pub fn signing_message(summary: &Hash, sequence: u64, invariants: Invariants) -> Hash {
        let mut hasher = Blake3Hasher::new(PROOF_SIGNING_CONTEXT);
        hasher
            .update(summary)
            .update(&sequence.to_be_bytes())
            .update(&invariants.betti_0.to_be_bytes())
            .update(&invariants.betti_1.to_be_bytes());
        hasher.finalize()
    }

    /// Verify the signature against the claimed agent id.
    pub fn verify(&self, summary: &Hash) -> Result<(), CryptoError> {
        let key = self.agent_id.public_key()?;
        let message = Self::signing_message(summary, self.sequence, self.invariants);
        key.verify(&message, &AgentSignature::from_bytes(self.signature))
    }

    /// Derived diagnostic address.
    pub fn address(&self) -> ProofAddress {
        ProofAddress::derive(self.invariants, &self.signature)
    }

    /// Ordering key used for conflict resolution.
    pub fn key(&self) -> ProofKey {
        ProofKey {
            sequence: self.sequence,
            address: self.address(),
        }
    }
}
