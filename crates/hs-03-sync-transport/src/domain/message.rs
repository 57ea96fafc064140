//! # Wire Messages
//!
//! ```text
//! header : magic 0xA7 | version 1 | kind u8 | params fingerprint [8] |
//!          batch id u64 | batch index u16 | batch count u16        (23 bytes)
//! proof  : agent id [32] | seq u64 | dimension u16 | β₀ u16 | β₁ u16 |
//!          signature [64]                                          (110 bytes)
//! entity : tag u8 (1 node, 2 hyperedge) | body length u16 | body
//! ```
//!
//! All integers are big-endian. `SyncRequest` datagrams are header-only.

use shared_types::{Entity, Proof};
use std::net::SocketAddr;

/// First byte of every datagram.
pub const MAGIC: u8 = 0xA7;
/// Wire format version.
pub const VERSION: u8 = 1;
/// Header size in bytes.
pub const HEADER_LEN: usize = 23;
/// Proof record size in bytes.
pub const PROOF_LEN: usize = 110;
/// Entity record prefix: tag + body length.
pub const ENTITY_PREFIX_LEN: usize = 3;

/// Entity record tag for nodes.
pub const TAG_NODE: u8 = 1;
/// Entity record tag for hyperedges.
pub const TAG_HYPEREDGE: u8 = 2;

/// Datagram kind byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatagramKind {
    /// One fragment of a proof plus entities.
    Transition = 0x01,
    /// Ask peers to resend their whole history.
    SyncRequest = 0x02,
}

impl DatagramKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(DatagramKind::Transition),
            0x02 => Some(DatagramKind::SyncRequest),
            _ => None,
        }
    }
}

/// Decoded datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: DatagramKind,
    pub fingerprint: [u8; 8],
    pub batch_id: u64,
    pub index: u16,
    pub count: u16,
}

/// One decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Datagram {
    /// A fragment of a transition batch.
    Transition {
        header: Header,
        proof: Proof,
        entities: Vec<Entity>,
    },
    /// A header-only sync request.
    SyncRequest { header: Header },
}

impl Datagram {
    pub fn header(&self) -> &Header {
        match self {
            Datagram::Transition { header, .. } | Datagram::SyncRequest { header } => header,
        }
    }
}

/// What the transport hands to the agent once a message is complete.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A fully reassembled transition batch.
    Transition {
        from: SocketAddr,
        fingerprint: [u8; 8],
        proof: Proof,
        entities: Vec<Entity>,
    },
    /// A peer asked for our history.
    SyncRequest {
        from: SocketAddr,
        fingerprint: [u8; 8],
    },
}

impl Inbound {
    pub fn from(&self) -> SocketAddr {
        match self {
            Inbound::Transition { from, .. } | Inbound::SyncRequest { from, .. } => *from,
        }
    }

    pub fn fingerprint(&self) -> [u8; 8] {
        match self {
            Inbound::Transition { fingerprint, .. } | Inbound::SyncRequest { fingerprint, .. } => {
                *fingerprint
            }
        }
    }
}
