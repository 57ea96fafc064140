//! # Sync Transport (hs-03)
//!
//! Carries signed transitions between agents over unreliable datagrams.
//!
//! ## Delivery Model
//!
//! ```text
//! (proof, entities) ──→ encode + fragment ──→ send_to(peer) for each peer
//!
//! recv_from ──→ decode ──→ reassemble by (sender, batch id) ──→ callback
//!                 │                │
//!                 ↓ malformed      ↓ incomplete after timeout
//!              dropped           dropped
//! ```
//!
//! No acknowledgements, no retransmission, no ordering. Agents recover lost
//! batches through periodic re-broadcast and sync requests.
//!
//! ## Crate Structure
//!
//! - `domain/` - Wire layout, codec, reassembly
//! - `ports/` - [`DatagramSocket`]
//! - `adapters/` - Tokio UDP socket and an in-process [`MemoryNetwork`]
//! - `service.rs` - [`SyncTransport`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::memory::{MemoryNetwork, MemorySocket, TamperFn};
pub use adapters::udp::UdpDatagramSocket;
pub use domain::codec::{check_entity_fits, decode, encode_sync_request, encode_transition};
pub use domain::errors::TransportError;
pub use domain::message::{
    Datagram, DatagramKind, Header, Inbound, HEADER_LEN, MAGIC, PROOF_LEN, VERSION,
};
pub use domain::reassembly::{Reassembler, MAX_PENDING_BATCHES};
pub use ports::outbound::DatagramSocket;
pub use service::{SyncTransport, TransportConfig};
