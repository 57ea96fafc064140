//! # Shared Types Crate
//!
//! Domain entities, proofs, the state matrix and the network parameters shared
//! by every Hypersync subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Immutable Configuration**: [`NetworkParams`] is built once at agent
//!   start and handed to every component by reference; there is no global.
//! - **Identity is a Key**: [`AgentId`] is the agent's Ed25519 public key, so
//!   a [`Proof`] is self-describing for verification.

pub mod entities;
pub mod errors;
pub mod matrix;
pub mod params;

pub use entities::*;
pub use errors::*;
pub use matrix::StateMatrix;
pub use params::{ComponentWeights, NetworkParams};
