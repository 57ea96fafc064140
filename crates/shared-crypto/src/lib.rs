//! # Shared Crypto - Agent Identity and Proof Signing
//!
//! The signature module every other Hypersync crate leans on.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Agent identity, proof signatures |
//! | `hashing` | BLAKE3 | State summaries, proof addresses, parameter fingerprints |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **Identity generation**: Seeds are drawn from the OS RNG and the failure
//!   path is surfaced instead of panicking
//! - **BLAKE3**: Every digest is domain-separated with a context string

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_hash, truncated_hash, Blake3Hasher, Hash};
pub use signatures::{
    AgentKeyPair, AgentPublicKey, AgentSignature, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
