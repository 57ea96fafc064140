//! # BLAKE3 Hashing
//!
//! Digests used across the sync protocol. Each use gets its own context
//! string so a digest computed for one purpose can never be replayed as
//! another (a state summary is never mistaken for an address hash).

use blake3::Hasher;

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Stateful, domain-separated BLAKE3 hasher.
pub struct Blake3Hasher {
    inner: Hasher,
}

impl Blake3Hasher {
    /// Create a hasher bound to a context string.
    pub fn new(context: &str) -> Self {
        Self {
            inner: Hasher::new_derive_key(context),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Update with a length-prefixed field so adjacent fields cannot be
    /// shifted into each other.
    pub fn update_field(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(&(data.len() as u64).to_be_bytes());
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }
}

/// Hash data under a context (one-shot).
pub fn blake3_hash(context: &str, data: &[u8]) -> Hash {
    let mut hasher = Blake3Hasher::new(context);
    hasher.update(data);
    hasher.finalize()
}

/// First `N` bytes of a context-bound digest.
pub fn truncated_hash<const N: usize>(context: &str, data: &[u8]) -> [u8; N] {
    let full = blake3_hash(context, data);
    let mut out = [0u8; N];
    out.copy_from_slice(&full[..N]);
    out
}
