//! # Agent Signatures
//!
//! Ed25519 keypairs identify agents for the lifetime of a run. The 32-byte
//! public key *is* the agent id, so a proof can be verified from the bytes it
//! carries on the wire without any key lookup.
//!
//! ## Security Properties
//!
//! - Deterministic signatures (nonce derived from the message)
//! - Public keys are validated as curve points before use
//! - Secret seeds are zeroized when the keypair is dropped

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroize;

/// Length of an agent public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of a proof signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Agent public key (32 bytes). Doubles as the agent id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentPublicKey([u8; PUBLIC_KEY_LENGTH]);

impl AgentPublicKey {
    /// Create from bytes, rejecting anything that is not a curve point.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &AgentSignature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl fmt::Debug for AgentPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentPublicKey(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AgentSignature([u8; SIGNATURE_LENGTH]);

impl AgentSignature {
    /// Create from bytes. Validity is only established by [`AgentPublicKey::verify`].
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for AgentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentSignature(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Agent identity keypair. The secret half never leaves this struct.
pub struct AgentKeyPair {
    signing_key: SigningKey,
}

impl AgentKeyPair {
    /// Generate a fresh identity from the OS RNG.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyGenerationFailed`] if the OS entropy source
    /// is unavailable.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let keypair = Self::from_seed(seed);
        seed.zeroize();
        Ok(keypair)
    }

    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Public key, i.e. the agent id.
    pub fn public_key(&self) -> AgentPublicKey {
        AgentPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> AgentSignature {
        AgentSignature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for AgentKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Drop for AgentKeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = AgentKeyPair::generate().unwrap();
        let message = b"proof summary";

        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = AgentKeyPair::from_seed([7u8; 32]);
        let signature = keypair.sign(b"message1");

        assert!(keypair.public_key().verify(b"message2", &signature).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = AgentKeyPair::from_seed([1u8; 32]);
        let other = AgentKeyPair::from_seed([2u8; 32]);

        let signature = signer.sign(b"test");
        assert!(other.public_key().verify(b"test", &signature).is_err());
    }

    #[test]
    fn test_flipped_signature_byte_fails() {
        let keypair = AgentKeyPair::from_seed([3u8; 32]);
        let signature = keypair.sign(b"test");

        let mut bytes = *signature.as_bytes();
        bytes[10] ^= 0x01;
        let corrupted = AgentSignature::from_bytes(bytes);

        assert!(keypair.public_key().verify(b"test", &corrupted).is_err());
    }

    #[test]
    fn test_seed_determinism() {
        let a = AgentKeyPair::from_seed([0xAB; 32]);
        let b = AgentKeyPair::from_seed([0xAB; 32]);

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"x").as_bytes(), b.sign(b"x").as_bytes());
    }

    #[test]
    fn test_public_key_roundtrip_validates_point() {
        let keypair = AgentKeyPair::from_seed([9u8; 32]);
        let restored = AgentPublicKey::from_bytes(*keypair.public_key().as_bytes()).unwrap();
        assert_eq!(restored, keypair.public_key());
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = AgentKeyPair::from_seed([5u8; 32]);
        let rendered = format!("{keypair:?}");
        assert!(rendered.contains("AgentPublicKey"));
        assert!(!rendered.contains(&hex::encode([5u8; 32])));
    }
}
