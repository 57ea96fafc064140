//! # Proof Signing and Admission
//!
//! Remote proofs pass three gates, cheapest first:
//!
//! 1. dimension matches the local network parameters
//! 2. the claimed invariants describe a coherent state
//! 3. the signature verifies over the locally re-derived state summary
//!
//! Gate 1 never touches the compute worker.

use shared_crypto::{AgentKeyPair, Hash};
use shared_types::{AgentId, Invariants, NetworkParams, Proof, RejectReason};
use tracing::debug;

/// Sign the transition that produced state `sequence`.
pub fn sign_transition(
    keypair: &AgentKeyPair,
    summary: &Hash,
    sequence: u64,
    dimension: u16,
    invariants: Invariants,
) -> Proof {
    let message = Proof::signing_message(summary, sequence, invariants);
    Proof {
        agent_id: AgentId::from(keypair.public_key()),
        sequence,
        dimension,
        invariants,
        signature: *keypair.sign(&message).as_bytes(),
    }
}

/// Gate 1: dimension.
pub fn check_dimension(proof: &Proof, params: &NetworkParams) -> Result<(), RejectReason> {
    let expected = params.wire_dimension();
    if proof.dimension != expected {
        return Err(RejectReason::DimensionMismatch {
            expected,
            actual: proof.dimension,
        });
    }
    Ok(())
}

/// Gates 2 and 3: claimed invariants and signature.
pub fn verify_transition(proof: &Proof, summary: &Hash) -> Result<(), RejectReason> {
    if !proof.invariants.is_coherent() {
        return Err(RejectReason::CoherenceRejected {
            validity: f64::NAN,
            invariants: proof.invariants,
        });
    }
    proof.verify(summary).map_err(|e| {
        debug!(agent = %proof.agent_id, sequence = proof.sequence, error = %e, "Proof signature rejected");
        RejectReason::InvalidSignature
    })
}
