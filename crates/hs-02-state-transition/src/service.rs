//! # State Transition Engine
//!
//! Owns the State Vector and the agent-local sequence number `k`. A delta is
//! applied only if the candidate `State + Delta` passes the coherence
//! criterion; otherwise state and `k` stay exactly as they were.
//!
//! The numeric analysis runs on the compute worker. The engine itself only
//! adds matrices, compares numbers and signs.

use crate::domain::coherence::Evaluation;
use crate::domain::proofs::sign_transition;
use hs_compute::{AnalysisBackend, ComputeError, ComputeWorker, CpuBackend, KernelParams};
use shared_crypto::{AgentKeyPair, Hash};
use shared_types::{AgentId, NetworkParams, Proof, RejectReason, StateMatrix};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Engine construction errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid network parameters: {0}")]
    Params(#[from] shared_types::ParamsError),

    #[error("compute worker: {0}")]
    Compute(#[from] ComputeError),
}

/// Coherence-gated state machine of one agent.
pub struct StateTransitionEngine {
    params: Arc<NetworkParams>,
    keypair: Arc<AgentKeyPair>,
    agent_id: AgentId,
    worker: ComputeWorker,
    state: StateMatrix,
    sequence: u64,
    last_evaluation: Option<Evaluation>,
    evaluations: AtomicU64,
}

impl StateTransitionEngine {
    /// Engine at genesis with the CPU backend.
    pub fn new(
        params: Arc<NetworkParams>,
        keypair: Arc<AgentKeyPair>,
    ) -> Result<Self, EngineError> {
        let backend = CpuBackend::new(KernelParams::from(params.as_ref()));
        Self::with_backend(params, keypair, backend)
    }

    /// Engine at genesis with a custom analysis backend.
    pub fn with_backend<B: AnalysisBackend>(
        params: Arc<NetworkParams>,
        keypair: Arc<AgentKeyPair>,
        backend: B,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        let worker = ComputeWorker::spawn(backend, params.computation_timeout)?;
        let agent_id = AgentId::from(keypair.public_key());
        info!(agent = %agent_id, dimension = params.dimension, "State transition engine at genesis");

        Ok(Self {
            state: StateMatrix::identity(params.dimension),
            params,
            keypair,
            agent_id,
            worker,
            sequence: 0,
            last_evaluation: None,
            evaluations: AtomicU64::new(0),
        })
    }

    pub fn params(&self) -> &Arc<NetworkParams> {
        &self.params
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Current State Vector.
    pub fn state(&self) -> &StateMatrix {
        &self.state
    }

    /// Sequence number `k` of the current state. Genesis is 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Raise `k` to at least `sequence`. Used when a restarted agent meets
    /// proofs it signed in a previous run; the state is left alone.
    pub fn advance_sequence(&mut self, sequence: u64) {
        if sequence > self.sequence {
            info!(from = self.sequence, to = sequence, "Sequence advanced past earlier own proofs");
            self.sequence = sequence;
        }
    }

    /// Analysis of the current state, if any transition was accepted.
    pub fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    /// Coherence evaluations attempted so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Analyse `State + delta` without changing anything.
    pub async fn evaluate(&self, delta: &StateMatrix) -> Result<Evaluation, RejectReason> {
        if delta.dimension() != self.params.dimension {
            return Err(RejectReason::DimensionMismatch {
                expected: self.params.wire_dimension(),
                actual: delta.dimension() as u16,
            });
        }
        let candidate = self
            .state
            .checked_add(delta)
            .map_err(|e| RejectReason::InvalidEntity(e.to_string()))?;

        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let analysis = self
            .worker
            .analyse(candidate.clone())
            .await
            .map_err(|e| {
                warn!(error = %e, "Coherence evaluation did not complete");
                RejectReason::ComputationTimeout
            })?;

        debug!(
            validity = analysis.validity,
            betti_0 = analysis.invariants.betti_0,
            betti_1 = analysis.invariants.betti_1,
            iterations = ?analysis.iterations,
            "Candidate state analysed"
        );

        Ok(Evaluation {
            candidate,
            validity: analysis.validity,
            invariants: analysis.invariants,
        })
    }

    /// Apply `delta` if the resulting state is coherent and return the signed
    /// proof of the new state. `summary` is what the proof signs.
    ///
    /// Atomic: on any rejection the State Vector and `k` are unchanged.
    pub async fn propose(
        &mut self,
        delta: &StateMatrix,
        summary: &Hash,
    ) -> Result<Proof, RejectReason> {
        let evaluation = self.evaluate(delta).await?;
        evaluation.check(self.params.validity_threshold)?;

        let sequence = self.sequence + 1;
        let proof = sign_transition(
            &self.keypair,
            summary,
            sequence,
            self.params.wire_dimension(),
            evaluation.invariants,
        );

        self.sequence = sequence;
        self.state = evaluation.candidate.clone();
        self.last_evaluation = Some(evaluation);

        debug!(sequence, address = %proof.address(), "Transition accepted");
        Ok(proof)
    }
}
