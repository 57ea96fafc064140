//! # Agent
//!
//! Ties one replica together: the graph store, the state transition engine,
//! the transition history and the sync transport.
//!
//! ## Local Edit Flow
//!
//! ```text
//! LocalEdit ──→ entity ──→ delta ──→ engine.propose ──→ store.insert ──→ broadcast
//! ```
//!
//! ## Remote Merge Flow
//!
//! ```text
//! (fingerprint, proof, entities)
//!     │ dimension, fingerprint, trusted signer       (no computation)
//!     │ claimed invariants, signature over summary   (re-derived from entities)
//!     │ plan: fresh / duplicate / conflict           (references resolved)
//!     │ resolve conflicts, losers re-queued as local edits
//!     ↓
//! engine.propose(Δ fresh + Δ swaps) ──→ commit ──→ history ──→ relay once
//! ```
//!
//! Rejections never escape as errors. They are counted, logged and reported
//! by `status`.

mod phase;
mod status;

pub use phase::AgentPhase;
pub use status::AgentStatus;

use hs_01_graph_store::{
    delta_for_entities, delta_for_entity, plan_merge, GraphError, GraphStore, LocalEdit,
    MergeOutcome, MergeReport,
};
use hs_02_state_transition::{
    check_dimension, resolve, verify_transition, EngineError, History, HistoryEntry, Resolution,
    StateTransitionEngine,
};
use hs_03_sync_transport::{DatagramSocket, Inbound, SyncTransport, TransportError};
use shared_crypto::{AgentKeyPair, CryptoError};
use shared_types::{AgentId, Entity, NetworkParams, Proof, ProofKey, RejectReason, StateMatrix};
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;

/// Agent startup errors.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("identity generation failed: {0}")]
    Identity(#[from] CryptoError),

    #[error("state transition engine: {0}")]
    Engine(#[from] EngineError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// What happened to a submitted local edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Applied and broadcast.
    Applied(Proof),
    /// Held until the agent becomes active.
    Queued { pending: usize },
}

/// One replica of the shared hypergraph.
pub struct Agent<S: DatagramSocket> {
    config: AgentConfig,
    params: Arc<NetworkParams>,
    fingerprint: [u8; 8],
    engine: StateTransitionEngine,
    store: GraphStore,
    history: History,
    transport: Arc<SyncTransport<S>>,
    phase: AgentPhase,
    pending: VecDeque<LocalEdit>,
    trusted: HashSet<AgentId>,
    rejected: u64,
    last_rejection: Option<RejectReason>,
}

impl<S: DatagramSocket> Agent<S> {
    /// Create the agent in `Initializing`. The identity comes from the
    /// configured seed, or a fresh key when none is set.
    pub fn new(
        config: AgentConfig,
        params: Arc<NetworkParams>,
        transport: Arc<SyncTransport<S>>,
    ) -> Result<Self, AgentError> {
        let keypair = match config.identity_seed {
            Some(seed) => AgentKeyPair::from_seed(seed),
            None => AgentKeyPair::generate()?,
        };
        Self::with_keypair(config, params, Arc::new(keypair), transport)
    }

    /// Create the agent with a given identity.
    pub fn with_keypair(
        config: AgentConfig,
        params: Arc<NetworkParams>,
        keypair: Arc<AgentKeyPair>,
        transport: Arc<SyncTransport<S>>,
    ) -> Result<Self, AgentError> {
        let engine = StateTransitionEngine::new(Arc::clone(&params), keypair)?;
        Self::with_engine(config, params, engine, transport)
    }

    /// Create the agent around an existing engine, e.g. one with a custom
    /// analysis backend.
    pub fn with_engine(
        config: AgentConfig,
        params: Arc<NetworkParams>,
        engine: StateTransitionEngine,
        transport: Arc<SyncTransport<S>>,
    ) -> Result<Self, AgentError> {
        let trusted: HashSet<AgentId> = config.trusted_agents.iter().copied().collect();

        info!(
            index = config.index,
            agent = %engine.agent_id(),
            addr = %transport.local_addr()?,
            peers = transport.peers().len(),
            trusted = trusted.len(),
            "Agent initialized"
        );

        Ok(Self {
            fingerprint: params.fingerprint(),
            config,
            params,
            engine,
            store: GraphStore::new(),
            history: History::new(),
            transport,
            phase: AgentPhase::Initializing,
            pending: VecDeque::new(),
            trusted,
            rejected: 0,
            last_rejection: None,
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn id(&self) -> AgentId {
        self.engine.agent_id()
    }

    pub fn index(&self) -> usize {
        self.config.index
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn params(&self) -> &Arc<NetworkParams> {
        &self.params
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn engine(&self) -> &StateTransitionEngine {
        &self.engine
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn transport(&self) -> &Arc<SyncTransport<S>> {
        &self.transport
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Remote messages rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn last_rejection(&self) -> Option<&RejectReason> {
        self.last_rejection.as_ref()
    }

    pub fn status(&self) -> AgentStatus {
        let evaluation = self.engine.last_evaluation();
        let digest = match self.store.digest() {
            Ok(digest) => hex::encode(&digest[..8]),
            Err(e) => {
                warn!(error = %e, "Replica digest unavailable");
                "-".to_string()
            }
        };
        AgentStatus {
            index: self.config.index,
            agent_id: self.id(),
            phase: self.phase,
            sequence: self.engine.sequence(),
            nodes: self.store.node_count(),
            edges: self.store.edge_count(),
            validity: evaluation.map(|e| e.validity),
            invariants: evaluation.map(|e| e.invariants),
            pending: self.pending.len(),
            history: self.history.len(),
            rejected: self.rejected,
            last_rejection: self.last_rejection.as_ref().map(ToString::to_string),
            digest,
            peers: self.transport.peers().len(),
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Enter `Syncing` and ask every peer for its history.
    pub async fn start_sync(&mut self) {
        if self.phase != AgentPhase::Initializing {
            return;
        }
        self.phase = AgentPhase::Syncing;
        let sent = self.transport.send_sync_request().await;
        info!(index = self.config.index, sent, "Syncing with peers");
    }

    /// Enter `Active` and apply every queued edit.
    pub async fn activate(&mut self) {
        if !matches!(self.phase, AgentPhase::Initializing | AgentPhase::Syncing) {
            return;
        }
        self.phase = AgentPhase::Active;
        info!(
            index = self.config.index,
            sequence = self.engine.sequence(),
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            pending = self.pending.len(),
            "Agent active"
        );
        self.flush_pending().await;
    }

    /// Enter `ShuttingDown`. Nothing is applied or merged afterwards.
    pub fn shutdown(&mut self) {
        if self.phase != AgentPhase::ShuttingDown {
            info!(index = self.config.index, sequence = self.engine.sequence(), "Agent shutting down");
            self.phase = AgentPhase::ShuttingDown;
        }
    }

    /// Ask peers for their history again.
    pub async fn request_sync(&self) -> usize {
        self.transport.send_sync_request().await
    }

    // =========================================================================
    // LOCAL EDITS
    // =========================================================================

    /// Apply `edit` when active, queue it while initializing or syncing.
    pub async fn submit(&mut self, edit: LocalEdit) -> Result<EditOutcome, RejectReason> {
        match self.phase {
            AgentPhase::Active => self.apply_local_edit(edit).await.map(EditOutcome::Applied),
            AgentPhase::Initializing | AgentPhase::Syncing => {
                self.pending.push_back(edit);
                Ok(EditOutcome::Queued {
                    pending: self.pending.len(),
                })
            }
            AgentPhase::ShuttingDown => Err(RejectReason::InvalidEntity(
                "agent is shutting down".to_string(),
            )),
        }
    }

    /// Turn `edit` into a signed transition, store it and broadcast it.
    ///
    /// Atomic: on rejection neither the store nor the engine changes.
    pub async fn apply_local_edit(&mut self, edit: LocalEdit) -> Result<Proof, RejectReason> {
        let sequence = self.engine.sequence() + 1;
        let entity = edit.into_entity(self.id(), sequence)?;

        if self.store.contains(entity.id()) {
            return Err(GraphError::DuplicateId(entity.id().to_string()).into());
        }
        if let Some(node) = self.store.missing_references(&entity).first() {
            return Err(RejectReason::UnknownNode {
                entity: entity.id().to_string(),
                node: (*node).clone(),
            });
        }
        self.transport
            .check_fits(&entity)
            .map_err(|e| RejectReason::InvalidEntity(e.to_string()))?;

        let delta = delta_for_entity(&entity, self.params.dimension);
        let entities = vec![entity];
        let summary = self.store.transition_summary(&delta, &entities)?;
        let proof = self.engine.propose(&delta, &summary).await?;

        let provenance = proof.key();
        for entity in &entities {
            if let Err(e) = self.store.insert(entity.clone(), provenance) {
                error!(sequence = proof.sequence, error = %e, "Accepted transition could not be stored");
            }
        }
        self.history.push(HistoryEntry {
            local_sequence: proof.sequence,
            proof,
            origin: proof,
            entities: entities.clone(),
        });

        info!(
            sequence = proof.sequence,
            id = entities[0].id(),
            kind = entities[0].kind(),
            address = %proof.address(),
            "Local edit applied"
        );
        self.broadcast(&proof, &entities).await;
        Ok(proof)
    }

    async fn flush_pending(&mut self) {
        while self.phase.applies_local() {
            let Some(edit) = self.pending.pop_front() else {
                break;
            };
            if self.already_stored(&edit) {
                debug!(id = edit.id(), "Queued edit already present, skipped");
                continue;
            }
            let id = edit.id().to_string();
            if let Err(reason) = self.apply_local_edit(edit).await {
                warn!(%id, %reason, "Queued edit rejected");
            }
        }
    }

    fn already_stored(&self, edit: &LocalEdit) -> bool {
        let Some(stored) = self.store.get(edit.id()) else {
            return false;
        };
        edit.clone()
            .into_entity(self.id(), 0)
            .map(|entity| stored.entity.same_payload(&entity))
            .unwrap_or(false)
    }

    // =========================================================================
    // REMOTE MERGE
    // =========================================================================

    /// Route one inbound message.
    pub async fn handle_inbound(&mut self, inbound: Inbound) {
        if !self.phase.accepts_remote() {
            debug!(from = %inbound.from(), phase = %self.phase, "Inbound ignored");
            return;
        }
        match inbound {
            Inbound::Transition {
                fingerprint,
                proof,
                entities,
                ..
            } => {
                self.merge(fingerprint, proof, entities).await;
            }
            Inbound::SyncRequest { from, fingerprint } => {
                if fingerprint != self.fingerprint {
                    self.record_rejection(None, RejectReason::ParamsMismatch);
                    return;
                }
                self.answer_sync_request(from).await;
            }
        }
    }

    /// Merge a remote batch. Rejections are counted and returned as values.
    pub async fn merge(
        &mut self,
        fingerprint: [u8; 8],
        proof: Proof,
        entities: Vec<Entity>,
    ) -> MergeOutcome {
        match self.try_merge(fingerprint, &proof, &entities).await {
            Ok(outcome) => outcome,
            Err(reason) => {
                self.record_rejection(Some(&proof), reason.clone());
                MergeOutcome::Rejected(reason)
            }
        }
    }

    async fn try_merge(
        &mut self,
        fingerprint: [u8; 8],
        proof: &Proof,
        entities: &[Entity],
    ) -> Result<MergeOutcome, RejectReason> {
        check_dimension(proof, &self.params)?;
        if fingerprint != self.fingerprint {
            return Err(RejectReason::ParamsMismatch);
        }
        if !self.trusted.is_empty() && !self.trusted.contains(&proof.agent_id) {
            return Err(RejectReason::UntrustedAgent(proof.agent_id.short_hex()));
        }

        let dimension = self.params.dimension;
        let origin_delta = delta_for_entities(entities, dimension);
        let origin_summary = self.store.transition_summary(&origin_delta, entities)?;
        verify_transition(proof, &origin_summary)?;
        if proof.agent_id == self.id() {
            // Our own proof from before a restart: never sign that k again.
            self.engine.advance_sequence(proof.sequence);
        }

        let plan = plan_merge(&self.store, entities)?;
        if plan.is_noop() {
            debug!(
                agent = %proof.agent_id,
                sequence = proof.sequence,
                "Batch already merged"
            );
            return Ok(MergeOutcome::Duplicate);
        }

        let incoming_key = proof.key();
        let mut delta = delta_for_entities(&plan.fresh, dimension);
        let mut winners: Vec<Entity> = Vec::new();
        let mut losers: Vec<Entity> = Vec::new();
        for conflict in &plan.conflicts {
            let incumbent = &conflict.incumbent.entity;
            match resolve(
                incumbent,
                conflict.incumbent.provenance,
                &conflict.incoming,
                incoming_key,
            ) {
                Resolution::IncomingWins => {
                    debug!(id = incumbent.id(), winner = %conflict.incoming.creator(), "Conflict: incoming wins");
                    swap_delta(&mut delta, incumbent, &conflict.incoming, dimension)?;
                    winners.push(conflict.incoming.clone());
                    losers.push(incumbent.clone());
                }
                Resolution::IncumbentHolds => {
                    debug!(id = incumbent.id(), winner = %incumbent.creator(), "Conflict: incumbent holds");
                    losers.push(conflict.incoming.clone());
                }
            }
        }

        let mut report = MergeReport {
            sequence: self.engine.sequence(),
            accepted: plan.fresh.len(),
            duplicates: plan.duplicates.len(),
            conflicts_won: winners.len(),
            conflicts_lost: plan.conflicts.len() - winners.len(),
        };

        if plan.fresh.is_empty() && winners.is_empty() {
            // Every conflict kept its incumbent: the replica is unchanged.
            self.requeue_losers(losers).await;
            return Ok(MergeOutcome::Applied(report));
        }

        let committed: Vec<Entity> = plan.fresh.iter().chain(&winners).cloned().collect();
        let summary = self.store.transition_summary(&delta, &committed)?;
        let local_proof = self.engine.propose(&delta, &summary).await?;

        self.commit(plan.fresh, winners, incoming_key);
        self.history.push(HistoryEntry {
            local_sequence: local_proof.sequence,
            proof: local_proof,
            origin: *proof,
            entities: entities.to_vec(),
        });
        report.sequence = local_proof.sequence;

        info!(
            from = %proof.agent_id,
            origin_sequence = proof.sequence,
            sequence = local_proof.sequence,
            accepted = report.accepted,
            duplicates = report.duplicates,
            won = report.conflicts_won,
            lost = report.conflicts_lost,
            "Remote batch merged"
        );

        // Relay once: a second delivery is a duplicate and stops here.
        self.broadcast(proof, entities).await;
        self.requeue_losers(losers).await;
        Ok(MergeOutcome::Applied(report))
    }

    /// Write an accepted merge into the store. Fresh nodes go first so that
    /// every hyperedge finds its members.
    fn commit(&mut self, fresh: Vec<Entity>, winners: Vec<Entity>, provenance: ProofKey) {
        let (nodes, edges): (Vec<Entity>, Vec<Entity>) = fresh
            .into_iter()
            .partition(|e| matches!(e, Entity::Node(_)));

        for entity in nodes {
            if let Err(e) = self.store.insert(entity, provenance) {
                error!(error = %e, "Accepted node could not be stored");
            }
        }
        for entity in winners {
            if let Err(e) = self.store.replace(entity, provenance) {
                error!(error = %e, "Conflict winner could not be stored");
            }
        }
        for entity in edges {
            if let Err(e) = self.store.insert(entity, provenance) {
                error!(error = %e, "Accepted hyperedge could not be stored");
            }
        }
    }

    async fn requeue_losers(&mut self, losers: Vec<Entity>) {
        if losers.is_empty() {
            return;
        }
        for loser in &losers {
            let edit = LocalEdit::disambiguated(loser);
            debug!(id = loser.id(), renamed = edit.id(), "Conflict loser re-queued");
            self.pending.push_back(edit);
        }
        self.flush_pending().await;
    }

    fn record_rejection(&mut self, proof: Option<&Proof>, reason: RejectReason) {
        self.rejected += 1;
        if reason.is_config_mismatch() {
            warn!(
                agent = ?proof.map(|p| p.agent_id),
                %reason,
                rejected = self.rejected,
                "Message from a peer with different network parameters dropped"
            );
        } else {
            info!(
                agent = ?proof.map(|p| p.agent_id),
                sequence = ?proof.map(|p| p.sequence),
                %reason,
                rejected = self.rejected,
                "Remote transition rejected"
            );
        }
        self.last_rejection = Some(reason);
    }

    // =========================================================================
    // GOSSIP
    // =========================================================================

    async fn broadcast(&self, proof: &Proof, entities: &[Entity]) {
        if let Err(e) = self.transport.broadcast(proof, entities).await {
            warn!(sequence = proof.sequence, error = %e, "Broadcast failed");
        }
    }

    /// Re-send the most recent local transitions to every peer.
    pub async fn rebroadcast(&self) -> usize {
        let recent = self.history.recent_local(self.config.rebroadcast_window);
        for entry in &recent {
            self.broadcast(&entry.origin, &entry.entities).await;
        }
        if !recent.is_empty() {
            debug!(transitions = recent.len(), "Periodic re-broadcast");
        }
        recent.len()
    }

    /// Send the whole history to `target`, oldest first, each entry with the
    /// proof it originally travelled with. Merged entries are included so a
    /// joiner can still obtain entities whose originator is gone.
    pub async fn answer_sync_request(&self, target: SocketAddr) -> usize {
        let mut answered = 0;
        for entry in self.history.iter() {
            match self
                .transport
                .send_transition(target, &entry.origin, &entry.entities)
                .await
            {
                Ok(_) => answered += 1,
                Err(e) => warn!(%target, sequence = entry.origin.sequence, error = %e, "Sync answer failed"),
            }
        }
        debug!(%target, transitions = answered, "Sync request answered");
        answered
    }
}

/// `delta += Δ(winner) − Δ(loser)`.
fn swap_delta(
    delta: &mut StateMatrix,
    loser: &Entity,
    winner: &Entity,
    dimension: usize,
) -> Result<(), RejectReason> {
    let swap = delta_for_entity(winner, dimension)
        .checked_sub(&delta_for_entity(loser, dimension))
        .map_err(|e| RejectReason::InvalidEntity(e.to_string()))?;
    delta
        .add_assign_checked(&swap)
        .map_err(|e| RejectReason::InvalidEntity(e.to_string()))
}
