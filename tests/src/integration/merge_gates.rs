//! # Merge Admission
//!
//! Remote batches are checked cheapest first. Configuration mismatches are
//! dropped before any computation; forged or incoherent claims are dropped
//! before the local state moves. Every rejection leaves the replica as it
//! was and bumps the rejection counter.

#[cfg(test)]
mod tests {
    use crate::integration::cluster::{node, Cluster};
    use agent_runtime::{Agent, AgentConfig};
    use hs_01_graph_store::{delta_for_entities, GraphStore, MergeOutcome};
    use hs_02_state_transition::{sign_transition, StateTransitionEngine};
    use hs_03_sync_transport::{
        DatagramKind, MemoryNetwork, MemorySocket, SyncTransport, TamperFn, TransportConfig,
        HEADER_LEN,
    };
    use hs_compute::{Analysis, AnalysisBackend, ComputeError};
    use shared_crypto::AgentKeyPair;
    use shared_types::{
        AgentId, Entity, Hyperedge, Invariants, NetworkParams, Node, Proof, RejectReason,
        StateMatrix,
    };
    use std::net::SocketAddr;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    /// Offset of the proof signature inside a transition datagram.
    const SIGNATURE_OFFSET: usize = HEADER_LEN + 32 + 8 + 2 + 2 + 2;

    fn outsider() -> AgentKeyPair {
        AgentKeyPair::from_seed([0x42; 32])
    }

    fn outsider_node(id: &str) -> Entity {
        Entity::Node(Node {
            id: id.into(),
            label: "outside".into(),
            creator: AgentId::from(outsider().public_key()),
            sequence: 1,
        })
    }

    /// A batch signed by an agent outside the cluster.
    fn signed_batch(entities: &[Entity], dimension: u16, invariants: Invariants) -> Proof {
        let delta = delta_for_entities(entities, NetworkParams::default().dimension);
        let summary = GraphStore::new()
            .transition_summary(&delta, entities)
            .unwrap();
        sign_transition(&outsider(), &summary, 1, dimension, invariants)
    }

    /// Reports the same analysis for every candidate.
    struct FixedBackend {
        validity: f64,
    }

    impl AnalysisBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn analyse(&self, _: &StateMatrix, _: &AtomicBool) -> Result<Analysis, ComputeError> {
            Ok(Analysis {
                validity: self.validity,
                invariants: Invariants::new(1, 0),
                iterations: (1, 1),
            })
        }
    }

    /// A lone active agent whose engine analyses with `backend`.
    async fn agent_with_backend(backend: FixedBackend) -> Agent<MemorySocket> {
        let params = Arc::new(NetworkParams::default());
        let net = MemoryNetwork::new();
        let transport = Arc::new(SyncTransport::new(
            net.bind(),
            TransportConfig::from(params.as_ref()),
            Vec::new(),
        ));
        let keypair = Arc::new(AgentKeyPair::from_seed([7; 32]));
        let engine =
            StateTransitionEngine::with_backend(Arc::clone(&params), keypair, backend).unwrap();
        let config = AgentConfig {
            console: false,
            ..Default::default()
        };
        let mut agent = Agent::with_engine(config, params, engine, transport).unwrap();
        agent.start_sync().await;
        agent.activate().await;
        agent
    }

    #[tokio::test]
    async fn test_low_local_validity_rejects_a_well_formed_claim() {
        let mut agent = agent_with_backend(FixedBackend { validity: 0.5 }).await;
        let entities = vec![outsider_node("o1")];
        let proof = signed_batch(&entities, 8, Invariants::new(1, 0));

        let fingerprint = agent.params().fingerprint();
        let outcome = agent.merge(fingerprint, proof, entities).await;

        assert!(matches!(
            outcome,
            MergeOutcome::Rejected(RejectReason::CoherenceRejected { validity, invariants })
                if (validity - 0.5).abs() < 1e-9 && invariants == Invariants::new(1, 0)
        ));
        assert_eq!(agent.engine().evaluations(), 1);
        assert_eq!(agent.engine().sequence(), 0);
        assert_eq!(agent.rejected(), 1);
        assert!(agent.store().is_empty());
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_high_local_validity_admits_the_same_claim() {
        let mut agent = agent_with_backend(FixedBackend { validity: 1.0 }).await;
        let entities = vec![outsider_node("o1")];
        let proof = signed_batch(&entities, 8, Invariants::new(1, 0));

        let fingerprint = agent.params().fingerprint();
        let outcome = agent.merge(fingerprint, proof, entities).await;

        assert!(matches!(outcome, MergeOutcome::Applied(_)));
        assert_eq!(agent.engine().evaluations(), 1);
        assert!(agent.store().contains("o1"));
    }

    #[tokio::test]
    async fn test_outside_signer_accepted_without_trust_list() {
        let mut cluster = Cluster::active(1).await;
        let entities = vec![outsider_node("o1")];
        let proof = signed_batch(&entities, 8, Invariants::new(1, 0));

        let agent = cluster.agent_mut(0);
        let fingerprint = agent.params().fingerprint();
        let outcome = agent.merge(fingerprint, proof, entities).await;

        assert!(matches!(outcome, MergeOutcome::Applied(_)));
        assert!(agent.store().contains("o1"));
    }

    #[tokio::test]
    async fn test_tampered_signature_rejected_in_flight() {
        let mut cluster = Cluster::active(2).await;
        let tamper: Arc<TamperFn> = Arc::new(|_: SocketAddr, _: SocketAddr, bytes: &mut Vec<u8>| {
            if bytes.get(2) == Some(&(DatagramKind::Transition as u8)) && bytes.len() > SIGNATURE_OFFSET + 10 {
                bytes[SIGNATURE_OFFSET + 10] ^= 0x01;
            }
            true
        });
        cluster.net.set_tamper(Some(tamper));

        cluster.edit(0, node("n1", "first")).await;
        cluster.settle().await;

        let b = cluster.agent(1);
        assert_eq!(b.rejected(), 1);
        assert_eq!(b.last_rejection(), Some(&RejectReason::InvalidSignature));
        assert_eq!(b.store().node_count(), 0);
        assert_eq!(b.engine().sequence(), 0);
        assert!(b.history().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected_before_evaluation() {
        let mut cluster = Cluster::active(1).await;
        let entities = vec![outsider_node("o1")];
        let proof = signed_batch(&entities, 6, Invariants::new(1, 0));

        let agent = cluster.agent_mut(0);
        let fingerprint = agent.params().fingerprint();
        let outcome = agent.merge(fingerprint, proof, entities).await;

        assert_eq!(
            outcome,
            MergeOutcome::Rejected(RejectReason::DimensionMismatch {
                expected: 8,
                actual: 6
            })
        );
        assert_eq!(agent.engine().evaluations(), 0);
        assert_eq!(agent.rejected(), 1);
        assert!(agent.store().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_parameters_dropped_over_the_wire() {
        let mut cluster = Cluster::active(2).await;
        // Same dimension, different threshold: only the fingerprint differs.
        let mut foreign = NetworkParams::default();
        foreign.validity_threshold = 0.9;
        let tamper_fingerprint = foreign.fingerprint();
        let tamper: Arc<TamperFn> = Arc::new(move |_: SocketAddr, _: SocketAddr, bytes: &mut Vec<u8>| {
            if bytes.len() >= 11 {
                bytes[3..11].copy_from_slice(&tamper_fingerprint);
            }
            true
        });
        cluster.net.set_tamper(Some(tamper));

        cluster.edit(0, node("n1", "first")).await;
        cluster.settle().await;

        let b = cluster.agent(1);
        assert_eq!(b.last_rejection(), Some(&RejectReason::ParamsMismatch));
        assert_eq!(b.engine().evaluations(), 0);
        assert!(b.store().is_empty());
    }

    #[tokio::test]
    async fn test_incoherent_claim_rejected() {
        let mut cluster = Cluster::active(1).await;
        let entities = vec![outsider_node("o1")];
        let proof = signed_batch(&entities, 8, Invariants::new(1, 1));

        let agent = cluster.agent_mut(0);
        let fingerprint = agent.params().fingerprint();
        let outcome = agent.merge(fingerprint, proof, entities).await;

        assert!(matches!(
            outcome,
            MergeOutcome::Rejected(RejectReason::CoherenceRejected { invariants, .. })
                if invariants == Invariants::new(1, 1)
        ));
        assert_eq!(agent.engine().evaluations(), 0);
        assert!(agent.store().is_empty());
    }

    #[tokio::test]
    async fn test_entities_swapped_under_signature_rejected() {
        let mut cluster = Cluster::active(1).await;
        let proof = signed_batch(&[outsider_node("o1")], 8, Invariants::new(1, 0));

        let agent = cluster.agent_mut(0);
        let fingerprint = agent.params().fingerprint();
        let outcome = agent
            .merge(fingerprint, proof, vec![outsider_node("o2")])
            .await;

        assert_eq!(outcome, MergeOutcome::Rejected(RejectReason::InvalidSignature));
        assert!(agent.store().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_reference_rejects_whole_batch() {
        let mut cluster = Cluster::active(1).await;
        let entities = vec![
            outsider_node("o1"),
            Entity::Hyperedge(Hyperedge {
                id: "e1".into(),
                relation: "links".into(),
                members: vec!["o1".into(), "ghost".into()],
                creator: AgentId::from(outsider().public_key()),
                sequence: 1,
            }),
        ];
        let proof = signed_batch(&entities, 8, Invariants::new(1, 0));

        let agent = cluster.agent_mut(0);
        let fingerprint = agent.params().fingerprint();
        let outcome = agent.merge(fingerprint, proof, entities).await;

        assert_eq!(
            outcome,
            MergeOutcome::Rejected(RejectReason::UnknownNode {
                entity: "e1".into(),
                node: "ghost".into()
            })
        );
        assert!(agent.store().is_empty());
        assert_eq!(agent.engine().sequence(), 0);
    }

    #[tokio::test]
    async fn test_rejections_do_not_block_later_merges() {
        let mut cluster = Cluster::active(2).await;
        let proof = signed_batch(&[outsider_node("o1")], 6, Invariants::new(1, 0));
        let b = cluster.agent_mut(1);
        let fingerprint = b.params().fingerprint();
        b.merge(fingerprint, proof, vec![outsider_node("o1")]).await;
        assert_eq!(b.rejected(), 1);

        cluster.edit(0, node("n1", "first")).await;
        cluster.settle().await;

        let b = cluster.agent(1);
        assert!(b.store().contains("n1"));
        assert_eq!(b.rejected(), 1);
        assert!(b.status().to_string().contains("rejected=1"));
    }
}
