//! # Propagation
//!
//! A local edit becomes one signed transition, travels to every peer as
//! datagrams and is merged there, so all replicas hold the same entities
//! and the same state matrix.

#[cfg(test)]
mod tests {
    use crate::integration::cluster::{addr, edge, node, payloads, Cluster};
    use agent_runtime::{AgentPhase, EditOutcome};
    use hs_01_graph_store::{delta_for_entities, MergeOutcome, RelationKind};
    use hs_03_sync_transport::TamperFn;
    use shared_types::{Invariants, StateMatrix};
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn growth_relation() -> String {
        (0..)
            .map(|i| format!("grows-{i}"))
            .find(|r| RelationKind::classify(r) == RelationKind::Growth)
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_node_reaches_peer() {
        let mut cluster = Cluster::active(2).await;

        cluster.edit(0, node("n1", "first")).await;
        cluster.settle().await;

        let a = cluster.agent(0);
        let b = cluster.agent(1);
        let evaluation = a.engine().last_evaluation().unwrap();
        assert!((evaluation.validity - 1.0).abs() < 1e-9);
        assert_eq!(evaluation.invariants, Invariants::new(1, 0));

        assert_eq!(b.store().node_count(), 1);
        assert_eq!(b.store().digest().unwrap(), a.store().digest().unwrap());
        assert_eq!(b.engine().state(), a.engine().state());
        assert_eq!(b.engine().sequence(), 1);

        let entry = b.history().last().unwrap();
        assert_eq!(entry.origin.agent_id, a.id());
        assert!(!entry.is_local());
        assert_eq!(b.rejected(), 0);
    }

    #[tokio::test]
    async fn test_three_agents_converge_on_nodes_and_hyperedge() {
        let mut cluster = Cluster::active(3).await;
        let relation = growth_relation();

        cluster.edit(0, node("n1", "alpha")).await;
        cluster.settle().await;
        cluster.edit(1, node("n2", "beta")).await;
        cluster.settle().await;
        cluster.edit(2, edge("e1", &relation, &["n1", "n2"])).await;
        cluster.settle().await;

        let digest = cluster.agent(0).store().digest().unwrap();
        for agent in &cluster.agents {
            assert_eq!(agent.store().len(), 3);
            assert_eq!(agent.store().digest().unwrap(), digest);
            assert_eq!(agent.engine().state(), cluster.agent(0).engine().state());
            assert_eq!(agent.rejected(), 0);
        }
    }

    #[tokio::test]
    async fn test_state_is_identity_plus_accepted_deltas() {
        let mut cluster = Cluster::active(2).await;

        // Concurrent edits under distinct ids: both sides merge both.
        cluster.edit(0, node("n1", "alpha")).await;
        cluster.edit(1, node("n2", "beta")).await;
        cluster.settle().await;
        cluster.edit(0, node("n3", "gamma")).await;
        cluster.settle().await;

        for agent in &cluster.agents {
            let entities: Vec<_> = agent.store().iter().map(|s| s.entity.clone()).collect();
            let mut expected = StateMatrix::identity(cluster.params.dimension);
            expected
                .add_assign_checked(&delta_for_entities(&entities, cluster.params.dimension))
                .unwrap();

            assert_eq!(agent.store().node_count(), 3);
            assert_eq!(agent.engine().state(), &expected);
            assert_eq!(agent.engine().sequence(), agent.history().len() as u64);
        }
    }

    #[tokio::test]
    async fn test_second_delivery_is_duplicate() {
        let mut cluster = Cluster::active(2).await;
        let proof = cluster
            .agent_mut(0)
            .apply_local_edit(node("n1", "first"))
            .await
            .unwrap();
        let entities = cluster.agent(0).history().last().unwrap().entities.clone();
        cluster.settle().await;

        let b = cluster.agent_mut(1);
        let sequence = b.engine().sequence();
        let evaluations = b.engine().evaluations();
        let fingerprint = b.params().fingerprint();

        let outcome = b.merge(fingerprint, proof, entities).await;
        assert_eq!(outcome, MergeOutcome::Duplicate);
        assert_eq!(b.engine().sequence(), sequence);
        assert_eq!(b.engine().evaluations(), evaluations);
        assert_eq!(b.rejected(), 0);
    }

    #[tokio::test]
    async fn test_relay_reaches_agent_the_origin_cannot() {
        let mut cluster = Cluster::active(3).await;
        // Agent 0 reaches agent 1 only; agent 1 relays to agent 2.
        let (origin, relay) = (addr(0), addr(1));
        let tamper: Arc<TamperFn> = Arc::new(move |from: SocketAddr, to: SocketAddr, _: &mut Vec<u8>| {
            from != origin || to == relay
        });
        cluster.net.set_tamper(Some(tamper));

        cluster.edit(0, node("n1", "relayed")).await;
        cluster.settle().await;

        let c = cluster.agent(2);
        assert!(c.store().contains("n1"));
        assert_eq!(c.history().last().unwrap().origin.agent_id, cluster.agent(0).id());
    }

    #[tokio::test]
    async fn test_late_joiner_catches_up_through_sync_request() {
        let mut cluster = Cluster::active(2).await;
        cluster.edit(0, node("n1", "alpha")).await;
        cluster.edit(1, node("n2", "beta")).await;
        cluster.settle().await;

        let joiner = cluster.join().await;
        assert_eq!(cluster.agent(joiner).phase(), AgentPhase::Syncing);
        cluster.settle().await;

        let c = cluster.agent(joiner);
        assert_eq!(payloads(c), payloads(cluster.agent(0)));
        assert_eq!(c.engine().state(), cluster.agent(0).engine().state());

        cluster.agent_mut(joiner).activate().await;
        cluster.edit(joiner, node("n3", "gamma")).await;
        cluster.settle().await;
        for agent in &cluster.agents {
            assert!(agent.store().contains("n3"));
        }
    }

    #[tokio::test]
    async fn test_edits_wait_for_activation() {
        let mut cluster = Cluster::new(2);
        for agent in &mut cluster.agents {
            agent.start_sync().await;
        }

        let outcome = cluster.agent_mut(0).submit(node("n1", "early")).await;
        assert_eq!(outcome, Ok(EditOutcome::Queued { pending: 1 }));
        cluster.settle().await;
        assert!(!cluster.agent(1).store().contains("n1"));

        cluster.agent_mut(1).activate().await;
        cluster.agent_mut(0).activate().await;
        cluster.settle().await;

        assert_eq!(cluster.agent(0).pending(), 0);
        assert!(cluster.agent(1).store().contains("n1"));
    }

    #[tokio::test]
    async fn test_joiner_recovers_entities_of_an_unreachable_originator() {
        let mut cluster = Cluster::active(3).await;
        let relation = growth_relation();
        cluster.edit(2, node("n1", "alpha")).await;
        cluster.edit(2, node("n2", "beta")).await;
        cluster.settle().await;
        cluster.edit(0, edge("e1", &relation, &["n1", "n2"])).await;
        cluster.settle().await;

        // Agent 2 goes dark before anyone new arrives.
        let gone = addr(2);
        let tamper: Arc<TamperFn> = Arc::new(move |from: SocketAddr, to: SocketAddr, _: &mut Vec<u8>| {
            from != gone && to != gone
        });
        cluster.net.set_tamper(Some(tamper));

        let joiner = cluster.join().await;
        cluster.settle().await;

        let c = cluster.agent(joiner);
        assert_eq!(c.store().node_count(), 2);
        assert_eq!(c.store().edge_count(), 1);
        assert_eq!(c.rejected(), 0);
        assert_eq!(payloads(c), payloads(cluster.agent(0)));
        assert_eq!(c.engine().state(), cluster.agent(0).engine().state());
    }

    #[tokio::test]
    async fn test_restarted_agent_resumes_past_its_old_sequences() {
        let mut cluster = Cluster::active(3).await;
        let mut before = 0;
        for id in ["n1", "n2", "n3"] {
            let proof = cluster
                .agent_mut(0)
                .apply_local_edit(node(id, "before restart"))
                .await
                .unwrap();
            before = before.max(proof.sequence);
        }
        cluster.settle().await;
        cluster.edit(1, node("m1", "peer")).await;
        cluster.settle().await;

        cluster.restart(0).await;
        cluster.settle().await;
        assert_eq!(payloads(cluster.agent(0)), payloads(cluster.agent(1)));
        assert_eq!(cluster.agent(0).rejected(), 0);

        cluster.agent_mut(0).activate().await;
        let proof = cluster
            .agent_mut(0)
            .apply_local_edit(node("n4", "after restart"))
            .await
            .unwrap();
        assert!(proof.sequence > before);
        cluster.settle().await;

        for agent in &cluster.agents {
            assert!(agent.store().contains("n4"));
            assert_eq!(agent.store().node_count(), 5);
            assert_eq!(agent.rejected(), 0);
        }
    }
}
