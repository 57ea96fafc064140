//! # Conflicting Edits
//!
//! Two agents create different entities under the same id before hearing
//! from each other. Every replica must pick the same winner for the id and
//! keep the loser under `<id>~<creator>`, whatever order batches arrive in.

#[cfg(test)]
mod tests {
    use crate::integration::cluster::{edge, node, payloads, Cluster};
    use hs_01_graph_store::RelationKind;
    use shared_types::{Entity, Proof};

    fn growth_relation() -> String {
        (0..)
            .map(|i| format!("grows-{i}"))
            .find(|r| RelationKind::classify(r) == RelationKind::Growth)
            .unwrap()
    }

    fn label_of(cluster: &Cluster, index: usize, id: &str) -> String {
        match &cluster.agent(index).store().get(id).unwrap().entity {
            Entity::Node(node) => node.label.clone(),
            other => panic!("expected node at {id}, got {other:?}"),
        }
    }

    /// Two concurrent `x` nodes from agents 0 and 1, not yet delivered.
    async fn concurrent_x(cluster: &mut Cluster) -> (Proof, Proof) {
        let a = cluster
            .agent_mut(0)
            .apply_local_edit(node("x", "from a"))
            .await
            .unwrap();
        let b = cluster
            .agent_mut(1)
            .apply_local_edit(node("x", "from b"))
            .await
            .unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_concurrent_nodes_converge_on_every_replica() {
        let mut cluster = Cluster::active(3).await;
        let (proof_a, proof_b) = concurrent_x(&mut cluster).await;
        cluster.settle().await;

        let (winner_label, loser) = if proof_a.key() > proof_b.key() {
            ("from a", cluster.agent(1).id())
        } else {
            ("from b", cluster.agent(0).id())
        };
        let renamed = format!("x~{}", loser.short_hex());

        let expected = payloads(cluster.agent(0));
        for index in 0..3 {
            let agent = cluster.agent(index);
            assert_eq!(label_of(&cluster, index, "x"), winner_label);
            assert!(agent.store().contains(&renamed), "agent {index} lost {renamed}");
            assert_eq!(agent.store().node_count(), 2);
            assert_eq!(agent.pending(), 0);
            assert_eq!(agent.rejected(), 0);
            assert_eq!(payloads(agent), expected);
            assert_eq!(agent.engine().state(), cluster.agent(0).engine().state());
        }
    }

    #[tokio::test]
    async fn test_arrival_order_does_not_change_the_winner() {
        let mut cluster = Cluster::active(5).await;
        let (proof_a, proof_b) = concurrent_x(&mut cluster).await;
        let batch_a = cluster.agent(0).history().last().unwrap().entities.clone();
        let batch_b = cluster.agent(1).history().last().unwrap().entities.clone();
        let fingerprint = cluster.params.fingerprint();

        // Agent 2 sees a then b, agent 3 sees b then a, agent 4 sees b, a
        // and b again.
        let orders = [
            (2, vec![(proof_a, &batch_a), (proof_b, &batch_b)]),
            (3, vec![(proof_b, &batch_b), (proof_a, &batch_a)]),
            (4, vec![(proof_b, &batch_b), (proof_a, &batch_a), (proof_b, &batch_b)]),
        ];
        for (index, deliveries) in orders {
            let agent = cluster.agent_mut(index);
            for (proof, batch) in deliveries {
                agent.merge(fingerprint, proof, batch.clone()).await;
            }
        }

        let winner = label_of(&cluster, 2, "x");
        let expected = payloads(cluster.agent(2));
        for index in [3, 4] {
            assert_eq!(label_of(&cluster, index, "x"), winner);
            assert_eq!(payloads(cluster.agent(index)), expected);
            assert_eq!(cluster.agent(index).rejected(), 0);
        }

        cluster.settle().await;
        let expected = payloads(cluster.agent(0));
        for agent in &cluster.agents {
            assert_eq!(payloads(agent), expected);
        }
    }

    #[tokio::test]
    async fn test_node_beats_hyperedge_under_the_same_id() {
        let mut cluster = Cluster::active(3).await;
        cluster.edit(0, node("n1", "alpha")).await;
        cluster.edit(0, node("n2", "beta")).await;
        cluster.settle().await;

        let relation = growth_relation();
        cluster.edit(0, node("k", "a node")).await;
        cluster.edit(1, edge("k", &relation, &["n1", "n2"])).await;
        cluster.settle().await;

        let renamed = format!("k~{}", cluster.agent(1).id().short_hex());
        let expected = payloads(cluster.agent(0));
        for index in 0..3 {
            let agent = cluster.agent(index);
            assert_eq!(label_of(&cluster, index, "k"), "a node");
            match &agent.store().get(&renamed).unwrap().entity {
                Entity::Hyperedge(e) => assert_eq!(e.members, vec!["n1", "n2"]),
                other => panic!("expected hyperedge at {renamed}, got {other:?}"),
            }
            assert_eq!(payloads(agent), expected);
        }
    }

    #[tokio::test]
    async fn test_identical_concurrent_edits_are_not_conflicts() {
        let mut cluster = Cluster::active(2).await;
        cluster.edit(0, node("same", "shared label")).await;
        cluster.edit(1, node("same", "shared label")).await;
        cluster.settle().await;

        for agent in &cluster.agents {
            assert_eq!(agent.store().len(), 1);
            assert_eq!(agent.rejected(), 0);
        }
    }
}
