//! In-process cluster of agents wired over a [`MemoryNetwork`].

use agent_runtime::{Agent, AgentConfig};
use hs_01_graph_store::LocalEdit;
use hs_03_sync_transport::{Inbound, MemoryNetwork, MemorySocket, SyncTransport, TransportConfig};
use shared_types::{Entity, NetworkParams};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Consecutive quiet polls before the network counts as settled.
const QUIET_POLLS: usize = 3;

pub fn addr(index: usize) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 31_000 + index as u16)
}

pub fn node(id: &str, label: &str) -> LocalEdit {
    LocalEdit::AddNode {
        id: id.into(),
        label: label.into(),
    }
}

pub fn edge(id: &str, relation: &str, members: &[&str]) -> LocalEdit {
    LocalEdit::AddEdge {
        id: id.into(),
        relation: relation.into(),
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

/// Replica content without creators or sequence numbers, sorted by id.
pub fn payloads(agent: &Agent<MemorySocket>) -> Vec<String> {
    agent
        .store()
        .iter()
        .map(|stored| match &stored.entity {
            Entity::Node(n) => format!("node {} {:?}", n.id, n.label),
            Entity::Hyperedge(e) => format!("edge {} {} {:?}", e.id, e.relation, e.members),
        })
        .collect()
}

pub struct Cluster {
    pub net: Arc<MemoryNetwork>,
    pub params: Arc<NetworkParams>,
    pub agents: Vec<Agent<MemorySocket>>,
    inboxes: Vec<mpsc::UnboundedReceiver<Inbound>>,
    receivers: Vec<JoinHandle<()>>,
}

impl Cluster {
    /// `size` agents, fully meshed, still `Initializing`.
    pub fn new(size: usize) -> Self {
        Self::with_params(size, NetworkParams::default())
    }

    pub fn with_params(size: usize, params: NetworkParams) -> Self {
        let mut cluster = Self {
            net: MemoryNetwork::new(),
            params: Arc::new(params),
            agents: Vec::new(),
            inboxes: Vec::new(),
            receivers: Vec::new(),
        };
        for index in 0..size {
            let peers = (0..size).filter(|&i| i != index).map(addr).collect();
            cluster.spawn(index, peers);
        }
        cluster
    }

    /// `size` agents, all `Active`.
    pub async fn active(size: usize) -> Self {
        let mut cluster = Self::new(size);
        for agent in &mut cluster.agents {
            agent.start_sync().await;
        }
        cluster.settle().await;
        for agent in &mut cluster.agents {
            agent.activate().await;
        }
        cluster
    }

    /// Add one agent that knows every existing member and is known by them.
    /// It starts syncing right away. Returns its index.
    pub async fn join(&mut self) -> usize {
        let index = self.agents.len();
        for agent in &self.agents {
            agent.transport().add_peer(addr(index));
        }
        self.spawn(index, (0..index).map(addr).collect());
        self.agents[index].start_sync().await;
        index
    }

    /// Replace agent `index` with a fresh process image: same address and
    /// identity seed, empty replica, engine back at genesis. It starts
    /// syncing right away.
    pub async fn restart(&mut self, index: usize) {
        self.receivers[index].abort();
        let peers = (0..self.agents.len())
            .filter(|&i| i != index)
            .map(addr)
            .collect();
        let (agent, inbox, receiver) = self.build(index, peers);
        self.agents[index] = agent;
        self.inboxes[index] = inbox;
        self.receivers[index] = receiver;
        self.agents[index].start_sync().await;
    }

    fn spawn(&mut self, index: usize, peers: Vec<SocketAddr>) {
        let (agent, inbox, receiver) = self.build(index, peers);
        self.agents.push(agent);
        self.inboxes.push(inbox);
        self.receivers.push(receiver);
    }

    fn build(
        &self,
        index: usize,
        peers: Vec<SocketAddr>,
    ) -> (
        Agent<MemorySocket>,
        mpsc::UnboundedReceiver<Inbound>,
        JoinHandle<()>,
    ) {
        let transport = Arc::new(SyncTransport::new(
            self.net.bind_at(addr(index)),
            TransportConfig::from(self.params.as_ref()),
            peers.clone(),
        ));
        let config = AgentConfig {
            index,
            bind_addr: addr(index),
            peers,
            identity_seed: Some([index as u8 + 1; 32]),
            console: false,
            ..Default::default()
        };
        let agent = Agent::new(config, Arc::clone(&self.params), transport)
            .expect("agent construction");

        let (tx, rx) = mpsc::unbounded_channel();
        let receiver = agent.transport().on_receive(move |inbound| {
            let _ = tx.send(inbound);
        });
        (agent, rx, receiver)
    }

    /// Deliver inbound messages until the network goes quiet. Returns how
    /// many messages were handled.
    pub async fn settle(&mut self) -> usize {
        let mut handled = 0;
        let mut quiet = 0;
        while quiet < QUIET_POLLS {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let mut delivered = 0;
            for (agent, inbox) in self.agents.iter_mut().zip(self.inboxes.iter_mut()) {
                while let Ok(inbound) = inbox.try_recv() {
                    agent.handle_inbound(inbound).await;
                    delivered += 1;
                }
            }
            handled += delivered;
            quiet = if delivered == 0 { quiet + 1 } else { 0 };
        }
        handled
    }

    /// Apply `edit` on agent `index`, failing the test on rejection.
    pub async fn edit(&mut self, index: usize, edit: LocalEdit) {
        let id = edit.id().to_string();
        if let Err(reason) = self.agents[index].apply_local_edit(edit).await {
            panic!("agent {index} rejected {id}: {reason}");
        }
    }

    pub fn agent(&self, index: usize) -> &Agent<MemorySocket> {
        &self.agents[index]
    }

    pub fn agent_mut(&mut self, index: usize) -> &mut Agent<MemorySocket> {
        &mut self.agents[index]
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for receiver in &self.receivers {
            receiver.abort();
        }
    }
}
