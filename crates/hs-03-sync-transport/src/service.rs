//! # Sync Transport Service
//!
//! Fire-and-forget gossip of `(proof, entities)` batches to a static peer
//! list, plus the receive loop that decodes, reassembles and hands complete
//! messages to the agent.

use crate::domain::codec::{check_entity_fits, decode, encode_sync_request, encode_transition};
use crate::domain::errors::TransportError;
use crate::domain::message::{Datagram, Inbound};
use crate::domain::reassembly::Reassembler;
use crate::ports::outbound::DatagramSocket;
use parking_lot::RwLock;
use shared_types::{Entity, NetworkParams, Proof};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Largest datagram the receive loop accepts.
const RECEIVE_BUFFER_BYTES: usize = 65_536;

/// Transport settings derived from the network parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub fingerprint: [u8; 8],
    pub max_datagram_bytes: usize,
    pub reassembly_timeout: Duration,
}

impl From<&NetworkParams> for TransportConfig {
    fn from(params: &NetworkParams) -> Self {
        Self {
            fingerprint: params.fingerprint(),
            max_datagram_bytes: params.max_datagram_bytes,
            reassembly_timeout: params.reassembly_timeout,
        }
    }
}

/// Datagram gossip over one socket.
pub struct SyncTransport<S: DatagramSocket> {
    socket: Arc<S>,
    config: TransportConfig,
    peers: RwLock<Vec<SocketAddr>>,
    next_batch: AtomicU64,
}

impl<S: DatagramSocket> SyncTransport<S> {
    pub fn new(socket: S, config: TransportConfig, peers: Vec<SocketAddr>) -> Self {
        Self {
            socket: Arc::new(socket),
            config,
            peers: RwLock::new(peers),
            next_batch: AtomicU64::new(rand::random()),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.peers.read().clone()
    }

    /// Add a peer unless already known.
    pub fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.write();
        if !peers.contains(&addr) {
            peers.push(addr);
        }
    }

    /// Whether `entity` can be carried by this transport at all.
    pub fn check_fits(&self, entity: &Entity) -> Result<(), TransportError> {
        check_entity_fits(entity, self.config.max_datagram_bytes)
    }

    fn next_batch_id(&self) -> u64 {
        self.next_batch.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a proof and its entities to every peer. Per-peer send failures
    /// are logged and skipped. Returns the number of datagrams sent.
    pub async fn broadcast(
        &self,
        proof: &Proof,
        entities: &[Entity],
    ) -> Result<usize, TransportError> {
        let datagrams = encode_transition(
            self.config.fingerprint,
            self.next_batch_id(),
            proof,
            entities,
            self.config.max_datagram_bytes,
        )?;
        let peers = self.peers();
        let mut sent = 0;
        for peer in &peers {
            sent += self.send_all(&datagrams, *peer).await;
        }
        trace!(
            sequence = proof.sequence,
            fragments = datagrams.len(),
            peers = peers.len(),
            "Transition broadcast"
        );
        Ok(sent)
    }

    /// Send a proof and its entities to a single peer.
    pub async fn send_transition(
        &self,
        target: SocketAddr,
        proof: &Proof,
        entities: &[Entity],
    ) -> Result<usize, TransportError> {
        let datagrams = encode_transition(
            self.config.fingerprint,
            self.next_batch_id(),
            proof,
            entities,
            self.config.max_datagram_bytes,
        )?;
        Ok(self.send_all(&datagrams, target).await)
    }

    /// Ask every peer for its whole history.
    pub async fn send_sync_request(&self) -> usize {
        let bytes = encode_sync_request(self.config.fingerprint, self.next_batch_id());
        let peers = self.peers();
        let mut sent = 0;
        for peer in peers {
            sent += self.send_all(std::slice::from_ref(&bytes), peer).await;
        }
        sent
    }

    async fn send_all(&self, datagrams: &[Vec<u8>], target: SocketAddr) -> usize {
        let mut sent = 0;
        for bytes in datagrams {
            match self.socket.send_to(bytes, target).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    debug!(%target, error = %e, "Datagram send failed");
                }
            }
        }
        sent
    }

    /// Spawn the receive loop. `callback` sees every complete inbound
    /// message; malformed datagrams and incomplete batches never reach it.
    /// The loop ends when the socket closes or the handle is aborted.
    pub fn on_receive<F>(self: &Arc<Self>, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(Inbound) + Send + 'static,
    {
        let transport = Arc::clone(self);
        tokio::spawn(async move {
            let mut buf = vec![0u8; RECEIVE_BUFFER_BYTES];
            let mut reassembler = Reassembler::new(transport.config.reassembly_timeout);
            let mut purge = tokio::time::interval(transport.config.reassembly_timeout);

            loop {
                tokio::select! {
                    received = transport.socket.recv_from(&mut buf) => {
                        let (len, from) = match received {
                            Ok(received) => received,
                            Err(TransportError::Closed) => {
                                debug!("Socket closed, receive loop exiting");
                                break;
                            }
                            Err(e) => {
                                warn!(error = %e, "Receive failed");
                                continue;
                            }
                        };
                        if let Some(message) = transport.ingest(&mut reassembler, from, &buf[..len]) {
                            callback(message);
                        }
                    }
                    _ = purge.tick() => {
                        reassembler.purge_expired(Instant::now());
                    }
                }
            }
        })
    }

    fn ingest(
        &self,
        reassembler: &mut Reassembler,
        from: SocketAddr,
        bytes: &[u8],
    ) -> Option<Inbound> {
        let datagram = match decode(bytes) {
            Ok(datagram) => datagram,
            Err(e) => {
                debug!(%from, len = bytes.len(), error = %e, "Dropping datagram");
                return None;
            }
        };

        match datagram {
            Datagram::SyncRequest { header } => Some(Inbound::SyncRequest {
                from,
                fingerprint: header.fingerprint,
            }),
            Datagram::Transition {
                header,
                proof,
                entities,
            } => {
                let (proof, entities) =
                    reassembler.accept(from, &header, proof, entities, Instant::now())?;
                Some(Inbound::Transition {
                    from,
                    fingerprint: header.fingerprint,
                    proof,
                    entities,
                })
            }
        }
    }
}
