//! In-process datagram network for tests and simulations.
//!
//! Behaves like loopback UDP: unordered delivery is not simulated, but a
//! tamper hook can drop or rewrite any datagram in flight.

use crate::domain::errors::TransportError;
use crate::ports::outbound::DatagramSocket;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;

type Delivery = (Vec<u8>, SocketAddr);

/// Rewrites a datagram in flight; returning `false` drops it.
pub type TamperFn = dyn Fn(SocketAddr, SocketAddr, &mut Vec<u8>) -> bool + Send + Sync;

/// Shared switchboard all memory sockets attach to.
#[derive(Default)]
pub struct MemoryNetwork {
    routes: RwLock<HashMap<SocketAddr, mpsc::UnboundedSender<Delivery>>>,
    next_port: Mutex<u16>,
    tamper: RwLock<Option<Arc<TamperFn>>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_port: Mutex::new(20_000),
            ..Default::default()
        })
    }

    /// Attach a socket at the next free loopback port.
    pub fn bind(self: &Arc<Self>) -> MemorySocket {
        let port = {
            let mut next = self.next_port.lock();
            *next += 1;
            *next
        };
        self.bind_at(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port))
    }

    /// Attach a socket at a specific address, replacing any previous one.
    pub fn bind_at(self: &Arc<Self>, addr: SocketAddr) -> MemorySocket {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.write().insert(addr, tx);
        MemorySocket {
            addr,
            network: Arc::clone(self),
            inbox: tokio::sync::Mutex::new(rx),
        }
    }

    /// Install or clear the tamper hook.
    pub fn set_tamper(&self, tamper: Option<Arc<TamperFn>>) {
        *self.tamper.write() = tamper;
    }

    fn deliver(&self, from: SocketAddr, to: SocketAddr, mut bytes: Vec<u8>) {
        if let Some(tamper) = self.tamper.read().clone() {
            if !tamper(from, to, &mut bytes) {
                return;
            }
        }
        if let Some(route) = self.routes.read().get(&to) {
            // A closed inbox behaves like a dead host: the datagram vanishes.
            let _ = route.send((bytes, from));
        }
    }
}

/// One endpoint on a [`MemoryNetwork`].
pub struct MemorySocket {
    addr: SocketAddr,
    network: Arc<MemoryNetwork>,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>,
}

#[async_trait]
impl DatagramSocket for MemorySocket {
    async fn send_to(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        self.network.deliver(self.addr, target, bytes.to_vec());
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        let (bytes, from) = self
            .inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)?;
        // Like UDP, excess bytes are truncated.
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok((len, from))
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.addr)
    }
}
