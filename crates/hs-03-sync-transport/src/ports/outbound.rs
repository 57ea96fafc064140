//! # Outbound Ports (Driven Ports)
//!
//! The transport only needs to send and receive raw datagrams.

use crate::domain::errors::TransportError;
use async_trait::async_trait;
use std::net::SocketAddr;

/// Connectionless datagram socket.
#[async_trait]
pub trait DatagramSocket: Send + Sync + 'static {
    /// Send one datagram. Delivery is not guaranteed.
    async fn send_to(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError>;

    /// Wait for the next datagram, returning its length and sender.
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError>;

    /// Address peers reach this socket at.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}
