use crate::domain::errors::TransportError;
use crate::ports::outbound::DatagramSocket;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Production UDP socket.
///
/// One socket per agent, used both for sending and receiving, so the source
/// address of everything an agent sends is the address peers can answer to.
pub struct UdpDatagramSocket {
    socket: UdpSocket,
}

impl UdpDatagramSocket {
    /// Bind to a local address (e.g. `127.0.0.1:7400`).
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl DatagramSocket for UdpDatagramSocket {
    async fn send_to(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        self.socket.send_to(bytes, target).await?;
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        Ok(self.socket.recv_from(buf).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}
