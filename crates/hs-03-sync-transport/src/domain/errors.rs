//! Transport error types.

use thiserror::Error;

/// Errors raised by the sync transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Bad magic, version, kind, length or encoding. Dropped at the transport.
    #[error("malformed datagram: {0}")]
    MalformedDatagram(String),

    /// One entity cannot fit into a single datagram.
    #[error("entity {id} needs {bytes} bytes, datagram budget is {budget}")]
    EntityTooLarge {
        id: String,
        bytes: usize,
        budget: usize,
    },

    /// The batch would need more fragments than the header can count.
    #[error("batch needs {0} datagrams, limit is 65535")]
    BatchTooLarge(usize),

    /// Socket-level failure.
    #[error("socket error: {0}")]
    Io(String),

    /// The socket was closed.
    #[error("socket closed")]
    Closed,
}

impl TransportError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TransportError::MalformedDatagram(reason.into())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}
