//! Adapters for the transport ports.

pub mod memory;
pub mod udp;
