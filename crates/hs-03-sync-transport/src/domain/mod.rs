//! Sync transport domain: wire layout, codec and reassembly.

pub mod codec;
pub mod errors;
pub mod message;
pub mod reassembly;
