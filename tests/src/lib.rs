//! # Hypersync Test Suite
//!
//! Multi-agent scenarios over the in-process datagram network. Every agent
//! runs the real transport receive loop, so batches are encoded, fragmented,
//! reassembled and merged exactly as they would be over UDP.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p hs-tests
//! ```

pub mod integration;
