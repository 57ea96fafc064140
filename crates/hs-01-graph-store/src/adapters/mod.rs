//! Adapters for the Graph Store ports.

pub mod bincode;
