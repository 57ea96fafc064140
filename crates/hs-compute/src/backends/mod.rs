//! Analysis backends
//!
//! Only a CPU backend ships: matrices are small (n is a network constant in
//! the tens) and the work is latency-bound, not throughput-bound.

pub mod cpu;
