//! # State Transition Engine (hs-02)
//!
//! Moves an agent's State Vector forward one coherent step at a time.
//!
//! ## Transition Flow
//!
//! ```text
//! delta ──→ State + Delta ──→ [hs-compute worker] ──→ validity, β₀, β₁
//!                                                          │
//!                  ┌──── coherent? ────────────────────────┘
//!                  ↓ yes                     ↓ no
//!        k += 1, sign Proof         RejectReason, nothing changes
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Atomic Apply | State and `k` change together or not at all |
//! | 2 | Monotonic Sequence | `k` strictly increases per accepted transition |
//! | 3 | Coherent States Only | Every reachable state has validity ≥ threshold, β₀ = 1, β₁ = 0 |
//! | 4 | Bounded Computation | No evaluation outlives the computation timeout |
//!
//! ## Crate Structure
//!
//! - `domain/` - Coherence criterion, proof signing and admission, conflict
//!   ordering, transition history
//! - `service.rs` - [`StateTransitionEngine`]

pub mod domain;
pub mod service;

pub use domain::coherence::Evaluation;
pub use domain::conflict::{resolve, Resolution};
pub use domain::history::{History, HistoryEntry};
pub use domain::proofs::{check_dimension, sign_transition, verify_transition};
pub use service::{EngineError, StateTransitionEngine};
