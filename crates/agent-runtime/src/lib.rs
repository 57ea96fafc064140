//! # Hypersync Agent Runtime
//!
//! Composition root of a Hypersync deployment.
//!
//! ## Process Model
//!
//! ```text
//! hypersync (supervisor)
//!   ├── hypersync  HS_AGENT_INDEX=0  udp 127.0.0.1:7400
//!   ├── hypersync  HS_AGENT_INDEX=1  udp 127.0.0.1:7401
//!   └── ...        one per CPU core
//! ```
//!
//! Each agent runs a current-thread tokio runtime for networking, console
//! and timers, plus the dedicated compute thread of its state transition
//! engine. Agents share nothing but datagrams.
//!
//! ## Modules
//!
//! - `config` - `HS_*` environment configuration
//! - `agent` - [`Agent`]: replica, engine, history, merge pipeline
//! - `console` - operator commands
//! - `runtime` - the per-agent control loop
//! - `supervisor` - child processes, console relay, restarts

pub mod agent;
pub mod config;
pub mod console;
pub mod runtime;
pub mod supervisor;

pub use agent::{Agent, AgentError, AgentPhase, AgentStatus, EditOutcome};
pub use config::{AgentConfig, ConfigError, SupervisorConfig};
pub use supervisor::Supervisor;
