use std::fmt;

/// Lifecycle of one agent process.
///
/// ```text
/// Initializing ──→ Syncing ──(warm-up elapsed)──→ Active ──(quit)──→ ShuttingDown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentPhase {
    /// Identity and parameters are being set up.
    Initializing,
    /// Ingesting peer history; local edits are queued.
    Syncing,
    /// Normal operation.
    Active,
    /// No further edits or merges.
    ShuttingDown,
}

impl AgentPhase {
    /// Whether remote transitions are merged in this phase.
    pub fn accepts_remote(self) -> bool {
        matches!(self, AgentPhase::Syncing | AgentPhase::Active)
    }

    /// Whether local edits are applied right away rather than queued.
    pub fn applies_local(self) -> bool {
        self == AgentPhase::Active
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Initializing => "initializing",
            AgentPhase::Syncing => "syncing",
            AgentPhase::Active => "active",
            AgentPhase::ShuttingDown => "shutting-down",
        };
        f.write_str(name)
    }
}
