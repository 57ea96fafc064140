//! Snapshot of an agent for the `status` command.

use super::AgentPhase;
use shared_types::{AgentId, Invariants};
use std::fmt;

/// Point-in-time view of one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    pub index: usize,
    pub agent_id: AgentId,
    pub phase: AgentPhase,
    pub sequence: u64,
    pub nodes: usize,
    pub edges: usize,
    /// `None` until the first transition is accepted.
    pub validity: Option<f64>,
    pub invariants: Option<Invariants>,
    pub pending: usize,
    pub history: usize,
    pub rejected: u64,
    pub last_rejection: Option<String>,
    /// First 8 bytes of the replica digest, hex.
    pub digest: String,
    pub peers: usize,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "agent {} [{}] id={} seq={} nodes={} edges={}",
            self.index, self.phase, self.agent_id, self.sequence, self.nodes, self.edges
        )?;
        match (self.validity, self.invariants) {
            (Some(validity), Some(invariants)) => {
                write!(f, " validity={validity:.4} {invariants}")?
            }
            _ => f.write_str(" validity=- (genesis)")?,
        }
        write!(
            f,
            " pending={} history={} peers={} digest={} rejected={}",
            self.pending, self.history, self.peers, self.digest, self.rejected
        )?;
        if let Some(reason) = &self.last_rejection {
            write!(f, " last_rejection=\"{reason}\"")?;
        }
        Ok(())
    }
}
