//! # Transition History
//!
//! Append-only record of every transition this agent applied. The whole log
//! answers sync requests; local-origin entries are what gets re-broadcast.

use shared_types::{Entity, Proof};

/// One applied transition.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Local sequence number `k` after the transition.
    pub local_sequence: u64,
    /// Proof this agent signed for the transition.
    pub proof: Proof,
    /// Proof the entities travelled with: the local proof for own edits,
    /// the sender's proof for merged batches.
    pub origin: Proof,
    /// Entities exactly as they travel on the wire with `origin`.
    pub entities: Vec<Entity>,
}

impl HistoryEntry {
    /// True when this agent originated the transition.
    pub fn is_local(&self) -> bool {
        self.origin.agent_id == self.proof.agent_id
    }
}

/// Append-only transition log.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Sequence numbers must be strictly increasing.
    pub fn push(&mut self, entry: HistoryEntry) {
        debug_assert!(self
            .entries
            .last()
            .map_or(true, |last| last.local_sequence < entry.local_sequence));
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The `count` most recent local-origin entries, oldest first.
    pub fn recent_local(&self, count: usize) -> Vec<&HistoryEntry> {
        let mut recent: Vec<&HistoryEntry> =
            self.entries.iter().rev().filter(|e| e.is_local()).take(count).collect();
        recent.reverse();
        recent
    }
}
