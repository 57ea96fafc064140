//! # Batch Reassembly
//!
//! Collects the fragments of a batch until all `count` of them arrived.
//! Batches are keyed by sender and batch id. Incomplete batches older than
//! the reassembly timeout are dropped; nothing is ever acknowledged or
//! re-requested.

use super::message::Header;
use shared_types::{Entity, Proof};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on concurrently pending batches.
pub const MAX_PENDING_BATCHES: usize = 1024;

struct PendingBatch {
    proof: Proof,
    fragments: Vec<Option<Vec<Entity>>>,
    received: usize,
    first_seen: Instant,
}

/// Fragment collector.
pub struct Reassembler {
    pending: HashMap<(SocketAddr, u64), PendingBatch>,
    timeout: Duration,
}

impl Reassembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            timeout,
        }
    }

    /// Number of incomplete batches held.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Accept one fragment. Returns the full batch once the last fragment
    /// arrives.
    pub fn accept(
        &mut self,
        from: SocketAddr,
        header: &Header,
        proof: Proof,
        entities: Vec<Entity>,
        now: Instant,
    ) -> Option<(Proof, Vec<Entity>)> {
        let (batch_id, index, count) = (header.batch_id, header.index, header.count);
        if count == 1 {
            return Some((proof, entities));
        }

        let key = (from, batch_id);
        if !self.pending.contains_key(&key) && self.pending.len() >= MAX_PENDING_BATCHES {
            self.purge_expired(now);
            if self.pending.len() >= MAX_PENDING_BATCHES {
                debug!(%from, batch_id, "Reassembly buffer full, fragment dropped");
                return None;
            }
        }

        let batch = self.pending.entry(key).or_insert_with(|| PendingBatch {
            proof,
            fragments: vec![None; count as usize],
            received: 0,
            first_seen: now,
        });

        if batch.fragments.len() != count as usize || batch.proof != proof {
            debug!(%from, batch_id, "Fragment disagrees with its batch, batch dropped");
            self.pending.remove(&key);
            return None;
        }

        let slot = &mut batch.fragments[index as usize];
        if slot.is_none() {
            *slot = Some(entities);
            batch.received += 1;
        }

        if batch.received < batch.fragments.len() {
            return None;
        }

        let batch = self.pending.remove(&key)?;
        let entities = batch.fragments.into_iter().flatten().flatten().collect();
        Some((batch.proof, entities))
    }

    /// Drop incomplete batches older than the timeout. Returns how many.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let timeout = self.timeout;
        let before = self.pending.len();
        self.pending
            .retain(|_, batch| now.saturating_duration_since(batch.first_seen) < timeout);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            debug!(dropped, "Incomplete batches expired");
        }
        dropped
    }
}
