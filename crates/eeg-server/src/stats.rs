//! Pipeline counters shared by the source, the block tasks and the HTTP surface

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated from every pipeline stage
#[derive(Debug, Default)]
pub struct PipelineStats {
    lines_accepted: AtomicU64,
    lines_rejected: AtomicU64,
    blocks_formed: AtomicU64,
    blocks_persisted: AtomicU64,
    blocks_failed: AtomicU64,
    events_published: AtomicU64,
    events_unannounced: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub lines_accepted: u64,
    pub lines_rejected: u64,
    pub blocks_formed: u64,
    pub blocks_persisted: u64,
    pub blocks_failed: u64,
    pub events_published: u64,
    pub events_unannounced: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line_accepted(&self) {
        self.lines_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_line_rejected(&self) {
        self.lines_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_formed(&self) {
        self.blocks_formed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_persisted(&self) {
        self.blocks_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_failed(&self) {
        self.blocks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_unannounced(&self) {
        self.events_unannounced.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_accepted: self.lines_accepted.load(Ordering::Relaxed),
            lines_rejected: self.lines_rejected.load(Ordering::Relaxed),
            blocks_formed: self.blocks_formed.load(Ordering::Relaxed),
            blocks_persisted: self.blocks_persisted.load(Ordering::Relaxed),
            blocks_failed: self.blocks_failed.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            events_unannounced: self.events_unannounced.load(Ordering::Relaxed),
        }
    }
}
