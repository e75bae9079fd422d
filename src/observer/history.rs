use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::protocol::VariableSnapshot;
use crate::transport::{PageId, TransportError};

pub const DEFAULT_CAPACITY: usize = 5;

/// One poll result: every variable of a page at `timestamp` (ms since the
/// observer started).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: u64,
    pub snapshot: Vec<VariableSnapshot>,
}

/// Rolling buffer of the most recent snapshots of one page. Once full, every
/// new entry evicts the oldest.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    page: PageId,
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
    stale: bool,
}

impl SampleHistory {
    pub fn new(page: PageId, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            page,
            capacity,
            entries: VecDeque::with_capacity(capacity),
            stale: false,
        }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.stale = false;
    }

    pub fn record(&mut self, timestamp: u64, snapshot: Vec<VariableSnapshot>) {
        self.push(HistoryEntry { timestamp, snapshot });
    }

    /// Decodes a `getVariables` reply and appends it.
    pub fn update(&mut self, timestamp: u64, reply: &str) -> Result<(), TransportError> {
        let snapshot: Vec<VariableSnapshot> = serde_json::from_str(reply)?;
        self.record(timestamp, snapshot);
        Ok(())
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Set when the last poll timed out or returned garbage; cleared by the
    /// next successful update.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }
}
