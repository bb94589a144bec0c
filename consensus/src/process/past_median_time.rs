//! Past median time
//!
//! The median timestamp of the last `window` blocks of a selected chain. A new
//! block's timestamp must be strictly greater than the past median time of its
//! selected parent, and timestamp lock times are measured against it.

use crate::consensus::storage::DagStoreReader;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::{Hash, ZERO_HASH};

/// Past median time calculator
#[derive(Debug, Clone, Copy)]
pub struct PastMedianTimeManager {
    window: usize,
}

impl PastMedianTimeManager {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1) }
    }

    /// Median of the timestamps of `selected_parent` and its chain ancestors, at most `window` of them
    pub fn calc_past_median_time<S: DagStoreReader + ?Sized>(&self, store: &S, selected_parent: Hash) -> ConsensusResult<u64> {
        let mut timestamps = Vec::with_capacity(self.window);
        let mut current = selected_parent;
        while current != ZERO_HASH && timestamps.len() < self.window {
            let header = store.get_header(&current).ok_or(ConsensusError::UnknownBlock(current))?;
            timestamps.push(header.timestamp);
            current = store.get_ghostdag_data(&current).ok_or(ConsensusError::UnknownBlock(current))?.selected_parent;
        }
        timestamps.sort_unstable();
        Ok(timestamps.get(timestamps.len() / 2).copied().unwrap_or_default())
    }
}
