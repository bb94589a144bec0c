//! Finality
//!
//! The finality point is the chain block a fixed number of selected-parent
//! steps behind the virtual selected parent. A block whose selected chain does
//! not run through the current finality point is rejected outright.

use crate::consensus::dag::reachability::is_chain_ancestor_of;
use crate::consensus::storage::{GhostdagStoreReader, ReachabilityStoreReader};
use consensus_core::errors::{ConsensusError, ConsensusResult, RuleError};
use consensus_core::{BlockHashMap, Hash, ZERO_HASH};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Memoized finality points kept by [`DepthFinalityManager`]
pub const FINALITY_CACHE_SIZE: usize = 2048;

pub trait FinalityManager: Send + Sync {
    /// Depth in chain blocks
    fn finality_depth(&self) -> u64;

    /// The chain block `finality_depth` selected-parent steps behind `from`, or the
    /// root of the chain when it is shallower than that
    fn finality_point(&self, store: &dyn GhostdagStoreReader, from: Hash) -> ConsensusResult<Hash>;

    /// Fails with `ViolatingFinality` unless `finality_point` is on the selected chain of `selected_parent`
    fn check_finality_violation(&self, store: &dyn ReachabilityStoreReader, finality_point: Hash, selected_parent: Hash) -> ConsensusResult<()> {
        if is_chain_ancestor_of(store, finality_point, selected_parent)? {
            return Ok(());
        }
        Err(RuleError::ViolatingFinality(finality_point).into())
    }
}

/// Test capabilities on top of [`FinalityManager`]
pub trait TestFinalityManager: FinalityManager {
    /// Snapshot of the memoized `from -> finality point` pairs
    fn finality_point_cache(&self) -> BlockHashMap<Hash>;

    /// Changes the depth and drops every memoized finality point
    fn override_finality_depth(&self, depth: u64);
}

/// Finality points by block, evicting the oldest insertion once full
struct PointCache {
    capacity: usize,
    points: BlockHashMap<Hash>,
    order: VecDeque<Hash>,
}

impl PointCache {
    fn new(capacity: usize) -> Self {
        Self { capacity, points: BlockHashMap::new(), order: VecDeque::new() }
    }

    fn get(&self, from: &Hash) -> Option<Hash> {
        self.points.get(from).copied()
    }

    fn insert(&mut self, from: Hash, point: Hash) {
        if self.capacity == 0 || self.points.insert(from, point).is_some() {
            return;
        }
        self.order.push_back(from);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.points.remove(&oldest);
            }
        }
    }

    fn clear(&mut self) {
        self.points.clear();
        self.order.clear();
    }
}

pub struct DepthFinalityManager {
    depth: AtomicU64,
    cache: Mutex<PointCache>,
}

impl DepthFinalityManager {
    pub fn new(depth: u64) -> Self {
        Self::with_cache_size(depth, FINALITY_CACHE_SIZE)
    }

    pub fn with_cache_size(depth: u64, cache_size: usize) -> Self {
        Self { depth: AtomicU64::new(depth), cache: Mutex::new(PointCache::new(cache_size)) }
    }
}

impl FinalityManager for DepthFinalityManager {
    fn finality_depth(&self) -> u64 {
        self.depth.load(Ordering::Acquire)
    }

    fn finality_point(&self, store: &dyn GhostdagStoreReader, from: Hash) -> ConsensusResult<Hash> {
        if let Some(point) = self.cache.lock().get(&from) {
            return Ok(point);
        }
        let mut current = from;
        for _ in 0..self.finality_depth() {
            let data = store.get_ghostdag_data(&current).ok_or(ConsensusError::UnknownBlock(current))?;
            if data.selected_parent == ZERO_HASH {
                break;
            }
            current = data.selected_parent;
        }
        self.cache.lock().insert(from, current);
        Ok(current)
    }
}

impl TestFinalityManager for DepthFinalityManager {
    fn finality_point_cache(&self) -> BlockHashMap<Hash> {
        self.cache.lock().points.clone()
    }

    fn override_finality_depth(&self, depth: u64) {
        self.depth.store(depth, Ordering::Release);
        self.cache.lock().clear();
    }
}
