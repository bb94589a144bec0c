//! Committed consensus state, the staging overlay validations write into, and
//! the read interfaces the DAG algorithms are generic over.

pub mod dag_state;
pub mod staging;

pub use dag_state::DagState;
pub use staging::StagingArea;

use consensus_core::errors::{ConsensusError, ConsensusResult, ReachabilityResult};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::persistence::{CommitBatch, ConsensusPersistence};
use consensus_core::reachability::ReachabilityData;
use consensus_core::{BlockHashMap, Hash};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};
use std::sync::Arc;
use tracing::trace;

pub trait HeaderStoreReader {
    fn get_header(&self, hash: &Hash) -> Option<Arc<Header>>;

    fn has_header(&self, hash: &Hash) -> bool {
        self.get_header(hash).is_some()
    }
}

pub trait GhostdagStoreReader {
    fn get_ghostdag_data(&self, hash: &Hash) -> Option<Arc<GhostdagData>>;
}

pub trait ReachabilityStoreReader {
    fn get_reachability(&self, hash: &Hash) -> Option<&ReachabilityData>;
}

pub trait ReachabilityStore: ReachabilityStoreReader {
    /// Fails with `BlockExists` if `hash` already has a record
    fn insert_reachability(&mut self, hash: Hash, data: ReachabilityData) -> ReachabilityResult<()>;

    fn get_reachability_mut(&mut self, hash: &Hash) -> Option<&mut ReachabilityData>;
}

impl ReachabilityStoreReader for BlockHashMap<ReachabilityData> {
    fn get_reachability(&self, hash: &Hash) -> Option<&ReachabilityData> {
        self.get(hash)
    }
}

impl ReachabilityStore for BlockHashMap<ReachabilityData> {
    fn insert_reachability(&mut self, hash: Hash, data: ReachabilityData) -> ReachabilityResult<()> {
        if self.contains_key(&hash) {
            return Err(consensus_core::errors::ReachabilityError::BlockExists(hash));
        }
        self.insert(hash, data);
        Ok(())
    }

    fn get_reachability_mut(&mut self, hash: &Hash) -> Option<&mut ReachabilityData> {
        self.get_mut(hash)
    }
}

/// Everything the DAG algorithms read
pub trait DagStoreReader: HeaderStoreReader + GhostdagStoreReader + ReachabilityStoreReader {}

impl<T: HeaderStoreReader + GhostdagStoreReader + ReachabilityStoreReader + ?Sized> DagStoreReader for T {}

/// Result of trying to commit a staging area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Another commit landed after the staging area took its snapshot
    Conflict,
}

/// Owner of the committed [`DagState`].
///
/// Validations read a snapshot through [`ConsensusStorage::read`], stage their
/// changes, drop the snapshot and then [`ConsensusStorage::commit`]. Commits are
/// serialized; one staged against an outdated version is refused.
pub struct ConsensusStorage {
    state: RwLock<DagState>,
    persistence: Arc<dyn ConsensusPersistence>,
}

impl ConsensusStorage {
    pub fn new(state: DagState, persistence: Arc<dyn ConsensusPersistence>) -> Self {
        Self { state: RwLock::new(state), persistence }
    }

    /// Shared view of the committed state. Never waits for in-flight validations.
    pub fn read(&self) -> RwLockReadGuard<'_, DagState> {
        self.state.read_recursive()
    }

    pub fn version(&self) -> u64 {
        self.read().version()
    }

    /// Persists `batch` and then applies it to memory, unless the state moved past
    /// `base_version` in the meantime. A persistence failure leaves memory untouched.
    pub fn commit(&self, base_version: u64, batch: CommitBatch) -> ConsensusResult<CommitOutcome> {
        let state = self.state.upgradable_read();
        if state.version() != base_version {
            trace!("commit staged at version {} refused, state is at {}", base_version, state.version());
            return Ok(CommitOutcome::Conflict);
        }
        self.persistence.write_commit(&batch)?;
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.apply(batch);
        Ok(CommitOutcome::Committed)
    }

    /// Runs `stage` against the current state and commits the result, staging again after
    /// each conflict. Gives up with `CommitConflict` after `max_retries` retries.
    pub fn stage_and_commit<T>(
        &self,
        max_retries: usize,
        mut stage: impl FnMut(&mut StagingArea<'_>) -> ConsensusResult<T>,
    ) -> ConsensusResult<T> {
        for attempt in 0..=max_retries {
            let state = self.read();
            let mut staging = StagingArea::new(&state);
            let value = stage(&mut staging)?;
            let (version, batch) = staging.into_commit();
            drop(state);
            if self.commit(version, batch)? == CommitOutcome::Committed {
                return Ok(value);
            }
            trace!("staged commit conflicted, attempt {}", attempt + 1);
        }
        Err(ConsensusError::CommitConflict(max_retries + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::errors::{ConsensusError, StoreError, StoreResult};
    use consensus_core::persistence::{NoopPersistence, PersistedState};
    use consensus_core::reachability::Interval;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlakyPersistence(AtomicBool);

    impl ConsensusPersistence for FlakyPersistence {
        fn write_commit(&self, _batch: &CommitBatch) -> StoreResult<()> {
            if self.0.load(Ordering::SeqCst) {
                return Err(StoreError::DbError("disk full".into()));
            }
            Ok(())
        }

        fn load(&self) -> StoreResult<Option<PersistedState>> {
            Ok(None)
        }
    }

    fn tips_batch(tip: u64) -> CommitBatch {
        CommitBatch { tips: Some(vec![Hash::from_u64_word(tip)]), ..Default::default() }
    }

    #[test]
    fn stale_commits_are_refused() {
        let storage = ConsensusStorage::new(DagState::default(), Arc::new(NoopPersistence));
        let version = storage.version();
        assert_eq!(storage.commit(version, tips_batch(1)).unwrap(), CommitOutcome::Committed);
        assert_eq!(storage.commit(version, tips_batch(2)).unwrap(), CommitOutcome::Conflict);
        assert_eq!(storage.read().tips(), &[Hash::from_u64_word(1)]);
        assert_eq!(storage.version(), version + 1);
    }

    #[test]
    fn failed_persistence_leaves_memory_untouched() {
        let persistence = Arc::new(FlakyPersistence(AtomicBool::new(true)));
        let storage = ConsensusStorage::new(DagState::default(), persistence.clone());
        let err = storage.commit(0, tips_batch(1)).unwrap_err();
        assert!(matches!(err, ConsensusError::Storage(_)));
        assert!(err.is_transient());
        assert!(storage.read().tips().is_empty());
        assert_eq!(storage.version(), 0);

        persistence.0.store(false, Ordering::SeqCst);
        assert_eq!(storage.commit(0, tips_batch(1)).unwrap(), CommitOutcome::Committed);
    }

    #[test]
    fn map_store_rejects_reinsertion() {
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        let hash = Hash::from_u64_word(1);
        store.insert_reachability(hash, ReachabilityData::new(Hash::default(), Interval::maximal(), 0)).unwrap();
        assert!(store.insert_reachability(hash, ReachabilityData::new(Hash::default(), Interval::maximal(), 0)).is_err());
        store.get_reachability_mut(&hash).unwrap().height = 5;
        assert_eq!(store.get_reachability(&hash).unwrap().height, 5);
    }
}
