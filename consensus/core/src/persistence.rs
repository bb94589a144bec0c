//! Seam between the in-memory consensus state and durable storage.

use crate::acceptance_data::AcceptanceData;
use crate::block::Block;
use crate::errors::{RuleError, StoreResult};
use crate::ghostdag::GhostdagData;
use crate::reachability::ReachabilityData;
use crate::utxo::{UtxoCollection, UtxoDiff};
use crate::virtual_state::VirtualState;
use crate::Hash;
use jio_multiset::SerializedMultiset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything a single staging-area commit changes. Written atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitBatch {
    pub blocks: Vec<Block>,
    pub ghostdag: Vec<(Hash, Arc<GhostdagData>)>,
    /// Full records of every reachability entry the commit created or touched
    pub reachability: Vec<(Hash, ReachabilityData)>,
    /// Full DAG children lists of every block that gained a child
    pub children: Vec<(Hash, Vec<Hash>)>,
    pub utxo_diffs: Vec<(Hash, Arc<UtxoDiff>)>,
    pub multisets: Vec<(Hash, SerializedMultiset)>,
    pub acceptance_data: Vec<(Hash, Arc<AcceptanceData>)>,
    /// Changes to the UTXO set of the virtual selected parent
    pub utxo_set_changes: Option<UtxoDiff>,
    /// Replaces the UTXO set of the virtual selected parent entirely
    pub utxo_set_override: Option<Arc<UtxoCollection>>,
    pub tips: Option<Vec<Hash>>,
    pub virtual_state: Option<Arc<VirtualState>>,
    pub finality_point: Option<Hash>,
    pub finality_conflicts: Option<Vec<Hash>>,
    pub invalid_blocks: Vec<(Hash, RuleError)>,
}

impl CommitBatch {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.reachability.is_empty()
            && self.utxo_set_changes.is_none()
            && self.utxo_set_override.is_none()
            && self.tips.is_none()
            && self.virtual_state.is_none()
            && self.finality_point.is_none()
            && self.finality_conflicts.is_none()
            && self.invalid_blocks.is_empty()
    }
}

/// Consensus state as found on disk
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    pub blocks: Vec<Block>,
    pub ghostdag: Vec<(Hash, GhostdagData)>,
    pub reachability: Vec<(Hash, ReachabilityData)>,
    pub children: Vec<(Hash, Vec<Hash>)>,
    pub utxo_diffs: Vec<(Hash, UtxoDiff)>,
    pub multisets: Vec<(Hash, SerializedMultiset)>,
    pub acceptance_data: Vec<(Hash, AcceptanceData)>,
    pub utxo_set: UtxoCollection,
    pub tips: Vec<Hash>,
    pub virtual_state: Option<VirtualState>,
    pub finality_point: Option<Hash>,
    pub finality_conflicts: Vec<Hash>,
    pub invalid_blocks: Vec<(Hash, RuleError)>,
}

pub trait ConsensusPersistence: Send + Sync {
    /// Persists one commit. Either all of it lands or none of it does.
    fn write_commit(&self, batch: &CommitBatch) -> StoreResult<()>;

    /// Returns `None` when nothing was ever committed
    fn load(&self) -> StoreResult<Option<PersistedState>>;
}

/// Keeps nothing; consensus state lives only in memory
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

impl ConsensusPersistence for NoopPersistence {
    fn write_commit(&self, _batch: &CommitBatch) -> StoreResult<()> {
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<PersistedState>> {
        Ok(None)
    }
}
