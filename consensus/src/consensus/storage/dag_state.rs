use super::{GhostdagStoreReader, HeaderStoreReader, ReachabilityStoreReader};
use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::errors::RuleError;
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::persistence::{CommitBatch, PersistedState};
use consensus_core::reachability::ReachabilityData;
use consensus_core::tx::Transaction;
use consensus_core::utxo::{UtxoCollection, UtxoDiff};
use consensus_core::virtual_state::VirtualState;
use consensus_core::{BlockHashMap, Hash};
use jio_multiset::SerializedMultiset;
use std::sync::Arc;

/// The committed, internally consistent consensus state. Blocks form an arena
/// keyed by hash; every relation between them is a hash lookup.
#[derive(Debug, Default)]
pub struct DagState {
    version: u64,
    genesis: Hash,
    pub(super) headers: BlockHashMap<Arc<Header>>,
    pub(super) bodies: BlockHashMap<Arc<Vec<Transaction>>>,
    pub(super) ghostdag: BlockHashMap<Arc<GhostdagData>>,
    pub(super) reachability: BlockHashMap<ReachabilityData>,
    pub(super) children: BlockHashMap<Vec<Hash>>,
    /// Per block: the UTXO changes from its selected parent's set to its own
    pub(super) utxo_diffs: BlockHashMap<Arc<UtxoDiff>>,
    pub(super) multisets: BlockHashMap<SerializedMultiset>,
    pub(super) acceptance: BlockHashMap<Arc<AcceptanceData>>,
    /// UTXO set of the virtual selected parent
    pub(super) utxo_set: UtxoCollection,
    tips: Vec<Hash>,
    virtual_state: Option<Arc<VirtualState>>,
    finality_point: Hash,
    finality_conflicts: Vec<Hash>,
    invalid: BlockHashMap<RuleError>,
}

impl DagState {
    pub fn new(genesis: Hash) -> Self {
        Self { genesis, finality_point: genesis, ..Default::default() }
    }

    pub fn from_persisted(genesis: Hash, persisted: PersistedState) -> Self {
        let mut state = Self::new(genesis);
        for block in persisted.blocks {
            let hash = block.hash();
            state.headers.insert(hash, block.header);
            state.bodies.insert(hash, block.transactions);
        }
        state.ghostdag = persisted.ghostdag.into_iter().map(|(hash, data)| (hash, Arc::new(data))).collect();
        state.reachability = persisted.reachability.into_iter().collect();
        state.children = persisted.children.into_iter().collect();
        state.utxo_diffs = persisted.utxo_diffs.into_iter().map(|(hash, diff)| (hash, Arc::new(diff))).collect();
        state.multisets = persisted.multisets.into_iter().collect();
        state.acceptance = persisted.acceptance_data.into_iter().map(|(hash, data)| (hash, Arc::new(data))).collect();
        state.utxo_set = persisted.utxo_set;
        state.tips = persisted.tips;
        state.virtual_state = persisted.virtual_state.map(Arc::new);
        state.finality_point = persisted.finality_point.unwrap_or(genesis);
        state.finality_conflicts = persisted.finality_conflicts;
        state.invalid = persisted.invalid_blocks.into_iter().collect();
        state
    }

    /// Incremented by every commit
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn genesis(&self) -> Hash {
        self.genesis
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.headers.contains_key(hash)
    }

    pub fn tips(&self) -> &[Hash] {
        &self.tips
    }

    pub fn virtual_state(&self) -> Option<&Arc<VirtualState>> {
        self.virtual_state.as_ref()
    }

    pub fn finality_point(&self) -> Hash {
        self.finality_point
    }

    pub fn finality_conflicts(&self) -> &[Hash] {
        &self.finality_conflicts
    }

    pub fn utxo_set(&self) -> &UtxoCollection {
        &self.utxo_set
    }

    pub fn invalid_block_error(&self, hash: &Hash) -> Option<&RuleError> {
        self.invalid.get(hash)
    }

    pub fn get_block_transactions(&self, hash: &Hash) -> Option<Arc<Vec<Transaction>>> {
        self.bodies.get(hash).cloned()
    }

    pub fn get_children(&self, hash: &Hash) -> Option<&[Hash]> {
        self.children.get(hash).map(Vec::as_slice)
    }

    pub fn get_utxo_diff(&self, hash: &Hash) -> Option<Arc<UtxoDiff>> {
        self.utxo_diffs.get(hash).cloned()
    }

    pub fn get_multiset(&self, hash: &Hash) -> Option<SerializedMultiset> {
        self.multisets.get(hash).copied()
    }

    pub fn get_acceptance_data(&self, hash: &Hash) -> Option<Arc<AcceptanceData>> {
        self.acceptance.get(hash).cloned()
    }

    pub fn block_count(&self) -> usize {
        self.headers.len()
    }

    /// Applies a commit that was staged against this exact version
    pub(super) fn apply(&mut self, batch: CommitBatch) {
        for block in batch.blocks {
            let hash = block.hash();
            self.headers.insert(hash, block.header);
            self.bodies.insert(hash, block.transactions);
        }
        self.ghostdag.extend(batch.ghostdag);
        self.reachability.extend(batch.reachability);
        self.children.extend(batch.children);
        self.utxo_diffs.extend(batch.utxo_diffs);
        self.multisets.extend(batch.multisets);
        self.acceptance.extend(batch.acceptance_data);
        if let Some(set) = batch.utxo_set_override {
            self.utxo_set = Arc::try_unwrap(set).unwrap_or_else(|shared| (*shared).clone());
        }
        if let Some(changes) = batch.utxo_set_changes {
            for outpoint in changes.remove.keys() {
                self.utxo_set.remove(outpoint);
            }
            self.utxo_set.extend(changes.add);
        }
        if let Some(tips) = batch.tips {
            self.tips = tips;
        }
        if let Some(virtual_state) = batch.virtual_state {
            self.virtual_state = Some(virtual_state);
        }
        if let Some(finality_point) = batch.finality_point {
            self.finality_point = finality_point;
        }
        if let Some(conflicts) = batch.finality_conflicts {
            self.finality_conflicts = conflicts;
        }
        self.invalid.extend(batch.invalid_blocks);
        self.version += 1;
    }
}

impl HeaderStoreReader for DagState {
    fn get_header(&self, hash: &Hash) -> Option<Arc<Header>> {
        self.headers.get(hash).cloned()
    }

    fn has_header(&self, hash: &Hash) -> bool {
        self.headers.contains_key(hash)
    }
}

impl GhostdagStoreReader for DagState {
    fn get_ghostdag_data(&self, hash: &Hash) -> Option<Arc<GhostdagData>> {
        self.ghostdag.get(hash).cloned()
    }
}

impl ReachabilityStoreReader for DagState {
    fn get_reachability(&self, hash: &Hash) -> Option<&ReachabilityData> {
        self.reachability.get(hash)
    }
}
