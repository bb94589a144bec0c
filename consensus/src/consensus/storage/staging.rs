use super::{DagState, GhostdagStoreReader, HeaderStoreReader, ReachabilityStore, ReachabilityStoreReader};
use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::block::Block;
use consensus_core::errors::{ReachabilityError, ReachabilityResult, RuleError};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::persistence::CommitBatch;
use consensus_core::reachability::ReachabilityData;
use consensus_core::tx::Transaction;
use consensus_core::utxo::{UtxoCollection, UtxoDiff};
use consensus_core::virtual_state::VirtualState;
use consensus_core::{BlockHashMap, Hash};
use jio_multiset::SerializedMultiset;
use std::sync::Arc;

/// Copy-on-write overlay over a committed [`DagState`] snapshot.
///
/// Reads fall through to the snapshot for anything not staged. Nothing reaches
/// committed state until [`StagingArea::into_commit`] is handed to the storage;
/// dropping the area discards every staged change.
pub struct StagingArea<'a> {
    base: &'a DagState,
    blocks: Vec<Block>,
    headers: BlockHashMap<Arc<Header>>,
    bodies: BlockHashMap<Arc<Vec<Transaction>>>,
    ghostdag: BlockHashMap<Arc<GhostdagData>>,
    reachability: BlockHashMap<ReachabilityData>,
    children: BlockHashMap<Vec<Hash>>,
    utxo_diffs: BlockHashMap<Arc<UtxoDiff>>,
    multisets: BlockHashMap<SerializedMultiset>,
    acceptance: BlockHashMap<Arc<AcceptanceData>>,
    utxo_set_changes: Option<UtxoDiff>,
    utxo_set_override: Option<Arc<UtxoCollection>>,
    tips: Option<Vec<Hash>>,
    virtual_state: Option<Arc<VirtualState>>,
    finality_point: Option<Hash>,
    finality_conflicts: Option<Vec<Hash>>,
    invalid: Vec<(Hash, RuleError)>,
}

impl<'a> StagingArea<'a> {
    pub fn new(base: &'a DagState) -> Self {
        Self {
            base,
            blocks: Vec::new(),
            headers: BlockHashMap::new(),
            bodies: BlockHashMap::new(),
            ghostdag: BlockHashMap::new(),
            reachability: BlockHashMap::new(),
            children: BlockHashMap::new(),
            utxo_diffs: BlockHashMap::new(),
            multisets: BlockHashMap::new(),
            acceptance: BlockHashMap::new(),
            utxo_set_changes: None,
            utxo_set_override: None,
            tips: None,
            virtual_state: None,
            finality_point: None,
            finality_conflicts: None,
            invalid: Vec::new(),
        }
    }

    pub fn base(&self) -> &'a DagState {
        self.base
    }

    pub fn genesis(&self) -> Hash {
        self.base.genesis()
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.headers.contains_key(hash) || self.base.contains_block(hash)
    }

    pub fn invalid_block_error(&self, hash: &Hash) -> Option<&RuleError> {
        self.invalid.iter().find(|(invalid, _)| invalid == hash).map(|(_, err)| err).or_else(|| self.base.invalid_block_error(hash))
    }

    pub fn get_block_transactions(&self, hash: &Hash) -> Option<Arc<Vec<Transaction>>> {
        self.bodies.get(hash).cloned().or_else(|| self.base.get_block_transactions(hash))
    }

    pub fn get_utxo_diff(&self, hash: &Hash) -> Option<Arc<UtxoDiff>> {
        self.utxo_diffs.get(hash).cloned().or_else(|| self.base.get_utxo_diff(hash))
    }

    pub fn get_multiset(&self, hash: &Hash) -> Option<SerializedMultiset> {
        self.multisets.get(hash).copied().or_else(|| self.base.get_multiset(hash))
    }

    pub fn get_acceptance_data(&self, hash: &Hash) -> Option<Arc<AcceptanceData>> {
        self.acceptance.get(hash).cloned().or_else(|| self.base.get_acceptance_data(hash))
    }

    pub fn tips(&self) -> &[Hash] {
        self.tips.as_deref().unwrap_or_else(|| self.base.tips())
    }

    pub fn virtual_state(&self) -> Option<Arc<VirtualState>> {
        self.virtual_state.clone().or_else(|| self.base.virtual_state().cloned())
    }

    pub fn finality_point(&self) -> Hash {
        self.finality_point.unwrap_or_else(|| self.base.finality_point())
    }

    pub fn finality_conflicts(&self) -> &[Hash] {
        self.finality_conflicts.as_deref().unwrap_or_else(|| self.base.finality_conflicts())
    }

    pub fn stage_block(&mut self, block: &Block) {
        let hash = block.hash();
        self.headers.insert(hash, block.header.clone());
        self.bodies.insert(hash, block.transactions.clone());
        self.blocks.push(block.clone());
    }

    pub fn stage_ghostdag_data(&mut self, hash: Hash, data: Arc<GhostdagData>) {
        self.ghostdag.insert(hash, data);
    }

    /// Appends `child` to the DAG children list of `parent`
    pub fn add_child(&mut self, parent: Hash, child: Hash) {
        let base = self.base;
        self.children.entry(parent).or_insert_with(|| base.get_children(&parent).map(<[Hash]>::to_vec).unwrap_or_default()).push(child);
    }

    pub fn get_children(&self, hash: &Hash) -> Option<&[Hash]> {
        self.children.get(hash).map(Vec::as_slice).or_else(|| self.base.get_children(hash))
    }

    pub fn stage_utxo_diff(&mut self, hash: Hash, diff: Arc<UtxoDiff>) {
        self.utxo_diffs.insert(hash, diff);
    }

    pub fn stage_multiset(&mut self, hash: Hash, multiset: SerializedMultiset) {
        self.multisets.insert(hash, multiset);
    }

    pub fn stage_acceptance_data(&mut self, hash: Hash, data: Arc<AcceptanceData>) {
        self.acceptance.insert(hash, data);
    }

    /// Changes from the committed virtual selected parent's UTXO set to the new one
    pub fn stage_utxo_set_changes(&mut self, changes: UtxoDiff) {
        self.utxo_set_changes = Some(changes);
    }

    pub fn stage_utxo_set_override(&mut self, set: Arc<UtxoCollection>) {
        self.utxo_set_override = Some(set);
    }

    pub fn stage_tips(&mut self, tips: Vec<Hash>) {
        self.tips = Some(tips);
    }

    pub fn stage_virtual_state(&mut self, state: Arc<VirtualState>) {
        self.virtual_state = Some(state);
    }

    pub fn stage_finality_point(&mut self, finality_point: Hash) {
        self.finality_point = Some(finality_point);
    }

    pub fn stage_finality_conflicts(&mut self, conflicts: Vec<Hash>) {
        self.finality_conflicts = Some(conflicts);
    }

    pub fn stage_invalid_block(&mut self, hash: Hash, err: RuleError) {
        self.invalid.push((hash, err));
    }

    /// The version of the snapshot this area was staged against, and everything it changes
    pub fn into_commit(self) -> (u64, CommitBatch) {
        let batch = CommitBatch {
            blocks: self.blocks,
            ghostdag: self.ghostdag.into_iter().collect(),
            reachability: self.reachability.into_iter().collect(),
            children: self.children.into_iter().collect(),
            utxo_diffs: self.utxo_diffs.into_iter().collect(),
            multisets: self.multisets.into_iter().collect(),
            acceptance_data: self.acceptance.into_iter().collect(),
            utxo_set_changes: self.utxo_set_changes,
            utxo_set_override: self.utxo_set_override,
            tips: self.tips,
            virtual_state: self.virtual_state,
            finality_point: self.finality_point,
            finality_conflicts: self.finality_conflicts,
            invalid_blocks: self.invalid,
        };
        (self.base.version(), batch)
    }
}

impl HeaderStoreReader for StagingArea<'_> {
    fn get_header(&self, hash: &Hash) -> Option<Arc<Header>> {
        self.headers.get(hash).cloned().or_else(|| self.base.get_header(hash))
    }
}

impl GhostdagStoreReader for StagingArea<'_> {
    fn get_ghostdag_data(&self, hash: &Hash) -> Option<Arc<GhostdagData>> {
        self.ghostdag.get(hash).cloned().or_else(|| self.base.get_ghostdag_data(hash))
    }
}

impl ReachabilityStoreReader for StagingArea<'_> {
    fn get_reachability(&self, hash: &Hash) -> Option<&ReachabilityData> {
        self.reachability.get(hash).or_else(|| self.base.get_reachability(hash))
    }
}

impl ReachabilityStore for StagingArea<'_> {
    fn insert_reachability(&mut self, hash: Hash, data: ReachabilityData) -> ReachabilityResult<()> {
        if self.get_reachability(&hash).is_some() {
            return Err(ReachabilityError::BlockExists(hash));
        }
        self.reachability.insert(hash, data);
        Ok(())
    }

    fn get_reachability_mut(&mut self, hash: &Hash) -> Option<&mut ReachabilityData> {
        if !self.reachability.contains_key(hash) {
            let data = self.base.get_reachability(hash)?.clone();
            self.reachability.insert(*hash, data);
        }
        self.reachability.get_mut(hash)
    }
}
