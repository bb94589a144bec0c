//! Virtual processor
//!
//! Recomputes the virtual block after the tip set changed: its parents,
//! GHOSTDAG data, UTXO state, the move of the committed UTXO base to the new
//! virtual selected parent, and the finality point.

use crate::consensus::dag::reachability::is_chain_ancestor_of;
use crate::consensus::finality::FinalityManager;
use crate::consensus::ghostdag::GhostdagProtocol;
use crate::consensus::storage::{DagStoreReader, StagingArea};
use crate::consensus::utxo::{chain_diff, UtxoManager};
use crate::pipeline::CancelToken;
use crate::process::past_median_time::PastMedianTimeManager;
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::notify::AcceptedTransactionIds;
use consensus_core::virtual_state::VirtualState;
use consensus_core::Hash;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::debug;

/// How the virtual selected chain moved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainChange {
    /// Highest first
    pub removed: Vec<Hash>,
    /// Lowest first
    pub added: Vec<Hash>,
    pub accepted_transaction_ids: Vec<AcceptedTransactionIds>,
}

impl ChainChange {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

pub struct VirtualProcessor {
    ghostdag: GhostdagProtocol,
    utxo_manager: Arc<UtxoManager>,
    finality: Arc<dyn FinalityManager>,
    past_median_time: PastMedianTimeManager,
    max_block_parents: usize,
}

impl VirtualProcessor {
    pub fn new(config: &ConsensusConfig, utxo_manager: Arc<UtxoManager>, finality: Arc<dyn FinalityManager>) -> Self {
        Self {
            ghostdag: GhostdagProtocol::new(config.ghostdag_k, config.mergeset_size_limit),
            utxo_manager,
            finality,
            past_median_time: PastMedianTimeManager::new(config.past_median_time_window),
            max_block_parents: config.max_block_parents,
        }
    }

    /// The tips with the highest blue work, at most `max_block_parents` of them
    pub fn virtual_parents<S: DagStoreReader + ?Sized>(&self, store: &S, tips: &[Hash]) -> ConsensusResult<Vec<Hash>> {
        let mut ranked = Vec::with_capacity(tips.len());
        for tip in tips {
            let data = store.get_ghostdag_data(tip).ok_or(ConsensusError::UnknownBlock(*tip))?;
            ranked.push((Reverse(data.blue_work), *tip));
        }
        ranked.sort_unstable();
        Ok(ranked.into_iter().take(self.max_block_parents).map(|(_, tip)| tip).collect())
    }

    /// Stages the new virtual state, the UTXO base move and the finality point
    pub fn update_virtual(&self, staging: &mut StagingArea, cancel: &CancelToken) -> ConsensusResult<ChainChange> {
        let tips = staging.tips().to_vec();
        let parents = self.virtual_parents(&*staging, &tips)?;
        let ghostdag_data = self.ghostdag.ghostdag_unbounded(&*staging, &parents)?;
        let ordered_mergeset = self.ghostdag.consensus_ordered_mergeset(&*staging, &ghostdag_data)?;
        let selected_parent = ghostdag_data.selected_parent;
        let past_median_time = self.past_median_time.calc_past_median_time(&*staging, selected_parent)?;
        cancel.check()?;

        let state = self.utxo_manager.calc_block_utxo(staging, &[], &ghostdag_data, &ordered_mergeset, past_median_time, cancel)?;
        let (path, base_changes) = chain_diff(staging, UtxoManager::virtual_base(staging), selected_parent)?;

        let mut accepted_transaction_ids = Vec::with_capacity(path.added.len());
        for hash in path.added.iter() {
            let acceptance = staging.get_acceptance_data(hash).ok_or(ConsensusError::UnknownBlock(*hash))?;
            accepted_transaction_ids.push(AcceptedTransactionIds {
                accepting_block_hash: *hash,
                accepted_transaction_ids: consensus_core::acceptance_data::accepted_transaction_ids(&acceptance),
            });
        }

        let accepted_tx_ids = state.accepted_tx_ids();
        let virtual_state = VirtualState::new(
            parents,
            ghostdag_data,
            state.diff,
            &state.multiset,
            accepted_tx_ids,
            state.acceptance,
            past_median_time,
        );
        debug!(
            "virtual moved to selected parent {} with blue score {}, {} chain blocks removed and {} added",
            selected_parent,
            virtual_state.ghostdag_data.blue_score,
            path.removed.len(),
            path.added.len()
        );
        if !base_changes.is_empty() {
            staging.stage_utxo_set_changes(base_changes);
        }
        staging.stage_virtual_state(Arc::new(virtual_state));
        self.advance_finality_point(staging, selected_parent)?;

        Ok(ChainChange { removed: path.removed, added: path.added, accepted_transaction_ids })
    }

    /// The finality point only moves forward along its own chain
    fn advance_finality_point(&self, staging: &mut StagingArea, selected_parent: Hash) -> ConsensusResult<()> {
        let candidate = self.finality.finality_point(&*staging, selected_parent)?;
        let current = staging.finality_point();
        if candidate != current && is_chain_ancestor_of(&*staging, current, candidate)? {
            debug!("finality point advanced from {} to {}", current, candidate);
            staging.stage_finality_point(candidate);
        }
        Ok(())
    }
}
