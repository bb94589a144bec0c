//! Virtual UTXO state.
//!
//! Every block stores the diff from its selected parent's UTXO set to its own,
//! where a block's set is the selected parent's set with the block's mergeset
//! accepted on top. Committed state keeps one full set, the one of the virtual
//! selected parent; any other chain block's set is reached by walking diffs.

pub mod manager;

pub use manager::{BlockUtxoState, UtxoManager};

use crate::consensus::dag::reachability::is_chain_ancestor_of;
use crate::consensus::storage::{GhostdagStoreReader, ReachabilityStoreReader, StagingArea};
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::utxo::UtxoDiff;
use consensus_core::Hash;

/// Route between two chain blocks through their highest common chain ancestor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPath {
    /// Chain blocks of `from` above the common ancestor, highest first
    pub removed: Vec<Hash>,
    /// Chain blocks of `to` above the common ancestor, lowest first
    pub added: Vec<Hash>,
    pub common_ancestor: Hash,
}

pub fn chain_path<S: GhostdagStoreReader + ReachabilityStoreReader + ?Sized>(store: &S, from: Hash, to: Hash) -> ConsensusResult<ChainPath> {
    let selected_parent = |hash: Hash| -> ConsensusResult<Hash> {
        Ok(store.get_ghostdag_data(&hash).ok_or(ConsensusError::UnknownBlock(hash))?.selected_parent)
    };

    let mut added = Vec::new();
    let mut current = to;
    while !is_chain_ancestor_of(store, current, from)? {
        added.push(current);
        current = selected_parent(current)?;
    }
    let common_ancestor = current;

    let mut removed = Vec::new();
    current = from;
    while current != common_ancestor {
        removed.push(current);
        current = selected_parent(current)?;
    }
    added.reverse();
    Ok(ChainPath { removed, added, common_ancestor })
}

/// The diff taking the UTXO set of chain block `from` to the one of `to`
pub fn chain_diff(staging: &StagingArea, from: Hash, to: Hash) -> ConsensusResult<(ChainPath, UtxoDiff)> {
    let path = chain_path(staging, from, to)?;
    let mut diff = UtxoDiff::default();
    for hash in path.removed.iter() {
        let block_diff = staging.get_utxo_diff(hash).ok_or(ConsensusError::UnknownBlock(*hash))?;
        diff.with_diff_in_place(&block_diff.reversed())?;
    }
    for hash in path.added.iter() {
        let block_diff = staging.get_utxo_diff(hash).ok_or(ConsensusError::UnknownBlock(*hash))?;
        diff.with_diff_in_place(&block_diff)?;
    }
    Ok((path, diff))
}
