//! Block templates
//!
//! Builds a block on given parents with every consensus commitment filled in:
//! GHOSTDAG score and work, accepted id merkle root, UTXO commitment and a
//! coinbase paying the subsidy plus the fees of the included transactions.
//! Proof of work is left to the caller.

use crate::consensus::ghostdag::GhostdagProtocol;
use crate::consensus::storage::{HeaderStoreReader, StagingArea};
use crate::consensus::utxo::UtxoManager;
use crate::pipeline::CancelToken;
use crate::process::past_median_time::PastMedianTimeManager;
use consensus_core::block::{calc_hash_merkle_root, Block};
use consensus_core::config::ConsensusConfig;
use consensus_core::constants::BLOCK_VERSION;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::header::Header;
use consensus_core::tx::{ScriptPublicKey, Transaction};
use consensus_core::Hash;
use std::sync::Arc;

/// Miner-chosen parts of a template
#[derive(Debug, Clone, Default)]
pub struct TemplateRequest {
    pub miner_script_public_key: ScriptPublicKey,
    /// Appended to the coinbase payload after the blue score
    pub extra_data: Vec<u8>,
    /// Non-coinbase transactions, valid in the template's UTXO context
    pub transactions: Vec<Transaction>,
    /// Raised to one past the past median time when too old
    pub timestamp: u64,
}

pub struct BlockTemplateBuilder {
    ghostdag: GhostdagProtocol,
    past_median_time: PastMedianTimeManager,
    utxo_manager: Arc<UtxoManager>,
}

impl BlockTemplateBuilder {
    pub fn new(config: &ConsensusConfig, utxo_manager: Arc<UtxoManager>) -> Self {
        Self {
            ghostdag: GhostdagProtocol::new(config.ghostdag_k, config.mergeset_size_limit),
            past_median_time: PastMedianTimeManager::new(config.past_median_time_window),
            utxo_manager,
        }
    }

    pub fn build_block_with_parents(
        &self,
        staging: &StagingArea,
        parents: Vec<Hash>,
        request: TemplateRequest,
        cancel: &CancelToken,
    ) -> ConsensusResult<Block> {
        let ghostdag_data = self.ghostdag.ghostdag(staging, &parents)?;
        let ordered_mergeset = self.ghostdag.consensus_ordered_mergeset(staging, &ghostdag_data)?;
        let selected_parent = ghostdag_data.selected_parent;
        let past_median_time = self.past_median_time.calc_past_median_time(staging, selected_parent)?;

        let mut transactions = request.transactions;
        transactions.sort_by_key(|tx| tx.subnetwork_id);
        let state = self.utxo_manager.calc_block_utxo(staging, &transactions, &ghostdag_data, &ordered_mergeset, past_median_time, cancel)?;

        let coinbase = self.utxo_manager.coinbase_manager().build_coinbase(
            ghostdag_data.blue_score,
            state.fees,
            request.miner_script_public_key,
            &request.extra_data,
        );
        transactions.insert(0, coinbase);

        let bits = staging.get_header(&selected_parent).ok_or(ConsensusError::UnknownBlock(selected_parent))?.bits;
        let header = Header::new_finalized(
            BLOCK_VERSION,
            parents,
            calc_hash_merkle_root(transactions.iter()),
            state.accepted_id_merkle_root(),
            state.utxo_commitment(),
            request.timestamp.max(past_median_time + 1),
            bits,
            0,
            ghostdag_data.blue_score,
            ghostdag_data.blue_work,
        );
        Ok(Block::new(header, transactions))
    }
}
