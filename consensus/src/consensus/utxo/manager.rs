use super::chain_diff;
use crate::consensus::dag::reachability::is_dag_ancestor_of;
use crate::consensus::storage::{GhostdagStoreReader, StagingArea};
use crate::consensus::validation::TransactionValidator;
use crate::pipeline::CancelToken;
use crate::process::coinbase::CoinbaseManager;
use consensus_core::acceptance_data::{accepted_transaction_ids, AcceptanceData, MergesetBlockAcceptanceData, TxAcceptance, TxOutcome};
use consensus_core::block::{calc_accepted_id_merkle_root, Block};
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusError, ConsensusResult, RuleError, RuleResult, StoreError, TxResult, TxRuleError};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::multiset::UtxoMultiset;
use consensus_core::tx::{PopulatedTransaction, Transaction, TransactionId, TransactionOutpoint, UtxoEntry};
use consensus_core::utxo::{ComposedUtxoView, UtxoDiff, UtxoView};
use consensus_core::Hash;
use jio_multiset::EcMultiset;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// UTXO outcome of accepting a mergeset on top of the selected parent's set
#[derive(Debug, Clone)]
pub struct BlockUtxoState {
    /// From the selected parent's UTXO set to the merging block's
    pub diff: UtxoDiff,
    pub acceptance: AcceptanceData,
    pub multiset: EcMultiset,
    /// Fees of the merging block's own transactions, validated against its UTXO set
    pub fees: u64,
}

impl BlockUtxoState {
    pub fn accepted_tx_ids(&self) -> Vec<TransactionId> {
        accepted_transaction_ids(&self.acceptance)
    }

    pub fn accepted_id_merkle_root(&self) -> Hash {
        calc_accepted_id_merkle_root(self.accepted_tx_ids().into_iter())
    }

    pub fn utxo_commitment(&self) -> Hash {
        self.multiset.finalize()
    }
}

pub struct UtxoManager {
    transaction_validator: Arc<dyn TransactionValidator>,
    coinbase: CoinbaseManager,
}

impl UtxoManager {
    pub fn new(config: &ConsensusConfig, transaction_validator: Arc<dyn TransactionValidator>) -> Self {
        Self { transaction_validator, coinbase: CoinbaseManager::new(config.base_subsidy) }
    }

    /// The chain block whose full UTXO set is held in committed state
    pub fn virtual_base(staging: &StagingArea) -> Hash {
        staging.base().virtual_state().map(|state| state.selected_parent()).unwrap_or_else(|| staging.genesis())
    }

    /// Diff from the committed base set to the UTXO set of chain block `to`
    pub fn diff_from_virtual_base(&self, staging: &StagingArea, to: Hash) -> ConsensusResult<UtxoDiff> {
        Ok(chain_diff(staging, Self::virtual_base(staging), to)?.1)
    }

    pub fn load_multiset(staging: &StagingArea, hash: Hash) -> ConsensusResult<EcMultiset> {
        let bytes = staging.get_multiset(&hash).ok_or(ConsensusError::UnknownBlock(hash))?;
        EcMultiset::deserialize(bytes).map_err(|err| ConsensusError::Storage(StoreError::Serialization(err.to_string())))
    }

    /// Accepts `ordered_mergeset` on top of the selected parent of `ghostdag` and validates
    /// `transactions`, the merging block's own, against the result
    pub fn calc_block_utxo(
        &self,
        staging: &StagingArea,
        transactions: &[Transaction],
        ghostdag: &GhostdagData,
        ordered_mergeset: &[Hash],
        pov_past_median_time: u64,
        cancel: &CancelToken,
    ) -> ConsensusResult<BlockUtxoState> {
        let selected_parent = ghostdag.selected_parent;
        let base_diff = self.diff_from_virtual_base(staging, selected_parent)?;
        let selected_parent_view = ComposedUtxoView::new(staging.base().utxo_set(), &base_diff);

        let (diff, acceptance) = self.accept_mergeset(
            staging,
            selected_parent,
            &selected_parent_view,
            ordered_mergeset,
            ghostdag.blue_score,
            pov_past_median_time,
            cancel,
        )?;

        let block_view = ComposedUtxoView::new(&selected_parent_view, &diff);
        let fees = self.validate_block_transactions(&block_view, transactions, ghostdag.blue_score, pov_past_median_time)?;

        let mut multiset = Self::load_multiset(staging, selected_parent)?;
        multiset.add_diff(&diff);
        Ok(BlockUtxoState { diff, acceptance, multiset, fees })
    }

    /// Full UTXO validation of `block`. On success its diff, multiset and acceptance data are staged.
    pub fn process_block(
        &self,
        staging: &mut StagingArea,
        block: &Block,
        ghostdag: &GhostdagData,
        ordered_mergeset: &[Hash],
        pov_past_median_time: u64,
        cancel: &CancelToken,
    ) -> ConsensusResult<()> {
        let state = self.calc_block_utxo(staging, &block.transactions, ghostdag, ordered_mergeset, pov_past_median_time, cancel)?;

        if let Some(coinbase) = block.transactions.first() {
            self.check_coinbase_payout(coinbase, state.fees)?;
        }
        let accepted_id_merkle_root = state.accepted_id_merkle_root();
        if accepted_id_merkle_root != block.header.accepted_id_merkle_root {
            return Err(RuleError::BadAcceptedIDMerkleRoot(block.header.accepted_id_merkle_root, accepted_id_merkle_root).into());
        }
        let utxo_commitment = state.utxo_commitment();
        if utxo_commitment != block.header.utxo_commitment {
            return Err(RuleError::BadUTXOCommitment(block.header.utxo_commitment, utxo_commitment).into());
        }

        let hash = block.hash();
        debug!(
            "block {} accepted {} transactions, utxo diff +{}/-{}",
            hash,
            state.accepted_tx_ids().len(),
            state.diff.add.len(),
            state.diff.remove.len()
        );
        staging.stage_utxo_diff(hash, Arc::new(state.diff));
        staging.stage_multiset(hash, state.multiset.serialize());
        staging.stage_acceptance_data(hash, Arc::new(state.acceptance));
        Ok(())
    }

    /// Walks the mergeset in consensus order and accepts every transaction that is still
    /// valid. Conflicts are recorded per transaction and never fail the merging block.
    pub fn accept_mergeset<V: UtxoView>(
        &self,
        staging: &StagingArea,
        selected_parent: Hash,
        selected_parent_view: &V,
        ordered_mergeset: &[Hash],
        pov_blue_score: u64,
        pov_past_median_time: u64,
        cancel: &CancelToken,
    ) -> ConsensusResult<(UtxoDiff, AcceptanceData)> {
        let mut diff = UtxoDiff::default();
        let mut spent = HashSet::new();
        let mut acceptance = Vec::with_capacity(ordered_mergeset.len());

        for merged in ordered_mergeset {
            cancel.check()?;
            let transactions = staging.get_block_transactions(merged).ok_or(ConsensusError::UnknownBlock(*merged))?;
            let mut outcomes = Vec::with_capacity(transactions.len());
            for (index, tx) in transactions.iter().enumerate() {
                let result = match self.try_accept(&ComposedUtxoView::new(selected_parent_view, &diff), tx, &spent, pov_blue_score, pov_past_median_time) {
                    Err(TxRuleError::MissingOutpoint(outpoint)) if Self::spent_on_chain(staging, selected_parent, *merged, &outpoint)? => {
                        Err(TxRuleError::DoubleSpend(outpoint))
                    }
                    result => result,
                };
                let outcome = match result {
                    Ok(populated) => {
                        diff.add_transaction(&populated, pov_blue_score)?;
                        spent.extend(tx.inputs.iter().map(|input| input.previous_outpoint));
                        TxOutcome::Accepted
                    }
                    Err(err) => {
                        trace!("transaction {} of merged block {} rejected: {}", tx.id(), merged, err);
                        TxOutcome::Rejected(err)
                    }
                };
                outcomes.push(TxAcceptance { transaction_id: tx.id(), index_within_block: index as u32, outcome });
            }
            acceptance.push(MergesetBlockAcceptanceData { block_hash: *merged, transactions: outcomes });
        }
        Ok((diff, acceptance))
    }

    /// Whether a chain block of `selected_parent` outside the past of `merged` spent `outpoint`.
    /// Chain blocks in the past of `merged` already shaped its view, so the walk stops at the first one.
    fn spent_on_chain(staging: &StagingArea, selected_parent: Hash, merged: Hash, outpoint: &TransactionOutpoint) -> ConsensusResult<bool> {
        let genesis = staging.genesis();
        let mut current = selected_parent;
        loop {
            let diff = staging.get_utxo_diff(&current).ok_or(ConsensusError::UnknownBlock(current))?;
            if diff.remove.contains_key(outpoint) {
                return Ok(true);
            }
            if current == genesis || is_dag_ancestor_of(staging, current, merged)? {
                return Ok(false);
            }
            current = staging.get_ghostdag_data(&current).ok_or(ConsensusError::UnknownBlock(current))?.selected_parent;
        }
    }

    fn try_accept<'a, V: UtxoView>(
        &self,
        view: &V,
        tx: &'a Transaction,
        spent: &HashSet<TransactionOutpoint>,
        pov_blue_score: u64,
        pov_past_median_time: u64,
    ) -> TxResult<PopulatedTransaction<'a>> {
        let populated = PopulatedTransaction::new(tx, populate_inputs(view, tx, spent)?);
        let tx_id = tx.id();
        for index in 0..tx.outputs.len() {
            let outpoint = TransactionOutpoint::new(tx_id, index as u32);
            if view.get(&outpoint).is_some() {
                return Err(TxRuleError::OutpointAlreadyExists(outpoint));
            }
        }
        if !tx.is_coinbase() {
            self.transaction_validator.validate_populated_transaction_and_get_fee(&populated, pov_blue_score, pov_past_median_time)?;
        }
        Ok(populated)
    }

    /// Validates a block's own non-coinbase transactions against its UTXO view and sums their fees.
    /// Any failure rejects the block.
    pub fn validate_block_transactions<V: UtxoView>(
        &self,
        view: &V,
        transactions: &[Transaction],
        pov_blue_score: u64,
        pov_past_median_time: u64,
    ) -> RuleResult<u64> {
        let mut spent = HashSet::new();
        let mut fees: u64 = 0;
        for tx in transactions.iter().filter(|tx| !tx.is_coinbase()) {
            let fee = populate_inputs(view, tx, &spent)
                .and_then(|entries| {
                    self.transaction_validator.validate_populated_transaction_and_get_fee(
                        &PopulatedTransaction::new(tx, entries),
                        pov_blue_score,
                        pov_past_median_time,
                    )
                })
                .map_err(|err| RuleError::TxInContextFailed(tx.id(), err))?;
            spent.extend(tx.inputs.iter().map(|input| input.previous_outpoint));
            fees = fees.saturating_add(fee);
        }
        Ok(fees)
    }

    pub fn check_coinbase_payout(&self, coinbase: &Transaction, fees: u64) -> RuleResult<()> {
        let payout = CoinbaseManager::coinbase_payout(coinbase);
        let max_payout = self.coinbase.calc_max_coinbase_payout(fees);
        if payout > max_payout {
            return Err(RuleError::BadCoinbasePayoutAmount(payout, max_payout));
        }
        Ok(())
    }

    pub fn coinbase_manager(&self) -> &CoinbaseManager {
        &self.coinbase
    }
}

/// UTXO entries of every input of `tx`, in input order
fn populate_inputs<V: UtxoView>(view: &V, tx: &Transaction, spent: &HashSet<TransactionOutpoint>) -> TxResult<Vec<UtxoEntry>> {
    tx.inputs
        .iter()
        .map(|input| {
            let outpoint = input.previous_outpoint;
            if spent.contains(&outpoint) {
                return Err(TxRuleError::DoubleSpend(outpoint));
            }
            view.get(&outpoint).ok_or(TxRuleError::MissingOutpoint(outpoint))
        })
        .collect()
}
