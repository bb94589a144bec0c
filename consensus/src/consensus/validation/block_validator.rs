//! Block body validation
//!
//! Checks a block's transaction list without any UTXO context: coinbase
//! placement, per-transaction isolation rules, duplicates, merkle root, mass and
//! subnetwork ordering.

use super::transaction_validator::TransactionValidator;
use crate::process::coinbase::CoinbaseManager;
use consensus_core::block::{calc_hash_merkle_root, Block};
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{RuleError, RuleResult};
use consensus_core::tx::COINBASE_TRANSACTION_INDEX;
use std::collections::HashSet;
use std::sync::Arc;

/// Block validator for consensus rules
pub struct BlockValidator {
    transaction_validator: Arc<dyn TransactionValidator>,
    max_block_mass: u64,
}

impl BlockValidator {
    pub fn new(config: &ConsensusConfig, transaction_validator: Arc<dyn TransactionValidator>) -> Self {
        Self { transaction_validator, max_block_mass: config.max_block_mass }
    }

    pub fn validate_body_in_isolation(&self, block: &Block) -> RuleResult<()> {
        self.check_coinbase_placement(block)?;
        self.check_transactions_in_isolation(block)?;
        self.check_duplicate_transactions(block)?;
        self.check_merkle_root(block)?;
        self.check_block_mass(block)?;
        self.check_subnetwork_order(block)
    }

    fn check_coinbase_placement(&self, block: &Block) -> RuleResult<()> {
        let first = block.transactions.first().ok_or(RuleError::NoTransactions)?;
        if !first.is_coinbase() {
            return Err(RuleError::FirstTxNotCoinbase);
        }
        if let Some((index, _)) = block.transactions.iter().enumerate().skip(1).find(|(_, tx)| tx.is_coinbase()) {
            return Err(RuleError::MultipleCoinbases(index));
        }
        Ok(())
    }

    fn check_transactions_in_isolation(&self, block: &Block) -> RuleResult<()> {
        for tx in block.transactions.iter() {
            self.transaction_validator
                .validate_tx_in_isolation(tx)
                .map_err(|err| RuleError::TxInIsolationValidationFailed(tx.id(), err))?;
        }
        Ok(())
    }

    fn check_duplicate_transactions(&self, block: &Block) -> RuleResult<()> {
        let mut ids = HashSet::with_capacity(block.transactions.len());
        for tx in block.transactions.iter() {
            if !ids.insert(tx.id()) {
                return Err(RuleError::DuplicateTransactions(tx.id()));
            }
        }
        Ok(())
    }

    fn check_merkle_root(&self, block: &Block) -> RuleResult<()> {
        let computed = calc_hash_merkle_root(block.transactions.iter());
        if computed != block.header.hash_merkle_root {
            return Err(RuleError::BadMerkleRoot(block.header.hash_merkle_root, computed));
        }
        Ok(())
    }

    fn check_block_mass(&self, block: &Block) -> RuleResult<()> {
        let mut mass: u64 = 0;
        for tx in block.transactions.iter() {
            mass = mass.saturating_add(self.transaction_validator.calc_tx_mass(tx));
            if mass > self.max_block_mass {
                return Err(RuleError::ExceedsMassLimit(mass, self.max_block_mass));
            }
        }
        Ok(())
    }

    fn check_subnetwork_order(&self, block: &Block) -> RuleResult<()> {
        let rest = block.transactions.get(COINBASE_TRANSACTION_INDEX + 1..).unwrap_or(&[]);
        if rest.windows(2).any(|pair| pair[0].subnetwork_id > pair[1].subnetwork_id) {
            return Err(RuleError::UnorderedSubnetworks);
        }
        Ok(())
    }

    /// The coinbase payload must open with the blue score GHOSTDAG computed for the block
    pub fn validate_coinbase_blue_score(&self, block: &Block, blue_score: u64) -> RuleResult<()> {
        let coinbase = block.transactions.get(COINBASE_TRANSACTION_INDEX).ok_or(RuleError::NoTransactions)?;
        let declared = CoinbaseManager::deserialize_blue_score(&coinbase.payload).unwrap_or_default();
        if declared != blue_score {
            return Err(RuleError::BadCoinbasePayloadBlueScore(declared, blue_score));
        }
        Ok(())
    }
}
