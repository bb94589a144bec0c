//! Body processor
//!
//! Transaction-level validation of a block: structure in isolation, the
//! coinbase blue score, and UTXO acceptance with its commitments.

use crate::consensus::storage::StagingArea;
use crate::consensus::utxo::UtxoManager;
use crate::consensus::validation::{BlockValidator, TransactionValidator};
use crate::pipeline::{CancelToken, HeaderContext};
use consensus_core::block::Block;
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusResult, RuleResult};
use std::sync::Arc;

pub struct BodyProcessor {
    block_validator: BlockValidator,
    utxo_manager: Arc<UtxoManager>,
}

impl BodyProcessor {
    pub fn new(config: &ConsensusConfig, transaction_validator: Arc<dyn TransactionValidator>, utxo_manager: Arc<UtxoManager>) -> Self {
        Self { block_validator: BlockValidator::new(config, transaction_validator), utxo_manager }
    }

    pub fn validate_body_in_isolation(&self, block: &Block) -> RuleResult<()> {
        self.block_validator.validate_body_in_isolation(block)
    }

    /// Stages the block body together with its UTXO diff, multiset and acceptance data
    pub fn process_body(&self, staging: &mut StagingArea, block: &Block, context: &HeaderContext, cancel: &CancelToken) -> ConsensusResult<()> {
        self.block_validator.validate_coinbase_blue_score(block, context.ghostdag_data.blue_score)?;
        self.utxo_manager.process_block(
            staging,
            block,
            &context.ghostdag_data,
            &context.ordered_mergeset,
            context.past_median_time,
            cancel,
        )?;
        staging.stage_block(block);
        Ok(())
    }
}
