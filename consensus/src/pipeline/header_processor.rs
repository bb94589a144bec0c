//! Header processor
//!
//! Places a header in the DAG: parents, GHOSTDAG, timestamp, finality and the
//! reachability index. Everything is written into the caller's staging area.

use crate::consensus::dag::reachability;
use crate::consensus::finality::FinalityManager;
use crate::consensus::ghostdag::GhostdagProtocol;
use crate::consensus::storage::StagingArea;
use crate::consensus::validation::{ContextualValidator, HeaderValidator};
use crate::pipeline::CancelToken;
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusResult, RuleResult};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::Hash;
use std::sync::Arc;
use tracing::trace;

/// What header processing learned about a block, consumed by the later stages
#[derive(Debug, Clone)]
pub struct HeaderContext {
    pub ghostdag_data: Arc<GhostdagData>,
    /// Selected parent first, then the rest of the mergeset ascending by blue work and hash
    pub ordered_mergeset: Vec<Hash>,
    /// Past median time of the selected parent's chain
    pub past_median_time: u64,
}

pub struct HeaderProcessor {
    header_validator: HeaderValidator,
    contextual_validator: ContextualValidator,
    ghostdag: GhostdagProtocol,
    finality: Arc<dyn FinalityManager>,
}

impl HeaderProcessor {
    pub fn new(config: &ConsensusConfig, finality: Arc<dyn FinalityManager>) -> Self {
        Self {
            header_validator: HeaderValidator::new(config),
            contextual_validator: ContextualValidator::new(config),
            ghostdag: GhostdagProtocol::new(config.ghostdag_k, config.mergeset_size_limit),
            finality,
        }
    }

    pub fn ghostdag(&self) -> &GhostdagProtocol {
        &self.ghostdag
    }

    pub fn contextual_validator(&self) -> &ContextualValidator {
        &self.contextual_validator
    }

    pub fn validate_header_in_isolation(&self, header: &Header) -> RuleResult<()> {
        self.header_validator.validate_header_in_isolation(header)
    }

    pub fn process_header(&self, staging: &mut StagingArea, header: &Header, cancel: &CancelToken) -> ConsensusResult<HeaderContext> {
        self.contextual_validator.check_parents_known(staging, header)?;
        self.contextual_validator.check_parents_relations(&*staging, header)?;

        let ghostdag_data = self.ghostdag.ghostdag(&*staging, header.direct_parents())?;
        self.header_validator.validate_ghostdag_commitments(header, &ghostdag_data)?;
        let past_median_time = self.contextual_validator.check_timestamp(&*staging, header, ghostdag_data.selected_parent)?;
        self.finality.check_finality_violation(&*staging, staging.finality_point(), ghostdag_data.selected_parent)?;
        cancel.check()?;

        let mergeset: Vec<Hash> = ghostdag_data.unordered_mergeset_without_selected_parent().collect();
        reachability::add_block(staging, header.hash, ghostdag_data.selected_parent, &mergeset)?;
        let ordered_mergeset = self.ghostdag.consensus_ordered_mergeset(&*staging, &ghostdag_data)?;
        trace!(
            "header {} has blue score {} and selected parent {}, mergeset size {}",
            header.hash,
            ghostdag_data.blue_score,
            ghostdag_data.selected_parent,
            ordered_mergeset.len()
        );

        let ghostdag_data = Arc::new(ghostdag_data);
        staging.stage_ghostdag_data(header.hash, ghostdag_data.clone());
        Ok(HeaderContext { ghostdag_data, ordered_mergeset, past_median_time })
    }
}
