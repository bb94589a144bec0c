//! Contextual header validation
//!
//! Rules that depend on the DAG the header joins: known and valid parents,
//! mutually non-ancestral parents and the past median time.

use crate::consensus::dag::reachability::is_dag_ancestor_of;
use crate::consensus::storage::{DagStoreReader, StagingArea};
use crate::process::past_median_time::PastMedianTimeManager;
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusResult, RuleError, RuleResult};
use consensus_core::header::Header;
use consensus_core::Hash;

/// Contextual validator for consensus rules
pub struct ContextualValidator {
    past_median_time: PastMedianTimeManager,
}

impl ContextualValidator {
    pub fn new(config: &ConsensusConfig) -> Self {
        Self { past_median_time: PastMedianTimeManager::new(config.past_median_time_window) }
    }

    pub fn past_median_time_manager(&self) -> &PastMedianTimeManager {
        &self.past_median_time
    }

    /// Parents known to be invalid fail first; otherwise every unknown parent is reported at once
    pub fn check_parents_known(&self, staging: &StagingArea, header: &Header) -> RuleResult<()> {
        if let Some(parent) = header.direct_parents().iter().find(|parent| staging.invalid_block_error(parent).is_some()) {
            return Err(RuleError::InvalidParent(*parent));
        }
        let missing: Vec<Hash> = header.direct_parents().iter().filter(|parent| !staging.contains_block(parent)).copied().collect();
        if !missing.is_empty() {
            return Err(RuleError::MissingParents(missing));
        }
        Ok(())
    }

    /// No parent may be in the past of another
    pub fn check_parents_relations<S: DagStoreReader + ?Sized>(&self, store: &S, header: &Header) -> ConsensusResult<()> {
        let parents = header.direct_parents();
        for a in parents.iter() {
            for b in parents.iter().filter(|b| *b != a) {
                if is_dag_ancestor_of(store, *a, *b)? {
                    return Err(RuleError::InvalidParentsRelation(*a, *b).into());
                }
            }
        }
        Ok(())
    }

    /// The header must be newer than the past median time of its selected parent, which is returned
    pub fn check_timestamp<S: DagStoreReader + ?Sized>(&self, store: &S, header: &Header, selected_parent: Hash) -> ConsensusResult<u64> {
        let past_median_time = self.past_median_time.calc_past_median_time(store, selected_parent)?;
        if header.timestamp <= past_median_time {
            return Err(RuleError::TimeTooOld(header.timestamp, past_median_time).into());
        }
        Ok(past_median_time)
    }
}
