//! Injected observability hooks. The engine holds no process-wide logging or
//! metrics state; whoever builds a `Consensus` decides where these events go.

use consensus_core::errors::RuleError;
use consensus_core::Hash;
use tracing::{debug, info, trace, warn};

pub trait ObservabilitySink: Send + Sync {
    fn on_block_accepted(&self, hash: Hash, blue_score: u64, removed_chain_blocks: usize, added_chain_blocks: usize);

    fn on_block_rejected(&self, hash: Hash, err: &RuleError);

    /// A staged block lost a commit race and is validated again
    fn on_commit_retry(&self, hash: Hash, attempt: usize);

    fn on_finality_conflict(&self, violating_block: Hash, finality_point: Hash);
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn on_block_accepted(&self, hash: Hash, blue_score: u64, removed_chain_blocks: usize, added_chain_blocks: usize) {
        info!(
            "accepted block {} with blue score {} (chain -{} +{})",
            hash, blue_score, removed_chain_blocks, added_chain_blocks
        );
    }

    fn on_block_rejected(&self, hash: Hash, err: &RuleError) {
        debug!("rejected block {}: {}", hash, err);
    }

    fn on_commit_retry(&self, hash: Hash, attempt: usize) {
        trace!("block {} staged against a stale state, retry {}", hash, attempt);
    }

    fn on_finality_conflict(&self, violating_block: Hash, finality_point: Hash) {
        warn!("block {} violates finality point {}", violating_block, finality_point);
    }
}
