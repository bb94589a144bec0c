//! Block processor
//!
//! Orchestrates header, body and virtual processing of one block against a
//! staging area and commits the result. A commit that lost the race against a
//! concurrent one is validated again from the new state. Rule violations are
//! remembered so a resubmitted invalid block fails fast.

use crate::consensus::dag::{stage_block_relations, tips_after_adding};
use crate::consensus::storage::{CommitOutcome, ConsensusStorage, StagingArea};
use crate::notify::Notifier;
use crate::observability::ObservabilitySink;
use crate::pipeline::{BodyProcessor, CancelToken, ChainChange, HeaderProcessor, VirtualProcessor};
use consensus_core::block::Block;
use consensus_core::errors::{ConsensusError, ConsensusResult, RuleError, RuleResult};
use consensus_core::notify::{Notification, VirtualChainChangedNotification};
use consensus_core::status::BlockStatus;
use consensus_core::Hash;
use std::sync::Arc;
use tracing::warn;

enum Attempt {
    Committed { blue_score: u64, chain_change: ChainChange },
    AlreadyKnown,
    Conflict,
}

pub struct BlockProcessor {
    storage: Arc<ConsensusStorage>,
    header_processor: Arc<HeaderProcessor>,
    body_processor: Arc<BodyProcessor>,
    virtual_processor: Arc<VirtualProcessor>,
    notifier: Arc<Notifier>,
    sink: Arc<dyn ObservabilitySink>,
    max_commit_retries: usize,
}

impl BlockProcessor {
    pub fn new(
        storage: Arc<ConsensusStorage>,
        header_processor: Arc<HeaderProcessor>,
        body_processor: Arc<BodyProcessor>,
        virtual_processor: Arc<VirtualProcessor>,
        notifier: Arc<Notifier>,
        sink: Arc<dyn ObservabilitySink>,
        max_commit_retries: usize,
    ) -> Self {
        Self { storage, header_processor, body_processor, virtual_processor, notifier, sink, max_commit_retries }
    }

    pub fn validate_and_insert_block(&self, block: &Block, cancel: &CancelToken) -> ConsensusResult<BlockStatus> {
        let hash = block.hash();
        {
            let state = self.storage.read();
            if state.contains_block(&hash) {
                return Ok(BlockStatus::AlreadyKnown);
            }
            if let Some(err) = state.invalid_block_error(&hash) {
                return Err(err.clone().into());
            }
        }
        if let Err(err) = self.validate_in_isolation(block) {
            return Err(self.reject(hash, err));
        }

        for attempt in 0..=self.max_commit_retries {
            if attempt > 0 {
                self.sink.on_commit_retry(hash, attempt);
            }
            match self.try_insert(block, cancel) {
                Ok(Attempt::Committed { blue_score, chain_change }) => {
                    self.on_committed(hash, blue_score, chain_change);
                    return Ok(BlockStatus::StatusUTXOValid);
                }
                Ok(Attempt::AlreadyKnown) => return Ok(BlockStatus::AlreadyKnown),
                Ok(Attempt::Conflict) => continue,
                Err(ConsensusError::Rule(err)) => return Err(self.reject(hash, err)),
                Err(err) => return Err(err),
            }
        }
        Err(ConsensusError::CommitConflict(self.max_commit_retries + 1))
    }

    fn validate_in_isolation(&self, block: &Block) -> RuleResult<()> {
        self.header_processor.validate_header_in_isolation(&block.header)?;
        self.body_processor.validate_body_in_isolation(block)
    }

    fn try_insert(&self, block: &Block, cancel: &CancelToken) -> ConsensusResult<Attempt> {
        cancel.check()?;
        let hash = block.hash();
        let state = self.storage.read();
        if state.contains_block(&hash) {
            return Ok(Attempt::AlreadyKnown);
        }
        let mut staging = StagingArea::new(&state);

        let context = self.header_processor.process_header(&mut staging, &block.header, cancel)?;
        cancel.check()?;
        self.body_processor.process_body(&mut staging, block, &context, cancel)?;

        let parents = block.header.direct_parents();
        stage_block_relations(&mut staging, hash, parents);
        let tips = tips_after_adding(staging.tips(), hash, parents);
        staging.stage_tips(tips);
        cancel.check()?;
        let chain_change = self.virtual_processor.update_virtual(&mut staging, cancel)?;
        cancel.check()?;

        let (version, batch) = staging.into_commit();
        drop(state);
        Ok(match self.storage.commit(version, batch)? {
            CommitOutcome::Committed => Attempt::Committed { blue_score: context.ghostdag_data.blue_score, chain_change },
            CommitOutcome::Conflict => Attempt::Conflict,
        })
    }

    fn on_committed(&self, hash: Hash, blue_score: u64, chain_change: ChainChange) {
        self.sink.on_block_accepted(hash, blue_score, chain_change.removed.len(), chain_change.added.len());
        if chain_change.is_empty() {
            return;
        }
        self.notifier.notify(Notification::VirtualChainChanged(VirtualChainChangedNotification {
            removed_chain_block_hashes: Arc::new(chain_change.removed),
            added_chain_block_hashes: Arc::new(chain_change.added),
            accepted_transaction_ids: Arc::new(chain_change.accepted_transaction_ids),
        }));
    }

    /// Records a cacheable rule violation as known-invalid and hands the error back.
    /// A finality violation is also recorded as an unresolved finality conflict.
    fn reject(&self, hash: Hash, err: RuleError) -> ConsensusError {
        self.sink.on_block_rejected(hash, &err);
        if !err.is_cacheable() {
            return err.into();
        }
        let violated_finality_point = match &err {
            RuleError::ViolatingFinality(finality_point) => Some(*finality_point),
            _ => None,
        };
        let recorded = self.storage.stage_and_commit(self.max_commit_retries, |staging| {
            staging.stage_invalid_block(hash, err.clone());
            if violated_finality_point.is_some() && !staging.finality_conflicts().contains(&hash) {
                let mut conflicts = staging.finality_conflicts().to_vec();
                conflicts.push(hash);
                staging.stage_finality_conflicts(conflicts);
            }
            Ok(())
        });
        match recorded {
            Ok(()) => {
                if let Some(finality_point) = violated_finality_point {
                    self.sink.on_finality_conflict(hash, finality_point);
                    self.notifier.notify(Notification::FinalityConflict { violating_block_hash: hash });
                }
            }
            Err(record_err) => warn!("could not record invalid block {}: {}", hash, record_err),
        }
        err.into()
    }
}
