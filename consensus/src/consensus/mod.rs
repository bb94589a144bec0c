//! The consensus engine
//!
//! [`Consensus`] wires the pipeline stages over one committed [`DagState`] and
//! answers read queries from it. Queries take a read lock on committed state
//! only, so they never wait for in-flight validations.

pub mod dag;
pub mod finality;
pub mod ghostdag;
pub mod storage;
pub mod utxo;
pub mod validation;

#[cfg(test)]
mod integration_test;

use crate::notify::{Notifier, Subscription};
use crate::observability::{ObservabilitySink, TracingSink};
use crate::pipeline::{BlockProcessor, BodyProcessor, CancelToken, HeaderProcessor, VirtualProcessor};
use crate::process::{BlockTemplateBuilder, TemplateRequest};
use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::block::Block;
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::multiset::UtxoMultiset;
use consensus_core::notify::{Notification, SubscriptionOptions};
use consensus_core::persistence::{ConsensusPersistence, NoopPersistence};
use consensus_core::status::BlockStatus;
use consensus_core::tx::{ScriptPublicKey, TransactionOutpoint, UtxoEntry};
use consensus_core::utxo::{ComposedUtxoView, UtxoCollection, UtxoCollectionExtensions, UtxoDiff, UtxoView};
use consensus_core::virtual_state::VirtualState;
use consensus_core::Hash;
use dag::reachability;
use finality::DepthFinalityManager;
use jio_multiset::EcMultiset;
use std::sync::Arc;
use storage::{ConsensusStorage, DagState, GhostdagStoreReader, HeaderStoreReader, StagingArea};
use tracing::{debug, info};
use utxo::{chain_path, ChainPath, UtxoManager};
use validation::TxValidator;

/// Elements hashed between two cancellation checks while importing a UTXO set
const IMPORT_CANCEL_CHECK_INTERVAL: usize = 1024;

pub struct Consensus {
    config: Arc<ConsensusConfig>,
    genesis: Hash,
    storage: Arc<ConsensusStorage>,
    transaction_validator: Arc<TxValidator>,
    finality_manager: Arc<DepthFinalityManager>,
    virtual_processor: Arc<VirtualProcessor>,
    block_processor: BlockProcessor,
    template_builder: BlockTemplateBuilder,
    notifier: Arc<Notifier>,
}

impl Consensus {
    /// In-memory engine logging through `tracing`
    pub fn new(config: ConsensusConfig) -> ConsensusResult<Self> {
        Self::with_persistence(config, Arc::new(NoopPersistence), Arc::new(TracingSink))
    }

    /// Restores committed state from `persistence` when it holds any, otherwise starts from genesis
    pub fn with_persistence(
        config: ConsensusConfig,
        persistence: Arc<dyn ConsensusPersistence>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> ConsensusResult<Self> {
        config.validate().map_err(|err| ConsensusError::Config(err.to_string()))?;
        let config = Arc::new(config);
        let genesis = Block::from(&config.genesis).hash();

        let state = match persistence.load()? {
            Some(persisted) => {
                info!("restoring consensus state with {} blocks", persisted.blocks.len());
                DagState::from_persisted(genesis, persisted)
            }
            None => DagState::new(genesis),
        };
        let storage = Arc::new(ConsensusStorage::new(state, persistence));

        let transaction_validator = Arc::new(TxValidator::new(&config));
        let finality_manager = Arc::new(DepthFinalityManager::new(config.finality_depth));
        let utxo_manager = Arc::new(UtxoManager::new(&config, transaction_validator.clone()));
        let header_processor = Arc::new(HeaderProcessor::new(&config, finality_manager.clone()));
        let body_processor = Arc::new(BodyProcessor::new(&config, transaction_validator.clone(), utxo_manager.clone()));
        let virtual_processor = Arc::new(VirtualProcessor::new(&config, utxo_manager.clone(), finality_manager.clone()));
        let notifier = Arc::new(Notifier::new(config.notification_channel_capacity));
        let block_processor = BlockProcessor::new(
            storage.clone(),
            header_processor,
            body_processor,
            virtual_processor.clone(),
            notifier.clone(),
            sink,
            config.max_commit_retries,
        );
        let template_builder = BlockTemplateBuilder::new(&config, utxo_manager);

        let consensus = Self {
            config,
            genesis,
            storage,
            transaction_validator,
            finality_manager,
            virtual_processor,
            block_processor,
            template_builder,
            notifier,
        };
        if !consensus.storage.read().contains_block(&genesis) {
            consensus.init_genesis()?;
        }
        Ok(consensus)
    }

    fn init_genesis(&self) -> ConsensusResult<()> {
        let block = Block::from(&self.config.genesis);
        let hash = block.hash();
        self.storage.stage_and_commit(self.config.max_commit_retries, |staging| {
            staging.stage_block(&block);
            staging.stage_ghostdag_data(hash, Arc::new(GhostdagData::genesis()));
            reachability::init(staging, hash)?;
            staging.stage_utxo_diff(hash, Arc::new(UtxoDiff::default()));
            staging.stage_multiset(hash, EcMultiset::new().serialize());
            staging.stage_acceptance_data(hash, Arc::new(AcceptanceData::new()));
            staging.stage_tips(vec![hash]);
            self.virtual_processor.update_virtual(staging, &CancelToken::new())?;
            Ok(())
        })?;
        info!("initialized consensus with genesis {}", hash);
        Ok(())
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis
    }

    pub fn validate_and_insert_block(&self, block: &Block) -> ConsensusResult<BlockStatus> {
        self.validate_and_insert_block_with_cancel(block, &CancelToken::new())
    }

    pub fn validate_and_insert_block_with_cancel(&self, block: &Block, cancel: &CancelToken) -> ConsensusResult<BlockStatus> {
        self.block_processor.validate_and_insert_block(block, cancel)
    }

    /// Block on top of the current virtual parents
    pub fn build_block_template(&self, request: TemplateRequest) -> ConsensusResult<Block> {
        let parents = {
            let state = self.storage.read();
            self.virtual_processor.virtual_parents(&*state, state.tips())?
        };
        self.build_block_with_parents(parents, request)
    }

    pub fn build_block_with_parents(&self, parents: Vec<Hash>, request: TemplateRequest) -> ConsensusResult<Block> {
        let state = self.storage.read();
        let staging = StagingArea::new(&state);
        self.template_builder.build_block_with_parents(&staging, parents, request, &CancelToken::new())
    }

    pub fn selected_tip_hash(&self) -> ConsensusResult<Hash> {
        Ok(self.virtual_state()?.selected_parent())
    }

    /// Headers along the virtual selected chain, starting at `start`
    pub fn get_headers(&self, start: Hash, limit: usize) -> ConsensusResult<Vec<Arc<Header>>> {
        let path = self.get_virtual_chain_from_block(start)?;
        if !path.removed.is_empty() {
            return Err(ConsensusError::NotInSelectedChain(start));
        }
        let state = self.storage.read();
        std::iter::once(start)
            .chain(path.added)
            .take(limit)
            .map(|hash| state.get_header(&hash).ok_or(ConsensusError::UnknownBlock(hash)))
            .collect()
    }

    pub fn get_block(&self, hash: Hash) -> ConsensusResult<Block> {
        let state = self.storage.read();
        let header = state.get_header(&hash).ok_or(ConsensusError::UnknownBlock(hash))?;
        let transactions = state.get_block_transactions(&hash).ok_or(ConsensusError::UnknownBlock(hash))?;
        Ok(Block { header, transactions })
    }

    pub fn get_header(&self, hash: Hash) -> ConsensusResult<Arc<Header>> {
        self.storage.read().get_header(&hash).ok_or(ConsensusError::UnknownBlock(hash))
    }

    pub fn get_ghostdag_data(&self, hash: Hash) -> ConsensusResult<Arc<GhostdagData>> {
        self.storage.read().get_ghostdag_data(&hash).ok_or(ConsensusError::UnknownBlock(hash))
    }

    pub fn is_dag_ancestor_of(&self, ancestor: Hash, descendant: Hash) -> ConsensusResult<bool> {
        Ok(reachability::is_dag_ancestor_of(&*self.storage.read(), ancestor, descendant)?)
    }

    pub fn is_chain_ancestor_of(&self, ancestor: Hash, descendant: Hash) -> ConsensusResult<bool> {
        Ok(reachability::is_chain_ancestor_of(&*self.storage.read(), ancestor, descendant)?)
    }

    /// Route from chain block `low` to the virtual selected parent
    pub fn get_virtual_chain_from_block(&self, low: Hash) -> ConsensusResult<ChainPath> {
        let state = self.storage.read();
        let selected_parent = state.virtual_state().map(|vs| vs.selected_parent()).unwrap_or(self.genesis);
        chain_path(&*state, low, selected_parent)
    }

    /// Entry of `outpoint` in the virtual UTXO set
    pub fn get_virtual_utxo_entry(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        let state = self.storage.read();
        match state.virtual_state() {
            Some(virtual_state) => ComposedUtxoView::new(state.utxo_set(), &virtual_state.utxo_diff).get(outpoint),
            None => state.utxo_set().get(outpoint).cloned(),
        }
    }

    /// Sum of virtual UTXO amounts locked by `script_public_key`
    pub fn get_balance_by_script_public_key(&self, script_public_key: &ScriptPublicKey) -> u64 {
        let state = self.storage.read();
        let base = state.utxo_set().balance_of(script_public_key);
        let Some(virtual_state) = state.virtual_state() else {
            return base;
        };
        let matching = |entry: &&UtxoEntry| &entry.script_public_key == script_public_key;
        let removed = virtual_state.utxo_diff.remove.values().filter(matching).fold(0u64, |sum, entry| sum.saturating_add(entry.amount));
        let added = virtual_state.utxo_diff.add.values().filter(matching).fold(0u64, |sum, entry| sum.saturating_add(entry.amount));
        base.saturating_sub(removed).saturating_add(added)
    }

    pub fn get_block_acceptance_data(&self, hash: Hash) -> ConsensusResult<Arc<AcceptanceData>> {
        self.storage.read().get_acceptance_data(&hash).ok_or(ConsensusError::UnknownBlock(hash))
    }

    pub fn virtual_state(&self) -> ConsensusResult<Arc<VirtualState>> {
        self.storage.read().virtual_state().cloned().ok_or(ConsensusError::UnknownBlock(self.genesis))
    }

    pub fn tips(&self) -> Vec<Hash> {
        self.storage.read().tips().to_vec()
    }

    pub fn finality_point(&self) -> Hash {
        self.storage.read().finality_point()
    }

    pub fn unresolved_finality_conflicts(&self) -> Vec<Hash> {
        self.storage.read().finality_conflicts().to_vec()
    }

    pub fn block_count(&self) -> usize {
        self.storage.read().block_count()
    }

    /// Marks the conflict raised by `violating_block` as handled. Returns false when none was recorded.
    pub fn resolve_finality_conflict(&self, violating_block: Hash) -> ConsensusResult<bool> {
        let resolved = self.storage.stage_and_commit(self.config.max_commit_retries, |staging| {
            let conflicts = staging.finality_conflicts();
            if !conflicts.contains(&violating_block) {
                return Ok(None);
            }
            let remaining: Vec<Hash> = conflicts.iter().copied().filter(|hash| *hash != violating_block).collect();
            staging.stage_finality_conflicts(remaining);
            Ok(Some(staging.finality_point()))
        })?;
        let Some(finality_point) = resolved else {
            return Ok(false);
        };
        debug!("finality conflict of block {} resolved", violating_block);
        self.notifier.notify(Notification::FinalityConflictResolved { finality_block_hash: finality_point });
        Ok(true)
    }

    /// Replaces the committed UTXO set with `utxo_set` once it is shown to match the
    /// commitment of the virtual selected parent
    pub fn import_pruning_point_utxo_set(&self, utxo_set: UtxoCollection, cancel: &CancelToken) -> ConsensusResult<()> {
        let mut multiset = EcMultiset::new();
        for (i, (outpoint, entry)) in utxo_set.iter().enumerate() {
            if i % IMPORT_CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            multiset.add_utxo(outpoint, entry);
        }
        let computed = multiset.finalize();
        let utxo_set = Arc::new(utxo_set);

        self.storage.stage_and_commit(self.config.max_commit_retries, |staging| {
            cancel.check()?;
            let selected_parent = UtxoManager::virtual_base(staging);
            let expected = staging.get_header(&selected_parent).ok_or(ConsensusError::UnknownBlock(selected_parent))?.utxo_commitment;
            if computed != expected {
                return Err(ConsensusError::UtxoSetCommitmentMismatch(computed, expected));
            }
            staging.stage_utxo_set_override(utxo_set.clone());
            Ok(())
        })?;
        info!("imported a utxo set of {} entries", utxo_set.len());
        self.notifier.notify(Notification::PruningPointUtxoSetOverride);
        Ok(())
    }

    /// Runs `handler` on a tokio task for every notification `options` selects
    pub fn subscribe<F>(&self, options: SubscriptionOptions, handler: F) -> ConsensusResult<Subscription>
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.notifier.subscribe(options, handler)
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Exposes the signature cache through [`validation::TestTransactionValidator`]
    pub fn transaction_validator(&self) -> &Arc<TxValidator> {
        &self.transaction_validator
    }

    /// Exposes the finality-point cache through [`finality::TestFinalityManager`]
    pub fn finality_manager(&self) -> &Arc<DepthFinalityManager> {
        &self.finality_manager
    }
}
