//! RocksDB persistence of committed consensus state
//!
//! Each commit of the engine becomes one `WriteBatch`, so a crash leaves the
//! store at a commit boundary. Loading reads every column family back into a
//! [`PersistedState`].

use crate::db::{CF_ACCEPTANCE, CF_CHILDREN, CF_GHOSTDAG, CF_INVALID, CF_MULTISETS, CF_REACHABILITY, CF_UTXO_DIFFS};
use crate::stores::metadata_store::{KEY_FINALITY_CONFLICTS, KEY_FINALITY_POINT, KEY_TIPS, KEY_VIRTUAL_STATE};
use crate::stores::{BlockStore, KeyedStore, MetadataStore, UtxoStore};
use crate::{Database, DbResult};
use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::block::Block;
use consensus_core::errors::{RuleError, StoreResult};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::persistence::{CommitBatch, ConsensusPersistence, PersistedState};
use consensus_core::reachability::ReachabilityData;
use consensus_core::utxo::UtxoDiff;
use consensus_core::virtual_state::VirtualState;
use consensus_core::Hash;
use jio_multiset::SerializedMultiset;
use rocksdb::WriteBatch;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const HEADER_CACHE_SIZE: usize = 4096;

pub struct ConsensusDb {
    db: Arc<Database>,
    blocks: BlockStore,
    ghostdag: KeyedStore<GhostdagData>,
    reachability: KeyedStore<ReachabilityData>,
    children: KeyedStore<Vec<Hash>>,
    utxo_diffs: KeyedStore<UtxoDiff>,
    multisets: KeyedStore<SerializedMultiset>,
    acceptance: KeyedStore<AcceptanceData>,
    invalid: KeyedStore<RuleError>,
    utxo_set: UtxoStore,
    metadata: MetadataStore,
}

impl ConsensusDb {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = Arc::new(Database::open(path)?);
        Ok(Self {
            blocks: BlockStore::new(db.clone(), HEADER_CACHE_SIZE),
            ghostdag: KeyedStore::new(db.clone(), CF_GHOSTDAG),
            reachability: KeyedStore::new(db.clone(), CF_REACHABILITY),
            children: KeyedStore::new(db.clone(), CF_CHILDREN),
            utxo_diffs: KeyedStore::new(db.clone(), CF_UTXO_DIFFS),
            multisets: KeyedStore::new(db.clone(), CF_MULTISETS),
            acceptance: KeyedStore::new(db.clone(), CF_ACCEPTANCE),
            invalid: KeyedStore::new(db.clone(), CF_INVALID),
            utxo_set: UtxoStore::new(db.clone()),
            metadata: MetadataStore::new(db.clone()),
            db,
        })
    }

    pub fn get_header(&self, hash: &Hash) -> DbResult<Option<Arc<Header>>> {
        self.blocks.get_header(hash)
    }

    pub fn get_block(&self, hash: &Hash) -> DbResult<Option<Block>> {
        self.blocks.get_block(hash)
    }

    pub fn utxo_store(&self) -> &UtxoStore {
        &self.utxo_set
    }

    pub fn close(&self) {
        self.db.close();
    }

    fn stage_commit(&self, commit: &CommitBatch) -> DbResult<WriteBatch> {
        let mut batch = WriteBatch::default();
        for block in commit.blocks.iter() {
            self.blocks.put_block(&mut batch, block)?;
        }
        for (hash, data) in commit.ghostdag.iter() {
            self.ghostdag.put(&mut batch, hash, data)?;
        }
        for (hash, data) in commit.reachability.iter() {
            self.reachability.put(&mut batch, hash, data)?;
        }
        for (hash, children) in commit.children.iter() {
            self.children.put(&mut batch, hash, children)?;
        }
        for (hash, diff) in commit.utxo_diffs.iter() {
            self.utxo_diffs.put(&mut batch, hash, diff)?;
        }
        for (hash, multiset) in commit.multisets.iter() {
            self.multisets.put(&mut batch, hash, multiset)?;
        }
        for (hash, data) in commit.acceptance_data.iter() {
            self.acceptance.put(&mut batch, hash, data)?;
        }
        if let Some(set) = &commit.utxo_set_override {
            self.utxo_set.replace_all(&mut batch, set)?;
        }
        if let Some(changes) = &commit.utxo_set_changes {
            self.utxo_set.apply_diff(&mut batch, changes)?;
        }
        if let Some(tips) = &commit.tips {
            self.metadata.put(&mut batch, KEY_TIPS, tips)?;
        }
        if let Some(virtual_state) = &commit.virtual_state {
            self.metadata.put(&mut batch, KEY_VIRTUAL_STATE, virtual_state.as_ref())?;
        }
        if let Some(finality_point) = &commit.finality_point {
            self.metadata.put(&mut batch, KEY_FINALITY_POINT, finality_point)?;
        }
        if let Some(conflicts) = &commit.finality_conflicts {
            self.metadata.put(&mut batch, KEY_FINALITY_CONFLICTS, conflicts)?;
        }
        for (hash, err) in commit.invalid_blocks.iter() {
            self.invalid.put(&mut batch, hash, err)?;
        }
        Ok(batch)
    }

    fn load_state(&self) -> DbResult<Option<PersistedState>> {
        let Some(tips) = self.metadata.get::<Vec<Hash>>(KEY_TIPS)? else {
            return Ok(None);
        };
        let state = PersistedState {
            blocks: self.blocks.load_blocks()?,
            ghostdag: self.ghostdag.load_all()?,
            reachability: self.reachability.load_all()?,
            children: self.children.load_all()?,
            utxo_diffs: self.utxo_diffs.load_all()?,
            multisets: self.multisets.load_all()?,
            acceptance_data: self.acceptance.load_all()?,
            utxo_set: self.utxo_set.load()?,
            tips,
            virtual_state: self.metadata.get::<VirtualState>(KEY_VIRTUAL_STATE)?,
            finality_point: self.metadata.get(KEY_FINALITY_POINT)?,
            finality_conflicts: self.metadata.get(KEY_FINALITY_CONFLICTS)?.unwrap_or_default(),
            invalid_blocks: self.invalid.load_all()?,
        };
        info!("loaded {} blocks and {} utxos from disk", state.blocks.len(), state.utxo_set.len());
        Ok(Some(state))
    }
}

impl ConsensusPersistence for ConsensusDb {
    fn write_commit(&self, commit: &CommitBatch) -> StoreResult<()> {
        let batch = self.stage_commit(commit)?;
        debug!("writing commit of {} blocks ({} operations)", commit.blocks.len(), batch.len());
        self.db.write_batch(batch)?;
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<PersistedState>> {
        Ok(self.load_state()?)
    }
}
