use crate::cache::LruCache;
use crate::db::{CF_HEADERS, CF_TRANSACTIONS};
use crate::stores::KeyedStore;
use crate::{Database, DbError, DbResult};
use consensus_core::block::Block;
use consensus_core::header::Header;
use consensus_core::tx::Transaction;
use consensus_core::{BlockHashMap, Hash};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Headers and bodies in separate column families, with a read cache in front of headers
pub struct BlockStore {
    headers: KeyedStore<Header>,
    transactions: KeyedStore<Vec<Transaction>>,
    cache: LruCache<Hash, Arc<Header>>,
}

impl BlockStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        Self {
            headers: KeyedStore::new(db.clone(), CF_HEADERS),
            transactions: KeyedStore::new(db, CF_TRANSACTIONS),
            cache: LruCache::new(cache_size),
        }
    }

    pub fn put_block(&self, batch: &mut WriteBatch, block: &Block) -> DbResult<()> {
        let hash = block.hash();
        self.headers.put(batch, &hash, &block.header)?;
        self.transactions.put(batch, &hash, &block.transactions)
    }

    pub fn get_header(&self, hash: &Hash) -> DbResult<Option<Arc<Header>>> {
        if let Some(header) = self.cache.get(hash) {
            return Ok(Some(header));
        }
        let Some(header) = self.headers.get(hash)? else {
            return Ok(None);
        };
        let header = Arc::new(header);
        self.cache.insert(*hash, header.clone());
        Ok(Some(header))
    }

    pub fn get_block(&self, hash: &Hash) -> DbResult<Option<Block>> {
        let Some(header) = self.get_header(hash)? else {
            return Ok(None);
        };
        let transactions = self.transactions.get(hash)?.ok_or_else(|| DbError::InvalidData(format!("block {hash} has no body")))?;
        Ok(Some(Block { header, transactions: Arc::new(transactions) }))
    }

    pub fn has_block(&self, hash: &Hash) -> DbResult<bool> {
        if self.cache.get(hash).is_some() {
            return Ok(true);
        }
        self.headers.has(hash)
    }

    pub fn load_blocks(&self) -> DbResult<Vec<Block>> {
        let mut bodies: BlockHashMap<Vec<Transaction>> = self.transactions.load_all()?.into_iter().collect();
        self.headers
            .load_all()?
            .into_iter()
            .map(|(hash, header)| {
                let transactions = bodies.remove(&hash).ok_or_else(|| DbError::InvalidData(format!("block {hash} has no body")))?;
                Ok(Block::new(header, transactions))
            })
            .collect()
    }
}
