use crate::db::CF_METADATA;
use crate::{Database, DbResult};
use rocksdb::WriteBatch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub const KEY_TIPS: &str = "tips";
pub const KEY_VIRTUAL_STATE: &str = "virtual_state";
pub const KEY_FINALITY_POINT: &str = "finality_point";
pub const KEY_FINALITY_CONFLICTS: &str = "finality_conflicts";

/// Singleton values under fixed keys
pub struct MetadataStore {
    db: Arc<Database>,
}

impl MetadataStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn put<T: Serialize + ?Sized>(&self, batch: &mut WriteBatch, key: &str, value: &T) -> DbResult<()> {
        let serialized = bincode::serialize(value)?;
        self.db.put_in_batch(batch, CF_METADATA, key.as_bytes(), &serialized)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.db.get(CF_METADATA, key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}
