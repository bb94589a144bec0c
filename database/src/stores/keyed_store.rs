use crate::{Database, DbError, DbResult};
use consensus_core::Hash;
use rocksdb::WriteBatch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// One column family of bincode values keyed by block hash
pub struct KeyedStore<V> {
    db: Arc<Database>,
    cf: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V: Serialize + DeserializeOwned> KeyedStore<V> {
    pub fn new(db: Arc<Database>, cf: &'static str) -> Self {
        Self { db, cf, _value: PhantomData }
    }

    pub fn put(&self, batch: &mut WriteBatch, hash: &Hash, value: &V) -> DbResult<()> {
        let serialized = bincode::serialize(value)?;
        self.db.put_in_batch(batch, self.cf, hash.as_bytes(), &serialized)
    }

    pub fn get(&self, hash: &Hash) -> DbResult<Option<V>> {
        match self.db.get(self.cf, hash.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, hash: &Hash) -> DbResult<bool> {
        self.db.exists(self.cf, hash.as_bytes())
    }

    pub fn load_all(&self) -> DbResult<Vec<(Hash, V)>> {
        self.db
            .entries(self.cf)?
            .into_iter()
            .map(|(key, value)| {
                let hash = Hash::try_from_slice(&key).map_err(|_| DbError::InvalidData(format!("bad key length {} in {}", key.len(), self.cf)))?;
                Ok((hash, bincode::deserialize(&value)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CF_CHILDREN;
    use tempfile::TempDir;

    #[test]
    fn values_round_trip_by_hash() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store: KeyedStore<Vec<Hash>> = KeyedStore::new(db.clone(), CF_CHILDREN);
        let (parent, child) = (Hash::from_u64_word(1), Hash::from_u64_word(2));

        let mut batch = WriteBatch::default();
        store.put(&mut batch, &parent, &vec![child]).unwrap();
        db.write_batch(batch).unwrap();

        assert!(store.has(&parent).unwrap());
        assert_eq!(store.get(&parent).unwrap(), Some(vec![child]));
        assert_eq!(store.get(&child).unwrap(), None);
        assert_eq!(store.load_all().unwrap(), vec![(parent, vec![child])]);
    }
}
