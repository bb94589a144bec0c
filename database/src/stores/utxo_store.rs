use crate::db::CF_UTXO_SET;
use crate::{Database, DbError, DbResult};
use consensus_core::tx::{TransactionOutpoint, UtxoEntry};
use consensus_core::utxo::{UtxoCollection, UtxoDiff};
use consensus_core::Hash;
use rocksdb::WriteBatch;
use std::sync::Arc;

const OUTPOINT_KEY_LEN: usize = 36;

/// The committed base UTXO set keyed by (transaction id, output index)
pub struct UtxoStore {
    db: Arc<Database>,
}

impl UtxoStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn apply_diff(&self, batch: &mut WriteBatch, diff: &UtxoDiff) -> DbResult<()> {
        for outpoint in diff.remove.keys() {
            self.db.delete_in_batch(batch, CF_UTXO_SET, &Self::outpoint_to_key(outpoint))?;
        }
        for (outpoint, entry) in diff.add.iter() {
            self.put_utxo(batch, outpoint, entry)?;
        }
        Ok(())
    }

    /// Stages the replacement of the whole set by `set`
    pub fn replace_all(&self, batch: &mut WriteBatch, set: &UtxoCollection) -> DbResult<()> {
        for (key, _) in self.db.entries(CF_UTXO_SET)? {
            self.db.delete_in_batch(batch, CF_UTXO_SET, &key)?;
        }
        for (outpoint, entry) in set.iter() {
            self.put_utxo(batch, outpoint, entry)?;
        }
        Ok(())
    }

    fn put_utxo(&self, batch: &mut WriteBatch, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> DbResult<()> {
        let serialized = bincode::serialize(entry)?;
        self.db.put_in_batch(batch, CF_UTXO_SET, &Self::outpoint_to_key(outpoint), &serialized)
    }

    pub fn get_utxo(&self, outpoint: &TransactionOutpoint) -> DbResult<Option<UtxoEntry>> {
        match self.db.get(CF_UTXO_SET, &Self::outpoint_to_key(outpoint))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn load(&self) -> DbResult<UtxoCollection> {
        self.db
            .entries(CF_UTXO_SET)?
            .into_iter()
            .map(|(key, value)| Ok((Self::key_to_outpoint(&key)?, bincode::deserialize(&value)?)))
            .collect()
    }

    /// Sum of all amounts in the stored set
    pub fn sum_amounts(&self) -> DbResult<u128> {
        let mut total: u128 = 0;
        for (_, value) in self.db.entries(CF_UTXO_SET)? {
            let entry: UtxoEntry = bincode::deserialize(&value)?;
            total = total.saturating_add(entry.amount as u128);
        }
        Ok(total)
    }

    fn outpoint_to_key(outpoint: &TransactionOutpoint) -> Vec<u8> {
        let mut key = outpoint.transaction_id.as_bytes().to_vec();
        key.extend_from_slice(&outpoint.index.to_le_bytes());
        key
    }

    fn key_to_outpoint(key: &[u8]) -> DbResult<TransactionOutpoint> {
        if key.len() != OUTPOINT_KEY_LEN {
            return Err(DbError::InvalidData(format!("bad utxo key length {}", key.len())));
        }
        let (id, index) = key.split_at(32);
        let transaction_id = Hash::try_from_slice(id).map_err(|err| DbError::InvalidData(err.to_string()))?;
        let index = u32::from_le_bytes([index[0], index[1], index[2], index[3]]);
        Ok(TransactionOutpoint::new(transaction_id, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::tx::ScriptPublicKey;
    use tempfile::TempDir;

    fn utxo(i: u64, amount: u64) -> (TransactionOutpoint, UtxoEntry) {
        (TransactionOutpoint::new(Hash::from_u64_word(i), i as u32), UtxoEntry::new(amount, ScriptPublicKey::from_vec(0, vec![0x51]), i, false))
    }

    #[test]
    fn diffs_and_overrides_rewrite_the_set() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = UtxoStore::new(db.clone());

        let mut diff = UtxoDiff::default();
        for i in 1..=3 {
            let (outpoint, entry) = utxo(i, i * 10);
            diff.add.insert(outpoint, entry);
        }
        let mut batch = WriteBatch::default();
        store.apply_diff(&mut batch, &diff).unwrap();
        db.write_batch(batch).unwrap();
        assert_eq!(store.sum_amounts().unwrap(), 60);

        let (spent, spent_entry) = utxo(2, 20);
        let mut diff = UtxoDiff::default();
        diff.remove.insert(spent, spent_entry);
        let mut batch = WriteBatch::default();
        store.apply_diff(&mut batch, &diff).unwrap();
        db.write_batch(batch).unwrap();
        assert_eq!(store.get_utxo(&spent).unwrap(), None);
        assert_eq!(store.load().unwrap().len(), 2);

        let replacement: UtxoCollection = [utxo(7, 5)].into_iter().collect();
        let mut batch = WriteBatch::default();
        store.replace_all(&mut batch, &replacement).unwrap();
        db.write_batch(batch).unwrap();
        assert_eq!(store.load().unwrap(), replacement);
    }
}
