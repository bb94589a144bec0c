use serde::{Deserialize, Serialize};

use super::{UtxoAlgebraError, UtxoCollection, UtxoResult};
use crate::tx::{TransactionOutpoint, UtxoEntry, VerifiableTransaction};

/// The difference between two UTXO sets. Applying it to the older set removes
/// every entry of `remove` and then inserts every entry of `add`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoDiff {
    pub add: UtxoCollection,
    pub remove: UtxoCollection,
}

impl UtxoDiff {
    pub fn new(add: UtxoCollection, remove: UtxoCollection) -> Self {
        Self { add, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// The diff that undoes this one
    pub fn reversed(&self) -> Self {
        Self { add: self.remove.clone(), remove: self.add.clone() }
    }

    /// Composes `self` followed by `other` into a single diff
    pub fn with_diff(&self, other: &UtxoDiff) -> UtxoResult<UtxoDiff> {
        let mut result = self.clone();
        result.with_diff_in_place(other)?;
        Ok(result)
    }

    pub fn with_diff_in_place(&mut self, other: &UtxoDiff) -> UtxoResult<()> {
        for (outpoint, entry) in other.remove.iter() {
            if self.add.remove(outpoint).is_some() {
                continue;
            }
            if self.remove.contains_key(outpoint) {
                return Err(UtxoAlgebraError::DuplicateRemovePoint(*outpoint));
            }
            self.remove.insert(*outpoint, entry.clone());
        }
        for (outpoint, entry) in other.add.iter() {
            if self.add.contains_key(outpoint) {
                return Err(UtxoAlgebraError::DuplicateAddPoint(*outpoint));
            }
            // re-adding exactly what an earlier step removed cancels out
            if self.remove.get(outpoint) == Some(entry) {
                self.remove.remove(outpoint);
                continue;
            }
            self.add.insert(*outpoint, entry.clone());
        }
        Ok(())
    }

    /// Records the spend of `outpoint`, whose current entry is `entry`
    pub fn remove_entry(&mut self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> UtxoResult<()> {
        if self.add.remove(outpoint).is_some() {
            return Ok(());
        }
        if self.remove.insert(*outpoint, entry.clone()).is_some() {
            return Err(UtxoAlgebraError::DuplicateRemovePoint(*outpoint));
        }
        Ok(())
    }

    pub fn add_entry(&mut self, outpoint: TransactionOutpoint, entry: UtxoEntry) -> UtxoResult<()> {
        if self.remove.get(&outpoint) == Some(&entry) {
            self.remove.remove(&outpoint);
            return Ok(());
        }
        if self.add.insert(outpoint, entry).is_some() {
            return Err(UtxoAlgebraError::DuplicateAddPoint(outpoint));
        }
        Ok(())
    }

    /// Spends the populated inputs of `tx` and creates its outputs with `block_blue_score`
    pub fn add_transaction(&mut self, tx: &impl VerifiableTransaction, block_blue_score: u64) -> UtxoResult<()> {
        for (input, entry) in tx.populated_inputs() {
            self.remove_entry(&input.previous_outpoint, entry)?;
        }
        let is_coinbase = tx.is_coinbase();
        let tx_id = tx.id();
        for (index, output) in tx.outputs().iter().enumerate() {
            let outpoint = TransactionOutpoint::new(tx_id, index as u32);
            let entry = UtxoEntry::new(output.value, output.script_public_key.clone(), block_blue_score, is_coinbase);
            self.add_entry(outpoint, entry)?;
        }
        Ok(())
    }
}
