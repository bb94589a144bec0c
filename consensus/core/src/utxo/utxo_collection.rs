use std::collections::HashMap;

use super::{UtxoAlgebraError, UtxoDiff, UtxoResult};
use crate::tx::{ScriptPublicKey, TransactionOutpoint, UtxoEntry};

/// In-memory UTXO set keyed by outpoint
pub type UtxoCollection = HashMap<TransactionOutpoint, UtxoEntry>;

pub trait UtxoCollectionExtensions {
    /// Applies `diff` in place: removals first, then additions
    fn apply_diff(&mut self, diff: &UtxoDiff) -> UtxoResult<()>;

    /// Checks whether `outpoint` is present with exactly `entry`
    fn contains_entry(&self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> bool;

    /// Sum of all amounts locked by `script_public_key`
    fn balance_of(&self, script_public_key: &ScriptPublicKey) -> u64;

    /// Total amount held by the set
    fn total_supply(&self) -> u128;
}

impl UtxoCollectionExtensions for UtxoCollection {
    fn apply_diff(&mut self, diff: &UtxoDiff) -> UtxoResult<()> {
        for outpoint in diff.remove.keys() {
            if self.remove(outpoint).is_none() {
                return Err(UtxoAlgebraError::MissingRemovePoint(*outpoint));
            }
        }
        for (outpoint, entry) in diff.add.iter() {
            if self.insert(*outpoint, entry.clone()).is_some() {
                return Err(UtxoAlgebraError::DuplicateAddPoint(*outpoint));
            }
        }
        Ok(())
    }

    fn contains_entry(&self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> bool {
        self.get(outpoint) == Some(entry)
    }

    fn balance_of(&self, script_public_key: &ScriptPublicKey) -> u64 {
        self.values().filter(|e| &e.script_public_key == script_public_key).map(|e| e.amount).fold(0u64, u64::saturating_add)
    }

    fn total_supply(&self) -> u128 {
        self.values().map(|e| e.amount as u128).sum()
    }
}
