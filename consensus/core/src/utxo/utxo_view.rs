use super::{UtxoCollection, UtxoDiff};
use crate::tx::{TransactionOutpoint, UtxoEntry};

/// Read access to some UTXO set
pub trait UtxoView {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry>;
}

impl UtxoView for UtxoCollection {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        std::collections::HashMap::get(self, outpoint).cloned()
    }
}

impl<V: UtxoView + ?Sized> UtxoView for &V {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        (**self).get(outpoint)
    }
}

/// A base view with a diff laid on top of it. Nothing is copied.
pub struct ComposedUtxoView<'a, V: UtxoView> {
    base: V,
    diff: &'a UtxoDiff,
}

impl<'a, V: UtxoView> ComposedUtxoView<'a, V> {
    pub fn new(base: V, diff: &'a UtxoDiff) -> Self {
        Self { base, diff }
    }
}

impl<V: UtxoView> UtxoView for ComposedUtxoView<'_, V> {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        if let Some(entry) = self.diff.add.get(outpoint) {
            return Some(entry.clone());
        }
        if self.diff.remove.contains_key(outpoint) {
            return None;
        }
        self.base.get(outpoint)
    }
}
