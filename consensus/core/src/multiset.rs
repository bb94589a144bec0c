//! Order independent commitments to UTXO sets.

use crate::tx::{TransactionOutpoint, UtxoEntry};
use crate::utxo::UtxoDiff;
use crate::Hash;
use crypto_hashes::{HasherBase, HasherExtensions};
use jio_multiset::{EcMultiset, SerializedMultiset};

/// A commutative accumulator over byte-string elements.
///
/// `finalize` of two accumulators agree iff they hold the same multiset of
/// elements, regardless of the order in which elements were added or removed.
pub trait Multiset: Clone + Default + Send + Sync {
    fn add(&mut self, element: &[u8]);
    fn remove(&mut self, element: &[u8]);
    fn combine(&mut self, other: &Self);
    fn finalize(&self) -> Hash;
    fn serialize(&self) -> SerializedMultiset;
}

impl Multiset for EcMultiset {
    fn add(&mut self, element: &[u8]) {
        self.add_element(element);
    }

    fn remove(&mut self, element: &[u8]) {
        self.remove_element(element);
    }

    fn combine(&mut self, other: &Self) {
        EcMultiset::combine(self, other);
    }

    fn finalize(&self) -> Hash {
        EcMultiset::finalize(self)
    }

    fn serialize(&self) -> SerializedMultiset {
        EcMultiset::serialize(self)
    }
}

/// [`EcMultiset`] that also counts the elements it currently holds. Used by tests to
/// observe how many UTXOs a commitment covers.
#[derive(Clone, Debug, Default)]
pub struct CountingMultiset {
    inner: EcMultiset,
    live: i64,
    adds: u64,
    removes: u64,
}

impl CountingMultiset {
    /// Elements added minus elements removed
    pub fn live_elements(&self) -> i64 {
        self.live
    }

    pub fn total_adds(&self) -> u64 {
        self.adds
    }

    pub fn total_removes(&self) -> u64 {
        self.removes
    }
}

impl Multiset for CountingMultiset {
    fn add(&mut self, element: &[u8]) {
        self.inner.add_element(element);
        self.live += 1;
        self.adds += 1;
    }

    fn remove(&mut self, element: &[u8]) {
        self.inner.remove_element(element);
        self.live -= 1;
        self.removes += 1;
    }

    fn combine(&mut self, other: &Self) {
        self.inner.combine(&other.inner);
        self.live += other.live;
        self.adds += other.adds;
        self.removes += other.removes;
    }

    fn finalize(&self) -> Hash {
        self.inner.finalize()
    }

    fn serialize(&self) -> SerializedMultiset {
        self.inner.serialize()
    }
}

/// Canonical byte encoding of a UTXO as a multiset element
pub fn utxo_element(outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> Vec<u8> {
    let script = entry.script_public_key.script();
    let mut writer = ElementWriter(Vec::with_capacity(32 + 4 + 8 + 8 + 1 + 2 + 8 + script.len()));
    writer
        .update(outpoint.transaction_id)
        .write_u32(outpoint.index)
        .write_u64(entry.amount)
        .write_u64(entry.block_blue_score)
        .write_bool(entry.is_coinbase)
        .write_u16(entry.script_public_key.version())
        .write_var_bytes(script);
    writer.0
}

struct ElementWriter(Vec<u8>);

impl HasherBase for ElementWriter {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.extend_from_slice(data.as_ref());
        self
    }
}

/// UTXO-aware helpers for any [`Multiset`]
pub trait UtxoMultiset: Multiset {
    fn add_utxo(&mut self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) {
        self.add(&utxo_element(outpoint, entry));
    }

    fn remove_utxo(&mut self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) {
        self.remove(&utxo_element(outpoint, entry));
    }

    /// Moves the commitment across `diff`
    fn add_diff(&mut self, diff: &UtxoDiff) {
        for (outpoint, entry) in diff.remove.iter() {
            self.remove_utxo(outpoint, entry);
        }
        for (outpoint, entry) in diff.add.iter() {
            self.add_utxo(outpoint, entry);
        }
    }

    /// Commitment of a full UTXO set
    fn from_utxos<'a>(utxos: impl IntoIterator<Item = (&'a TransactionOutpoint, &'a UtxoEntry)>) -> Self {
        let mut multiset = Self::default();
        for (outpoint, entry) in utxos {
            multiset.add_utxo(outpoint, entry);
        }
        multiset
    }
}

impl<T: Multiset> UtxoMultiset for T {}
