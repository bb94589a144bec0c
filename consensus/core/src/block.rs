use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{header::Header, tx::Transaction, Hash};
use crypto_hashes::calc_merkle_root;

/// Complete block: header plus the ordered transaction list.
/// Both parts are reference counted so blocks move through staging without copying.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Arc<Header>,
    pub transactions: Arc<Vec<Transaction>>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header: Arc::new(header), transactions: Arc::new(transactions) }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.header.is_genesis()
    }

    /// Header-only block, used by tests that only exercise the DAG layers
    pub fn from_precomputed_hash(hash: Hash, parents: Vec<Hash>) -> Self {
        Self::new(Header::from_precomputed_hash(hash, parents), vec![])
    }
}

/// Merkle root over the full hashes (signature scripts included) of `transactions`
pub fn calc_hash_merkle_root<'a>(transactions: impl ExactSizeIterator<Item = &'a Transaction>) -> Hash {
    calc_merkle_root(transactions.map(|tx| tx.hash()))
}

/// Merkle root over accepted transaction ids, in consensus order
pub fn calc_accepted_id_merkle_root(accepted_ids: impl ExactSizeIterator<Item = Hash>) -> Hash {
    calc_merkle_root(accepted_ids)
}
