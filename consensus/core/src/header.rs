use crate::{hashing, BlueWorkType, Hash};
use serde::{Deserialize, Serialize};

/// Block header. `hash` caches the header hash and is recomputed by [`Header::finalize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub hash: Hash,
    pub version: u16,
    /// Direct parents; empty only for genesis
    pub parents: Vec<Hash>,
    pub hash_merkle_root: Hash,
    /// Merkle root over the ids of transactions this block accepts from its mergeset
    pub accepted_id_merkle_root: Hash,
    /// Multiset hash of the UTXO set in this block's past
    pub utxo_commitment: Hash,
    /// Milliseconds since the unix epoch
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
}

impl Header {
    #[allow(clippy::too_many_arguments)]
    pub fn new_finalized(
        version: u16,
        parents: Vec<Hash>,
        hash_merkle_root: Hash,
        accepted_id_merkle_root: Hash,
        utxo_commitment: Hash,
        timestamp: u64,
        bits: u32,
        nonce: u64,
        blue_score: u64,
        blue_work: BlueWorkType,
    ) -> Self {
        let mut header = Self {
            hash: Default::default(),
            version,
            parents,
            hash_merkle_root,
            accepted_id_merkle_root,
            utxo_commitment,
            timestamp,
            bits,
            nonce,
            blue_score,
            blue_work,
        };
        header.finalize();
        header
    }

    /// Recompute and cache the hash after field changes
    pub fn finalize(&mut self) {
        self.hash = hashing::header::hash(self);
    }

    pub fn direct_parents(&self) -> &[Hash] {
        &self.parents
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }

    /// Test helper: a header with an arbitrary precomputed hash and default fields
    pub fn from_precomputed_hash(hash: Hash, parents: Vec<Hash>) -> Self {
        Self {
            hash,
            version: crate::constants::BLOCK_VERSION,
            parents,
            hash_merkle_root: Default::default(),
            accepted_id_merkle_root: Default::default(),
            utxo_commitment: Default::default(),
            timestamp: 0,
            bits: 0,
            nonce: 0,
            blue_score: 0,
            blue_work: Default::default(),
        }
    }
}
