use crate::block::{calc_hash_merkle_root, Block};
use crate::constants::{BLOCK_VERSION, TX_VERSION};
use crate::header::Header;
use crate::subnets::SUBNETWORK_ID_COINBASE;
use crate::tx::Transaction;
use crate::{BlueWorkType, ZERO_HASH};
use jio_multiset::EMPTY_MULTISET_HASH;
use serde::{Deserialize, Serialize};

/// The constants uniquely representing the genesis block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisBlock {
    pub version: u16,
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    /// Coinbase payload; the first eight bytes are the blue score (zero)
    pub coinbase_payload: Vec<u8>,
}

impl Default for GenesisBlock {
    fn default() -> Self {
        let mut coinbase_payload = 0u64.to_le_bytes().to_vec();
        coinbase_payload.extend_from_slice(b"Jio deterministic genesis - 2025-11-12");
        Self { version: BLOCK_VERSION, timestamp: 1_762_971_421_786, bits: 0x207f_ffff, nonce: 38_922, coinbase_payload }
    }
}

impl GenesisBlock {
    /// The genesis coinbase pays nothing; genesis only anchors the DAG
    pub fn build_genesis_transactions(&self) -> Vec<Transaction> {
        vec![Transaction::new(TX_VERSION, Vec::new(), Vec::new(), 0, SUBNETWORK_ID_COINBASE, 0, self.coinbase_payload.clone())]
    }

    pub fn build_header(&self, transactions: &[Transaction]) -> Header {
        Header::new_finalized(
            self.version,
            Vec::new(),
            calc_hash_merkle_root(transactions.iter()),
            ZERO_HASH,
            *EMPTY_MULTISET_HASH,
            self.timestamp,
            self.bits,
            self.nonce,
            0,
            BlueWorkType::ZERO,
        )
    }

    pub fn build_block(&self) -> Block {
        let transactions = self.build_genesis_transactions();
        Block::new(self.build_header(&transactions), transactions)
    }
}

impl From<&GenesisBlock> for Block {
    fn from(genesis: &GenesisBlock) -> Self {
        genesis.build_block()
    }
}
