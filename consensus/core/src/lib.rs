//! Consensus data model shared by the engine, the script interpreter and storage.

use std::collections::{HashMap, HashSet};

pub mod acceptance_data;
pub mod block;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ghostdag;
pub mod hashing;
pub mod header;
pub mod mass;
pub mod multiset;
pub mod notify;
pub mod persistence;
pub mod reachability;
pub mod status;
pub mod subnets;
pub mod tx;
pub mod utxo;
pub mod virtual_state;

pub use crypto_hashes::{Hash, HASH_SIZE, ZERO_HASH};

/// Accumulated work of a block's blue set
pub type BlueWorkType = jio_math::Uint192;

/// GHOSTDAG cluster-size parameter
pub type KType = u16;

pub type BlockHashMap<V> = HashMap<Hash, V>;
pub type BlockHashSet = HashSet<Hash>;
