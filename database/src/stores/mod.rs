pub mod block_store;
pub mod keyed_store;
pub mod metadata_store;
pub mod utxo_store;

pub use block_store::BlockStore;
pub use keyed_store::KeyedStore;
pub use metadata_store::MetadataStore;
pub use utxo_store::UtxoStore;
