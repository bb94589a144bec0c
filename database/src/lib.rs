//! RocksDB storage for the consensus engine

pub mod cache;
pub mod consensus_db;
pub mod db;
pub mod errors;
pub mod stores;

pub use consensus_db::ConsensusDb;
pub use db::Database;
pub use errors::{DbError, DbResult};
