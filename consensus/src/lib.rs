//! BlockDAG consensus engine
//!
//! Reachability index, GHOSTDAG ordering, virtual UTXO state, finality and the
//! block processing pipeline that validates candidate blocks against a staging
//! area before committing them atomically.

pub mod consensus;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod process;

#[cfg(test)]
pub(crate) mod testutils;

pub use consensus::finality::{DepthFinalityManager, FinalityManager, TestFinalityManager};
pub use consensus::ghostdag::GhostdagProtocol;
pub use consensus::storage::{ConsensusStorage, DagState, StagingArea};
pub use consensus::utxo::{ChainPath, UtxoManager};
pub use consensus::validation::{TestTransactionValidator, TransactionValidator, TxValidator};
pub use consensus::Consensus;
pub use consensus_core::Hash;
pub use notify::{Notifier, Subscription};
pub use observability::{ObservabilitySink, TracingSink};
pub use pipeline::CancelToken;
pub use process::TemplateRequest;
