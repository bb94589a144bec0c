use serde::{Deserialize, Serialize};

/// Outcome of submitting a block to consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// The block passed every check and is now part of the DAG
    StatusUTXOValid,
    /// The block was accepted earlier; nothing changed
    AlreadyKnown,
}

impl BlockStatus {
    pub fn is_newly_added(self) -> bool {
        matches!(self, BlockStatus::StatusUTXOValid)
    }
}
