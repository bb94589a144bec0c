use crate::errors::TxRuleError;
use crate::tx::TransactionId;
use crate::Hash;
use serde::{Deserialize, Serialize};

/// What happened to a single mergeset transaction when a chain block accepted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Accepted,
    Rejected(TxRuleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAcceptance {
    pub transaction_id: TransactionId,
    pub index_within_block: u32,
    pub outcome: TxOutcome,
}

impl TxAcceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, TxOutcome::Accepted)
    }
}

/// Acceptance results for the transactions of one mergeset block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergesetBlockAcceptanceData {
    pub block_hash: Hash,
    pub transactions: Vec<TxAcceptance>,
}

impl MergesetBlockAcceptanceData {
    pub fn accepted_ids(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.transactions.iter().filter(|t| t.is_accepted()).map(|t| t.transaction_id)
    }
}

/// Per chain block: its mergeset in consensus order with the outcome of every transaction
pub type AcceptanceData = Vec<MergesetBlockAcceptanceData>;

/// Accepted transaction ids in consensus order
pub fn accepted_transaction_ids(data: &AcceptanceData) -> Vec<TransactionId> {
    data.iter().flat_map(|block| block.accepted_ids()).collect()
}
