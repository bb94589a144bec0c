use crate::acceptance_data::AcceptanceData;
use crate::ghostdag::GhostdagData;
use crate::tx::TransactionId;
use crate::utxo::UtxoDiff;
use crate::Hash;
use jio_multiset::{EcMultiset, MultisetError, SerializedMultiset};
use serde::{Deserialize, Serialize};

/// State of the synthetic block whose parents are the current DAG tips
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualState {
    pub parents: Vec<Hash>,
    pub ghostdag_data: GhostdagData,
    /// UTXO changes from the virtual selected parent's set to the virtual set
    pub utxo_diff: UtxoDiff,
    multiset: SerializedMultiset,
    /// Multiset hash of the virtual UTXO set
    pub utxo_commitment: Hash,
    pub accepted_tx_ids: Vec<TransactionId>,
    pub mergeset_acceptance: AcceptanceData,
    pub past_median_time: u64,
}

impl VirtualState {
    pub fn new(
        parents: Vec<Hash>,
        ghostdag_data: GhostdagData,
        utxo_diff: UtxoDiff,
        multiset: &EcMultiset,
        accepted_tx_ids: Vec<TransactionId>,
        mergeset_acceptance: AcceptanceData,
        past_median_time: u64,
    ) -> Self {
        Self {
            parents,
            ghostdag_data,
            utxo_diff,
            multiset: multiset.serialize(),
            utxo_commitment: multiset.finalize(),
            accepted_tx_ids,
            mergeset_acceptance,
            past_median_time,
        }
    }

    pub fn selected_parent(&self) -> Hash {
        self.ghostdag_data.selected_parent
    }

    pub fn multiset(&self) -> Result<EcMultiset, MultisetError> {
        EcMultiset::deserialize(self.multiset)
    }
}
