//! Coinbase payload and payout rules
//!
//! The coinbase payload starts with the block's blue score (little-endian u64)
//! followed by arbitrary miner data. A block may pay at most the base subsidy
//! plus the fees of its own transactions.

use consensus_core::constants::{COINBASE_PAYLOAD_BLUE_SCORE_LEN, TX_VERSION};
use consensus_core::subnets::SUBNETWORK_ID_COINBASE;
use consensus_core::tx::{ScriptPublicKey, Transaction, TransactionOutput};

/// Coinbase construction and payout limits
#[derive(Debug, Clone, Copy)]
pub struct CoinbaseManager {
    base_subsidy: u64,
}

impl CoinbaseManager {
    pub fn new(base_subsidy: u64) -> Self {
        Self { base_subsidy }
    }

    pub fn serialize_coinbase_payload(blue_score: u64, extra_data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(COINBASE_PAYLOAD_BLUE_SCORE_LEN + extra_data.len());
        payload.extend_from_slice(&blue_score.to_le_bytes());
        payload.extend_from_slice(extra_data);
        payload
    }

    /// Blue score encoded in a coinbase payload, if the payload is long enough to carry one
    pub fn deserialize_blue_score(payload: &[u8]) -> Option<u64> {
        let bytes: [u8; COINBASE_PAYLOAD_BLUE_SCORE_LEN] = payload.get(..COINBASE_PAYLOAD_BLUE_SCORE_LEN)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    pub fn calc_max_coinbase_payout(&self, fees: u64) -> u64 {
        self.base_subsidy.saturating_add(fees)
    }

    /// Total paid by a coinbase, saturating on overflow
    pub fn coinbase_payout(coinbase: &Transaction) -> u64 {
        coinbase.outputs.iter().fold(0u64, |total, output| total.saturating_add(output.value))
    }

    /// A coinbase paying the maximum allowed amount to `script_public_key`
    pub fn build_coinbase(&self, blue_score: u64, fees: u64, script_public_key: ScriptPublicKey, extra_data: &[u8]) -> Transaction {
        let payout = self.calc_max_coinbase_payout(fees);
        let outputs = if payout > 0 { vec![TransactionOutput::new(payout, script_public_key)] } else { vec![] };
        Transaction::new(
            TX_VERSION,
            vec![],
            outputs,
            0,
            SUBNETWORK_ID_COINBASE,
            0,
            Self::serialize_coinbase_payload(blue_score, extra_data),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_blue_score() {
        let payload = CoinbaseManager::serialize_coinbase_payload(1234, b"miner");
        assert_eq!(payload.len(), 13);
        assert_eq!(CoinbaseManager::deserialize_blue_score(&payload), Some(1234));
        assert_eq!(CoinbaseManager::deserialize_blue_score(&payload[..7]), None);
    }

    #[test]
    fn coinbase_pays_subsidy_plus_fees() {
        let manager = CoinbaseManager::new(500);
        let spk = ScriptPublicKey::from_vec(0, vec![1]);
        let coinbase = manager.build_coinbase(7, 25, spk, &[]);
        assert!(coinbase.is_coinbase());
        assert_eq!(CoinbaseManager::coinbase_payout(&coinbase), 525);
        assert_eq!(CoinbaseManager::deserialize_blue_score(&coinbase.payload), Some(7));
        assert_eq!(manager.calc_max_coinbase_payout(u64::MAX), u64::MAX);
    }
}
