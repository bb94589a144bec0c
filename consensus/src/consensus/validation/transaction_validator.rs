//! Transaction validation
//!
//! Two stages:
//! - in isolation: structure, value ranges, subnetwork and coinbase shape
//! - in UTXO context: lock time, coinbase maturity, fees, sig op counts and scripts
//!
//! Script execution is spread over a bounded pool of scoped worker threads.

use consensus_core::config::ConsensusConfig;
use consensus_core::constants::{COINBASE_PAYLOAD_BLUE_SCORE_LEN, LOCK_TIME_THRESHOLD, MAX_SOMPI, MAX_TX_IN_SEQUENCE_NUM, TX_VERSION};
use consensus_core::errors::{TxResult, TxRuleError};
use consensus_core::mass::MassCalculator;
use consensus_core::tx::{PopulatedTransaction, Transaction, VerifiableTransaction};
use jio_txscript::standard::get_sig_op_count;
use jio_txscript::{SigCache, TxScriptEngine, TxScriptError, CONSENSUS_SCRIPT_FLAGS};
use parking_lot::RwLock;
use std::collections::HashSet;

/// Transaction rules as the block pipeline sees them
pub trait TransactionValidator: Send + Sync {
    fn validate_tx_in_isolation(&self, tx: &Transaction) -> TxResult<()>;

    /// Context checks against the entries `tx` spends, returning the fee. `pov_blue_score` and
    /// `pov_past_median_time` describe the block the transaction is validated for.
    fn validate_populated_transaction_and_get_fee(
        &self,
        tx: &PopulatedTransaction,
        pov_blue_score: u64,
        pov_past_median_time: u64,
    ) -> TxResult<u64>;

    fn calc_tx_mass(&self, tx: &Transaction) -> u64;
}

/// Test capabilities on top of [`TransactionValidator`]: direct access to the signature cache
pub trait TestTransactionValidator: TransactionValidator {
    fn sig_cache(&self) -> SigCache;

    /// Swaps the cache used by later script checks
    fn replace_sig_cache(&self, cache: SigCache);

    fn script_workers(&self) -> usize;
}

pub struct TxValidator {
    max_tx_inputs: usize,
    max_tx_outputs: usize,
    max_coinbase_payload_len: usize,
    coinbase_maturity: u64,
    mass_calculator: MassCalculator,
    sig_cache: RwLock<SigCache>,
    script_workers: usize,
}

impl TxValidator {
    pub fn new(config: &ConsensusConfig) -> Self {
        let script_workers = match config.script_verification_workers {
            0 => num_cpus::get(),
            workers => workers,
        };
        Self {
            max_tx_inputs: config.max_tx_inputs,
            max_tx_outputs: config.max_tx_outputs,
            max_coinbase_payload_len: config.max_coinbase_payload_len,
            coinbase_maturity: config.coinbase_maturity,
            mass_calculator: MassCalculator::new(config.mass_per_tx_byte, config.mass_per_script_pub_key_byte, config.mass_per_sig_op),
            sig_cache: RwLock::new(SigCache::new(config.sig_cache_size)),
            script_workers: script_workers.max(1),
        }
    }

    fn check_coinbase_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        if !tx.inputs.is_empty() {
            return Err(TxRuleError::CoinbaseHasInputs(tx.inputs.len()));
        }
        if tx.payload.len() < COINBASE_PAYLOAD_BLUE_SCORE_LEN {
            return Err(TxRuleError::CoinbasePayloadTooShort(tx.payload.len(), COINBASE_PAYLOAD_BLUE_SCORE_LEN));
        }
        if tx.payload.len() > self.max_coinbase_payload_len {
            return Err(TxRuleError::CoinbasePayloadTooLong(tx.payload.len(), self.max_coinbase_payload_len));
        }
        Ok(())
    }

    fn check_outputs(&self, tx: &Transaction) -> TxResult<()> {
        if tx.outputs.len() > self.max_tx_outputs {
            return Err(TxRuleError::TooManyOutputs(tx.outputs.len(), self.max_tx_outputs));
        }
        let mut total: u64 = 0;
        for (i, output) in tx.outputs.iter().enumerate() {
            if output.value == 0 {
                return Err(TxRuleError::TxOutZero(i));
            }
            if output.value > MAX_SOMPI {
                return Err(TxRuleError::TxOutTooHigh(i));
            }
            total = total.checked_add(output.value).ok_or(TxRuleError::OutputsValueOverflow)?;
        }
        if total > MAX_SOMPI {
            return Err(TxRuleError::OutputsValueOverflow);
        }
        Ok(())
    }

    fn check_lock_time(tx: &Transaction, pov_blue_score: u64, pov_past_median_time: u64) -> TxResult<()> {
        if tx.lock_time == 0 {
            return Ok(());
        }
        // below the threshold lock time is a blue score, above it a timestamp
        let pov = if tx.lock_time < LOCK_TIME_THRESHOLD { pov_blue_score } else { pov_past_median_time };
        if tx.lock_time < pov {
            return Ok(());
        }
        if tx.inputs.iter().all(|input| input.sequence == MAX_TX_IN_SEQUENCE_NUM) {
            return Ok(());
        }
        Err(TxRuleError::NotFinalized(tx.lock_time))
    }

    fn check_coinbase_maturity(&self, tx: &PopulatedTransaction, pov_blue_score: u64) -> TxResult<()> {
        for (i, (input, entry)) in tx.populated_inputs().enumerate() {
            if !entry.is_coinbase {
                continue;
            }
            let mature_at = entry.block_blue_score.saturating_add(self.coinbase_maturity);
            if pov_blue_score < mature_at {
                return Err(TxRuleError::ImmatureCoinbaseSpend(i, input.previous_outpoint, entry.block_blue_score, mature_at));
            }
        }
        Ok(())
    }

    fn check_fee(tx: &PopulatedTransaction) -> TxResult<u64> {
        let mut total_in: u64 = 0;
        for (_, entry) in tx.populated_inputs() {
            total_in = total_in.checked_add(entry.amount).ok_or(TxRuleError::InputsValueOverflow)?;
        }
        let total_out = tx.outputs().iter().try_fold(0u64, |sum, output| sum.checked_add(output.value));
        let total_out = total_out.ok_or(TxRuleError::OutputsValueOverflow)?;
        if total_in < total_out {
            return Err(TxRuleError::SpendTooHigh(total_in, total_out));
        }
        Ok(total_in - total_out)
    }

    fn check_sig_op_counts(tx: &PopulatedTransaction) -> TxResult<()> {
        for (i, (input, entry)) in tx.populated_inputs().enumerate() {
            let executed = get_sig_op_count(&input.signature_script, &entry.script_public_key);
            if executed != input.sig_op_count as u64 {
                return Err(TxRuleError::WrongSigOpCount(i, input.sig_op_count, executed));
            }
        }
        Ok(())
    }

    fn verify_input(tx: &PopulatedTransaction, index: usize, sig_cache: &SigCache) -> Result<(), TxScriptError> {
        TxScriptEngine::from_transaction_input(tx, index, sig_cache, CONSENSUS_SCRIPT_FLAGS)?.execute()
    }

    /// Runs every input script, reporting the failure with the lowest input index
    fn check_scripts(&self, tx: &PopulatedTransaction) -> TxResult<()> {
        let inputs = tx.inputs().len();
        let sig_cache = self.sig_cache.read().clone();
        let workers = self.script_workers.min(inputs);
        if workers <= 1 {
            for index in 0..inputs {
                Self::verify_input(tx, index, &sig_cache).map_err(|err| TxRuleError::SignatureInvalid(index, err))?;
            }
            return Ok(());
        }

        // worker `w` checks inputs w, w + workers, ...; its first failure is its lowest
        let failures: Vec<Option<(usize, TxScriptError)>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let sig_cache = &sig_cache;
                    scope.spawn(move || {
                        (worker..inputs)
                            .step_by(workers)
                            .find_map(|index| Self::verify_input(tx, index, sig_cache).err().map(|err| (index, err)))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(failure) => failure,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        match failures.into_iter().flatten().min_by_key(|(index, _)| *index) {
            Some((index, err)) => Err(TxRuleError::SignatureInvalid(index, err)),
            None => Ok(()),
        }
    }
}

impl TransactionValidator for TxValidator {
    fn validate_tx_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        if tx.version != TX_VERSION {
            return Err(TxRuleError::UnknownTxVersion(tx.version));
        }
        if tx.is_coinbase() {
            self.check_coinbase_in_isolation(tx)?;
            return self.check_outputs(tx);
        }

        if tx.inputs.is_empty() {
            return Err(TxRuleError::NoTxInputs);
        }
        if tx.outputs.is_empty() {
            return Err(TxRuleError::NoTxOutputs);
        }
        if tx.inputs.len() > self.max_tx_inputs {
            return Err(TxRuleError::TooManyInputs(tx.inputs.len(), self.max_tx_inputs));
        }
        self.check_outputs(tx)?;

        let mut outpoints = HashSet::with_capacity(tx.inputs.len());
        for input in tx.inputs.iter() {
            if !outpoints.insert(input.previous_outpoint) {
                return Err(TxRuleError::TxDuplicateInputs(input.previous_outpoint));
            }
        }

        if !tx.subnetwork_id.is_native() {
            return Err(TxRuleError::SubnetworkNotAllowed(tx.subnetwork_id));
        }
        if tx.gas != 0 {
            return Err(TxRuleError::TxHasGas(tx.gas));
        }
        Ok(())
    }

    fn validate_populated_transaction_and_get_fee(
        &self,
        tx: &PopulatedTransaction,
        pov_blue_score: u64,
        pov_past_median_time: u64,
    ) -> TxResult<u64> {
        Self::check_lock_time(tx.tx, pov_blue_score, pov_past_median_time)?;
        self.check_coinbase_maturity(tx, pov_blue_score)?;
        let fee = Self::check_fee(tx)?;
        Self::check_sig_op_counts(tx)?;
        self.check_scripts(tx)?;
        Ok(fee)
    }

    fn calc_tx_mass(&self, tx: &Transaction) -> u64 {
        self.mass_calculator.calc_tx_mass(tx)
    }
}

impl TestTransactionValidator for TxValidator {
    fn sig_cache(&self) -> SigCache {
        self.sig_cache.read().clone()
    }

    fn replace_sig_cache(&self, cache: SigCache) {
        *self.sig_cache.write() = cache;
    }

    fn script_workers(&self) -> usize {
        self.script_workers
    }
}
