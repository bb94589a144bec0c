//! Transaction script interpreter.
//!
//! A script pair (signature script of the spending input, script public key of
//! the spent output) runs on a bounded stack machine. Every failure maps to a
//! single [`TxScriptError`] variant.

pub mod caches;
pub mod data_stack;
pub mod opcodes;
pub mod script_builder;
pub mod standard;

use caches::Cache;
use consensus_core::constants::{LOCK_TIME_THRESHOLD, MAX_TX_IN_SEQUENCE_NUM, SEQUENCE_LOCK_TIME_DISABLED, SEQUENCE_LOCK_TIME_MASK};
use consensus_core::hashing::sighash::{calc_ecdsa_signature_hash, calc_schnorr_signature_hash, SigHashReusedValues};
use consensus_core::hashing::sighash_type::SigHashType;
use consensus_core::tx::{UtxoEntry, VerifiableTransaction};
use consensus_core::Hash;
use data_stack::{as_bool, DataStack, Stack, LOCK_TIME_SCRIPT_NUM_LEN};
use once_cell::sync::Lazy;
use opcodes::*;
use secp256k1::{ecdsa, schnorr, Message, PublicKey, Secp256k1, VerifyOnly, XOnlyPublicKey};
use std::sync::Arc;

pub use jio_txscript_errors::TxScriptError;

pub const MAX_SCRIPTS_SIZE: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_OPS_PER_SCRIPT: usize = 201;
pub const MAX_STACK_SIZE: usize = 244;
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

/// 64 signature bytes plus the sighash type
pub const SIGNATURE_LEN: usize = 65;
pub const SCHNORR_PUB_KEY_LEN: usize = 32;
pub const ECDSA_PUB_KEY_LEN: usize = 33;

/// Enforce `OP_CHECKLOCKTIMEVERIFY`; without it the opcode is a no-op
pub const SCRIPT_VERIFY_CHECK_LOCK_TIME: u32 = 1 << 0;
/// Enforce `OP_CHECKSEQUENCEVERIFY`; without it the opcode is a no-op
pub const SCRIPT_VERIFY_CHECK_SEQUENCE: u32 = 1 << 1;
/// Evaluate the redeem script of pay-to-script-hash outputs
pub const SCRIPT_VERIFY_P2SH: u32 = 1 << 2;

pub const SCRIPT_FLAGS_MASK: u32 = SCRIPT_VERIFY_CHECK_LOCK_TIME | SCRIPT_VERIFY_CHECK_SEQUENCE | SCRIPT_VERIFY_P2SH;
/// Flags every consensus validation runs with
pub const CONSENSUS_SCRIPT_FLAGS: u32 = SCRIPT_FLAGS_MASK;

static SECP: Lazy<Secp256k1<VerifyOnly>> = Lazy::new(Secp256k1::verification_only);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SigCacheKey {
    pub signature: Vec<u8>,
    pub pub_key: Vec<u8>,
    pub message: Hash,
}

pub type SigCache = Cache<SigCacheKey, bool>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpCond {
    False,
    True,
    Skip,
}

#[derive(Clone, Copy)]
enum SigScheme {
    Schnorr,
    Ecdsa,
}

pub struct TxScriptEngine<'a, T: VerifiableTransaction> {
    dstack: Stack,
    astack: Stack,

    tx: &'a T,
    input_index: usize,
    utxo_entry: &'a UtxoEntry,
    sig_cache: &'a SigCache,
    reused_values: SigHashReusedValues,
    flags: u32,

    scripts: Vec<Arc<Vec<ParsedOpcode>>>,
    script_index: usize,
    op_index: usize,
    cond_stack: Vec<OpCond>,
    num_ops: usize,

    is_p2sh: bool,
    saved_first_stack: Stack,
    finished: bool,
}

impl<'a, T: VerifiableTransaction> TxScriptEngine<'a, T> {
    /// Prepares the scripts of input `input_index` of `tx` for execution
    pub fn from_transaction_input(tx: &'a T, input_index: usize, sig_cache: &'a SigCache, flags: u32) -> Result<Self, TxScriptError> {
        if flags & !SCRIPT_FLAGS_MASK != 0 {
            return Err(TxScriptError::InvalidFlags(flags));
        }
        let inputs = tx.inputs().len();
        let utxo_entry = match tx.utxo(input_index) {
            Some(entry) if input_index < inputs => entry,
            _ => return Err(TxScriptError::InvalidIndex(input_index, inputs)),
        };
        let signature_script = &tx.inputs()[input_index].signature_script;
        let script_public_key = utxo_entry.script_public_key.script();

        let mut scripts = Vec::with_capacity(3);
        for script in [signature_script.as_slice(), script_public_key] {
            if script.len() > MAX_SCRIPTS_SIZE {
                return Err(TxScriptError::ScriptTooBig(script.len(), MAX_SCRIPTS_SIZE));
            }
            scripts.push(Arc::new(parse_script(script)?));
        }
        if !scripts[0].iter().all(|op| op.is_push()) {
            return Err(TxScriptError::NotPushOnly);
        }
        let is_p2sh = flags & SCRIPT_VERIFY_P2SH != 0 && standard::is_pay_to_script_hash(script_public_key);

        Ok(Self {
            dstack: Vec::new(),
            astack: Vec::new(),
            tx,
            input_index,
            utxo_entry,
            sig_cache,
            reused_values: SigHashReusedValues::new(),
            flags,
            scripts,
            script_index: 0,
            op_index: 0,
            cond_stack: Vec::new(),
            num_ops: 0,
            is_p2sh,
            saved_first_stack: Vec::new(),
            finished: false,
        })
    }

    /// Runs every script to completion and checks the final stack
    pub fn execute(&mut self) -> Result<(), TxScriptError> {
        if self.scripts.iter().all(|script| script.is_empty()) {
            return Err(TxScriptError::EvalFalse);
        }
        while !self.step()? {}
        self.check_error_condition(true)
    }

    /// Executes a single opcode. Returns `true` once the last script is done.
    pub fn step(&mut self) -> Result<bool, TxScriptError> {
        if self.finished || self.script_index >= self.scripts.len() {
            return Err(TxScriptError::InvalidProgramCounter);
        }
        let script = self.scripts[self.script_index].clone();
        if let Some(op) = script.get(self.op_index) {
            self.execute_opcode(op)?;
            let depth = self.dstack.len() + self.astack.len();
            if depth > MAX_STACK_SIZE {
                return Err(TxScriptError::StackOverflow(depth, MAX_STACK_SIZE));
            }
            self.op_index += 1;
            if self.op_index < script.len() {
                return Ok(false);
            }
        }
        self.end_of_script()?;
        Ok(self.finished)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current data stack, bottom first
    pub fn data_stack(&self) -> &[Vec<u8>] {
        &self.dstack
    }

    fn end_of_script(&mut self) -> Result<(), TxScriptError> {
        if !self.cond_stack.is_empty() {
            return Err(TxScriptError::UnbalancedConditional);
        }
        self.astack.clear();
        self.num_ops = 0;

        if self.is_p2sh && self.script_index == 0 {
            self.saved_first_stack = self.dstack.clone();
        } else if self.is_p2sh && self.script_index == 1 {
            self.check_error_condition(false)?;
            let mut stack = std::mem::take(&mut self.saved_first_stack);
            let redeem_script = stack.pop_item()?;
            if redeem_script.len() > MAX_SCRIPTS_SIZE {
                return Err(TxScriptError::ScriptTooBig(redeem_script.len(), MAX_SCRIPTS_SIZE));
            }
            self.scripts.push(Arc::new(parse_script(&redeem_script)?));
            self.dstack = stack;
        }

        self.script_index += 1;
        self.op_index = 0;
        if self.script_index >= self.scripts.len() {
            self.finished = true;
        }
        Ok(())
    }

    fn check_error_condition(&mut self, final_script: bool) -> Result<(), TxScriptError> {
        if final_script {
            if !self.finished {
                return Err(TxScriptError::ScriptUnfinished);
            }
            if self.dstack.len() > 1 {
                return Err(TxScriptError::CleanStack(self.dstack.len() - 1));
            }
        }
        if self.dstack.is_empty() {
            return Err(TxScriptError::EmptyStack);
        }
        if !self.dstack.pop_bool()? {
            return Err(TxScriptError::EvalFalse);
        }
        Ok(())
    }

    fn is_executing(&self) -> bool {
        self.cond_stack.last().map_or(true, |cond| *cond == OpCond::True)
    }

    fn execute_opcode(&mut self, op: &ParsedOpcode) -> Result<(), TxScriptError> {
        if op.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(TxScriptError::ElementTooBig(op.data.len(), MAX_SCRIPT_ELEMENT_SIZE));
        }
        if op.value > OP_16 {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(TxScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
            }
        }
        if is_disabled(op.value) {
            return Err(TxScriptError::DisabledOpcode(op.name()));
        }
        if is_always_illegal(op.value) {
            return Err(TxScriptError::ReservedOpcode(op.name()));
        }
        let executing = self.is_executing();
        if !executing && !is_conditional(op.value) {
            return Ok(());
        }
        if op.value <= OP_PUSHDATA4 {
            op.check_minimal_data_push()?;
            self.dstack.push(op.data.clone());
            return Ok(());
        }

        match op.value {
            OP_1NEGATE => self.dstack.push_num(-1),
            OP_1..=OP_16 => self.dstack.push_num((op.value - OP_1 + 1) as i64),

            OP_NOP => {}
            OP_IF | OP_NOTIF => {
                let cond = if executing {
                    let item = self.dstack.pop_item()?;
                    if item.len() > 1 || (item.len() == 1 && item[0] != 1) {
                        return Err(TxScriptError::MinimalIf);
                    }
                    let truthy = as_bool(&item);
                    if truthy == (op.value == OP_IF) {
                        OpCond::True
                    } else {
                        OpCond::False
                    }
                } else {
                    OpCond::Skip
                };
                self.cond_stack.push(cond);
            }
            OP_ELSE => match self.cond_stack.last_mut() {
                Some(cond) => {
                    *cond = match *cond {
                        OpCond::True => OpCond::False,
                        OpCond::False => OpCond::True,
                        OpCond::Skip => OpCond::Skip,
                    }
                }
                None => return Err(TxScriptError::UnbalancedConditional),
            },
            OP_ENDIF => {
                if self.cond_stack.pop().is_none() {
                    return Err(TxScriptError::UnbalancedConditional);
                }
            }
            OP_VERIFY => {
                if !self.dstack.pop_bool()? {
                    return Err(TxScriptError::VerifyFailed);
                }
            }
            OP_RETURN => return Err(TxScriptError::EarlyReturn),

            OP_TOALTSTACK => {
                let item = self.dstack.pop_item()?;
                self.astack.push(item);
            }
            OP_FROMALTSTACK => {
                let item = self.astack.pop().ok_or(TxScriptError::InvalidStackOperation(1, 0))?;
                self.dstack.push(item);
            }
            OP_2DROP => {
                self.dstack.pop_items::<2>()?;
            }
            OP_2DUP => {
                let [a, b] = self.dstack.pop_items::<2>()?;
                self.dstack.extend([a.clone(), b.clone(), a, b]);
            }
            OP_3DUP => {
                let [a, b, c] = self.dstack.pop_items::<3>()?;
                self.dstack.extend([a.clone(), b.clone(), c.clone(), a, b, c]);
            }
            OP_2OVER => {
                let [a, b, c, d] = self.dstack.pop_items::<4>()?;
                self.dstack.extend([a.clone(), b.clone(), c, d, a, b]);
            }
            OP_2ROT => {
                let [a, b, c, d, e, f] = self.dstack.pop_items::<6>()?;
                self.dstack.extend([c, d, e, f, a, b]);
            }
            OP_2SWAP => {
                let [a, b, c, d] = self.dstack.pop_items::<4>()?;
                self.dstack.extend([c, d, a, b]);
            }
            OP_IFDUP => {
                let top = self.dstack.peek_item(0)?.clone();
                if as_bool(&top) {
                    self.dstack.push(top);
                }
            }
            OP_DEPTH => {
                let depth = self.dstack.len() as i64;
                self.dstack.push_num(depth);
            }
            OP_DROP => {
                self.dstack.pop_item()?;
            }
            OP_DUP => {
                let top = self.dstack.peek_item(0)?.clone();
                self.dstack.push(top);
            }
            OP_NIP => {
                let [_, b] = self.dstack.pop_items::<2>()?;
                self.dstack.push(b);
            }
            OP_OVER => {
                let second = self.dstack.peek_item(1)?.clone();
                self.dstack.push(second);
            }
            OP_PICK | OP_ROLL => {
                let n = self.dstack.pop_num()?;
                if n < 0 || n as usize >= self.dstack.len() {
                    return Err(TxScriptError::InvalidStackOperation(n.max(0) as usize + 1, self.dstack.len()));
                }
                let index = self.dstack.len() - 1 - n as usize;
                let item = if op.value == OP_PICK { self.dstack[index].clone() } else { self.dstack.remove(index) };
                self.dstack.push(item);
            }
            OP_ROT => {
                let [a, b, c] = self.dstack.pop_items::<3>()?;
                self.dstack.extend([b, c, a]);
            }
            OP_SWAP => {
                let [a, b] = self.dstack.pop_items::<2>()?;
                self.dstack.extend([b, a]);
            }
            OP_TUCK => {
                let [a, b] = self.dstack.pop_items::<2>()?;
                self.dstack.extend([b.clone(), a, b]);
            }

            OP_SIZE => {
                let size = self.dstack.peek_item(0)?.len() as i64;
                self.dstack.push_num(size);
            }
            OP_EQUAL | OP_EQUALVERIFY => {
                let [a, b] = self.dstack.pop_items::<2>()?;
                let equal = a == b;
                if op.value == OP_EQUALVERIFY {
                    if !equal {
                        return Err(TxScriptError::EqualVerifyFailed);
                    }
                } else {
                    self.dstack.push_bool(equal);
                }
            }

            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                let n = self.dstack.pop_num()?;
                let result = match op.value {
                    OP_1ADD => n + 1,
                    OP_1SUB => n - 1,
                    OP_NEGATE => -n,
                    OP_ABS => n.abs(),
                    OP_NOT => (n == 0) as i64,
                    _ => (n != 0) as i64,
                };
                self.dstack.push_num(result);
            }
            OP_ADD | OP_SUB | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL | OP_NUMNOTEQUAL | OP_LESSTHAN | OP_GREATERTHAN
            | OP_LESSTHANOREQUAL | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => {
                let [a, b] = self.dstack.pop_nums::<2>()?;
                let result = match op.value {
                    OP_ADD => a + b,
                    OP_SUB => a - b,
                    OP_BOOLAND => (a != 0 && b != 0) as i64,
                    OP_BOOLOR => (a != 0 || b != 0) as i64,
                    OP_NUMEQUAL => (a == b) as i64,
                    OP_NUMNOTEQUAL => (a != b) as i64,
                    OP_LESSTHAN => (a < b) as i64,
                    OP_GREATERTHAN => (a > b) as i64,
                    OP_LESSTHANOREQUAL => (a <= b) as i64,
                    OP_GREATERTHANOREQUAL => (a >= b) as i64,
                    OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                self.dstack.push_num(result);
            }
            OP_NUMEQUALVERIFY => {
                let [a, b] = self.dstack.pop_nums::<2>()?;
                if a != b {
                    return Err(TxScriptError::NumEqualVerifyFailed);
                }
            }
            OP_WITHIN => {
                let [x, min, max] = self.dstack.pop_nums::<3>()?;
                self.dstack.push_bool(min <= x && x < max);
            }

            OP_SHA256 => {
                let item = self.dstack.pop_item()?;
                self.dstack.push(crypto_hashes::sha256(&item).to_vec());
            }
            OP_BLAKE2B => {
                let item = self.dstack.pop_item()?;
                self.dstack.push(standard::blake2b_256(&item).to_vec());
            }
            OP_CHECKSIG | OP_CHECKSIGVERIFY | OP_CHECKSIGECDSA => {
                let [signature, pub_key] = self.dstack.pop_items::<2>()?;
                let scheme = if op.value == OP_CHECKSIGECDSA { SigScheme::Ecdsa } else { SigScheme::Schnorr };
                let valid = self.check_signature(scheme, &signature, &pub_key)?;
                if !valid && !signature.is_empty() {
                    return Err(TxScriptError::NullFail);
                }
                if op.value == OP_CHECKSIGVERIFY {
                    if !valid {
                        return Err(TxScriptError::CheckSigVerifyFailed);
                    }
                } else {
                    self.dstack.push_bool(valid);
                }
            }
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY | OP_CHECKMULTISIGECDSA => {
                let scheme = if op.value == OP_CHECKMULTISIGECDSA { SigScheme::Ecdsa } else { SigScheme::Schnorr };
                let valid = self.check_multisig(scheme)?;
                if op.value == OP_CHECKMULTISIGVERIFY {
                    if !valid {
                        return Err(TxScriptError::CheckMultiSigVerifyFailed);
                    }
                } else {
                    self.dstack.push_bool(valid);
                }
            }
            OP_CHECKLOCKTIMEVERIFY => {
                if self.flags & SCRIPT_VERIFY_CHECK_LOCK_TIME != 0 {
                    self.check_lock_time()?;
                }
            }
            OP_CHECKSEQUENCEVERIFY => {
                if self.flags & SCRIPT_VERIFY_CHECK_SEQUENCE != 0 {
                    self.check_sequence()?;
                }
            }

            _ => return Err(TxScriptError::ReservedOpcode(op.name())),
        }
        Ok(())
    }

    fn check_signature(&mut self, scheme: SigScheme, signature: &[u8], pub_key: &[u8]) -> Result<bool, TxScriptError> {
        if signature.is_empty() {
            return Ok(false);
        }
        if signature.len() != SIGNATURE_LEN {
            return Err(TxScriptError::SigLength(signature.len()));
        }
        let (sig_bytes, hash_type_byte) = signature.split_at(SIGNATURE_LEN - 1);
        let hash_type = SigHashType::from_u8(hash_type_byte[0]).ok_or(TxScriptError::InvalidSigHashType(hash_type_byte[0]))?;

        match scheme {
            SigScheme::Schnorr => {
                if pub_key.len() != SCHNORR_PUB_KEY_LEN {
                    return Err(TxScriptError::PubKeyFormat);
                }
                let key = XOnlyPublicKey::from_slice(pub_key).map_err(|_| TxScriptError::PubKeyFormat)?;
                let sig_hash = calc_schnorr_signature_hash(self.tx, self.input_index, hash_type, &mut self.reused_values);
                let cache_key = SigCacheKey { signature: sig_bytes.to_vec(), pub_key: pub_key.to_vec(), message: sig_hash };
                if let Some(valid) = self.sig_cache.get(&cache_key) {
                    return Ok(valid);
                }
                let valid = match (schnorr::Signature::from_slice(sig_bytes), Message::from_slice(sig_hash.as_bytes())) {
                    (Ok(sig), Ok(msg)) => SECP.verify_schnorr(&sig, &msg, &key).is_ok(),
                    _ => false,
                };
                self.sig_cache.insert(cache_key, valid);
                Ok(valid)
            }
            SigScheme::Ecdsa => {
                if pub_key.len() != ECDSA_PUB_KEY_LEN {
                    return Err(TxScriptError::PubKeyFormat);
                }
                let key = PublicKey::from_slice(pub_key).map_err(|_| TxScriptError::PubKeyFormat)?;
                let sig = match ecdsa::Signature::from_compact(sig_bytes) {
                    Ok(sig) => sig,
                    Err(_) => return Ok(false),
                };
                let mut normalized = sig;
                normalized.normalize_s();
                if normalized != sig {
                    return Err(TxScriptError::SigHighS);
                }
                let sig_hash = calc_ecdsa_signature_hash(self.tx, self.input_index, hash_type, &mut self.reused_values);
                let cache_key = SigCacheKey { signature: sig_bytes.to_vec(), pub_key: pub_key.to_vec(), message: sig_hash };
                if let Some(valid) = self.sig_cache.get(&cache_key) {
                    return Ok(valid);
                }
                let valid = match Message::from_slice(sig_hash.as_bytes()) {
                    Ok(msg) => SECP.verify_ecdsa(&msg, &sig, &key).is_ok(),
                    Err(_) => false,
                };
                self.sig_cache.insert(cache_key, valid);
                Ok(valid)
            }
        }
    }

    /// Stack layout: `<sig_1> .. <sig_m> <m> <key_1> .. <key_n> <n>`
    fn check_multisig(&mut self, scheme: SigScheme) -> Result<bool, TxScriptError> {
        let num_keys = self.dstack.pop_num()?;
        if num_keys < 0 || num_keys as usize > MAX_PUB_KEYS_PER_MULTISIG {
            return Err(TxScriptError::InvalidPubKeyCount(format!("number of pubkeys {num_keys} is not in 0..={MAX_PUB_KEYS_PER_MULTISIG}")));
        }
        let num_keys = num_keys as usize;
        self.num_ops += num_keys;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(TxScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
        }
        self.dstack.require(num_keys)?;
        let pub_keys = self.dstack.split_off(self.dstack.len() - num_keys);

        let num_sigs = self.dstack.pop_num()?;
        if num_sigs < 0 || num_sigs as usize > num_keys {
            return Err(TxScriptError::InvalidSignatureCount(format!("number of signatures {num_sigs} is not in 0..={num_keys}")));
        }
        let num_sigs = num_sigs as usize;
        self.dstack.require(num_sigs)?;
        let signatures = self.dstack.split_off(self.dstack.len() - num_sigs);

        let mut failed = false;
        let mut keys = pub_keys.iter();
        'sigs: for (sig_index, signature) in signatures.iter().enumerate() {
            if signature.is_empty() {
                failed = true;
                break;
            }
            // keys are consumed in order; the remaining keys must still cover the remaining signatures
            loop {
                if keys.len() < num_sigs - sig_index {
                    failed = true;
                    break 'sigs;
                }
                let Some(key) = keys.next() else {
                    failed = true;
                    break 'sigs;
                };
                if self.check_signature(scheme, signature, key)? {
                    break;
                }
            }
        }
        if failed && signatures.iter().any(|sig| !sig.is_empty()) {
            return Err(TxScriptError::NullFail);
        }
        Ok(!failed)
    }

    fn check_lock_time(&self) -> Result<(), TxScriptError> {
        let lock_time = self.dstack.peek_num(LOCK_TIME_SCRIPT_NUM_LEN)?;
        if lock_time < 0 {
            return Err(TxScriptError::NegativeLockTime(lock_time));
        }
        let lock_time = lock_time as u64;
        let tx_lock_time = self.tx.tx().lock_time;
        if (tx_lock_time < LOCK_TIME_THRESHOLD) != (lock_time < LOCK_TIME_THRESHOLD) {
            return Err(TxScriptError::UnsatisfiedLockTime(format!(
                "mismatched lock time types: transaction {tx_lock_time}, script {lock_time}"
            )));
        }
        if lock_time > tx_lock_time {
            return Err(TxScriptError::UnsatisfiedLockTime(format!("lock time {lock_time} is later than transaction lock time {tx_lock_time}")));
        }
        if self.tx.inputs()[self.input_index].sequence == MAX_TX_IN_SEQUENCE_NUM {
            return Err(TxScriptError::UnsatisfiedLockTime("transaction input is finalized".into()));
        }
        Ok(())
    }

    fn check_sequence(&self) -> Result<(), TxScriptError> {
        let sequence = self.dstack.peek_num(LOCK_TIME_SCRIPT_NUM_LEN)?;
        if sequence < 0 {
            return Err(TxScriptError::NegativeLockTime(sequence));
        }
        let sequence = sequence as u64;
        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }
        let tx_sequence = self.tx.inputs()[self.input_index].sequence;
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(TxScriptError::UnsatisfiedLockTime(format!("transaction sequence {tx_sequence:#x} has relative lock time disabled")));
        }
        if sequence & SEQUENCE_LOCK_TIME_MASK > tx_sequence & SEQUENCE_LOCK_TIME_MASK {
            return Err(TxScriptError::UnsatisfiedLockTime(format!(
                "relative lock time {} is later than transaction sequence {}",
                sequence & SEQUENCE_LOCK_TIME_MASK,
                tx_sequence & SEQUENCE_LOCK_TIME_MASK
            )));
        }
        Ok(())
    }

    pub fn utxo_entry(&self) -> &UtxoEntry {
        self.utxo_entry
    }
}

#[cfg(test)]
mod tests;
