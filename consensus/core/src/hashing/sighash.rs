use super::sighash_type::SigHashType;
use super::{hash_outpoint, hash_script_public_key};
use crate::tx::{TransactionOutput, VerifiableTransaction};
use crate::{Hash, ZERO_HASH};
use crypto_hashes::hashers::{TransactionSigningHash, TransactionSigningHashECDSA};
use crypto_hashes::{HasherBase, HasherExtensions};

/// Holds all fields used in the calculation of a transaction's sig_hash which are
/// the same for all transaction inputs.
/// Reuse of such values prevents the quadratic hashing problem.
#[derive(Default)]
pub struct SigHashReusedValues {
    previous_outputs_hash: Option<Hash>,
    sequences_hash: Option<Hash>,
    sig_op_counts_hash: Option<Hash>,
    outputs_hash: Option<Hash>,
    payload_hash: Option<Hash>,
}

impl SigHashReusedValues {
    pub fn new() -> Self {
        Self::default()
    }
}

fn previous_outputs_hash(tx: &impl VerifiableTransaction, hash_type: SigHashType, reused: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return ZERO_HASH;
    }
    *reused.previous_outputs_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs().iter() {
            hash_outpoint(&mut hasher, &input.previous_outpoint);
        }
        hasher.finalize()
    })
}

fn sequences_hash(tx: &impl VerifiableTransaction, hash_type: SigHashType, reused: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_single() || hash_type.is_sighash_anyone_can_pay() || hash_type.is_sighash_none() {
        return ZERO_HASH;
    }
    *reused.sequences_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs().iter() {
            hasher.write_u64(input.sequence);
        }
        hasher.finalize()
    })
}

fn sig_op_counts_hash(tx: &impl VerifiableTransaction, hash_type: SigHashType, reused: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return ZERO_HASH;
    }
    *reused.sig_op_counts_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs().iter() {
            hasher.write_u8(input.sig_op_count);
        }
        hasher.finalize()
    })
}

fn payload_hash(tx: &impl VerifiableTransaction, reused: &mut SigHashReusedValues) -> Hash {
    let tx = tx.tx();
    if tx.subnetwork_id.is_native() && tx.payload.is_empty() {
        return ZERO_HASH;
    }
    *reused.payload_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        hasher.write_var_bytes(&tx.payload);
        hasher.finalize()
    })
}

fn outputs_hash(tx: &impl VerifiableTransaction, hash_type: SigHashType, reused: &mut SigHashReusedValues, input_index: usize) -> Hash {
    if hash_type.is_sighash_none() {
        return ZERO_HASH;
    }
    if hash_type.is_sighash_single() {
        // With no matching output the signature commits to no outputs at all
        return match tx.outputs().get(input_index) {
            Some(output) => {
                let mut hasher = TransactionSigningHash::new();
                hash_output(&mut hasher, output);
                hasher.finalize()
            }
            None => ZERO_HASH,
        };
    }
    *reused.outputs_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for output in tx.outputs().iter() {
            hash_output(&mut hasher, output);
        }
        hasher.finalize()
    })
}

fn hash_output(hasher: &mut impl HasherBase, output: &TransactionOutput) {
    hasher.write_u64(output.value);
    hash_script_public_key(hasher, &output.script_public_key);
}

/// Signature hash for Schnorr signatures over input `input_index`.
///
/// `input_index` must be a valid index into `tx.inputs()`.
pub fn calc_schnorr_signature_hash(
    tx: &impl VerifiableTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused: &mut SigHashReusedValues,
) -> Hash {
    let (input, utxo) = tx.populated_input(input_index);
    let mut hasher = TransactionSigningHash::new();
    hasher
        .write_u16(tx.tx().version)
        .update(previous_outputs_hash(tx, hash_type, reused))
        .update(sequences_hash(tx, hash_type, reused))
        .update(sig_op_counts_hash(tx, hash_type, reused));
    hash_outpoint(&mut hasher, &input.previous_outpoint);
    hash_script_public_key(&mut hasher, &utxo.script_public_key);
    hasher
        .write_u64(utxo.amount)
        .write_u64(input.sequence)
        .write_u8(input.sig_op_count)
        .update(outputs_hash(tx, hash_type, reused, input_index))
        .write_u64(tx.tx().lock_time)
        .update(tx.tx().subnetwork_id)
        .write_u64(tx.tx().gas)
        .update(payload_hash(tx, reused))
        .write_u8(hash_type.to_u8());
    hasher.finalize()
}

/// Signature hash for ECDSA signatures: the Schnorr sighash re-hashed under a SHA-256 domain
pub fn calc_ecdsa_signature_hash(
    tx: &impl VerifiableTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused: &mut SigHashReusedValues,
) -> Hash {
    let hash = calc_schnorr_signature_hash(tx, input_index, hash_type, reused);
    let mut hasher = TransactionSigningHashECDSA::new();
    hasher.update(hash);
    hasher.finalize()
}
