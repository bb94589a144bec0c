//! Builders and classifiers for the standard script forms.

use crate::opcodes::*;
use crate::script_builder::ScriptBuilder;
use crate::MAX_PUB_KEYS_PER_MULTISIG;
use consensus_core::tx::ScriptPublicKey;
use jio_txscript_errors::TxScriptError;

/// BLAKE2b-256 as computed by `OP_BLAKE2B`
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new().hash_length(32).hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Pay to a Schnorr x-only public key
pub fn pay_to_pub_key(pub_key: &[u8; 32]) -> ScriptPublicKey {
    let script = ScriptBuilder::new().add_data(pub_key).add_op(OP_CHECKSIG).drain();
    ScriptPublicKey::from_vec(0, script)
}

/// Pay to a compressed ECDSA public key
pub fn pay_to_pub_key_ecdsa(pub_key: &[u8; 33]) -> ScriptPublicKey {
    let script = ScriptBuilder::new().add_data(pub_key).add_op(OP_CHECKSIGECDSA).drain();
    ScriptPublicKey::from_vec(0, script)
}

pub fn pay_to_script_hash_script(redeem_script: &[u8]) -> ScriptPublicKey {
    let script = ScriptBuilder::new().add_op(OP_BLAKE2B).add_data(&blake2b_256(redeem_script)).add_op(OP_EQUAL).drain();
    ScriptPublicKey::from_vec(0, script)
}

/// Appends the redeem script push to the pushes satisfying it
pub fn pay_to_script_hash_signature_script(redeem_script: &[u8], signature_pushes: &[u8]) -> Vec<u8> {
    let mut script = signature_pushes.to_vec();
    script.extend(ScriptBuilder::new().add_data(redeem_script).drain());
    script
}

/// `required`-of-`pub_keys.len()` Schnorr multisig redeem script
pub fn multisig_redeem_script(pub_keys: &[[u8; 32]], required: usize) -> Result<Vec<u8>, TxScriptError> {
    if pub_keys.is_empty() || pub_keys.len() > MAX_PUB_KEYS_PER_MULTISIG {
        return Err(TxScriptError::InvalidPubKeyCount(format!("{} keys is not in 1..={}", pub_keys.len(), MAX_PUB_KEYS_PER_MULTISIG)));
    }
    if required == 0 || required > pub_keys.len() {
        return Err(TxScriptError::InvalidSignatureCount(format!("{} required of {} keys", required, pub_keys.len())));
    }
    let mut builder = ScriptBuilder::new();
    builder.add_i64(required as i64);
    for key in pub_keys {
        builder.add_data(key);
    }
    builder.add_i64(pub_keys.len() as i64).add_op(OP_CHECKMULTISIG);
    Ok(builder.drain())
}

/// `OP_BLAKE2B OP_DATA_32 <hash> OP_EQUAL`
pub fn is_pay_to_script_hash(script: &[u8]) -> bool {
    script.len() == 35 && script[0] == OP_BLAKE2B && script[1] == OP_DATA_32 && script[34] == OP_EQUAL
}

/// Scripts starting with `OP_RETURN` can never be satisfied
pub fn is_unspendable(script: &[u8]) -> bool {
    script.first() == Some(&OP_RETURN)
}

/// Signature operations a script would execute, counting multisig by its declared key count
/// (or the maximum when the count is not a small-int push). Stops at the first parse error.
pub fn count_sig_ops(script: &[u8]) -> u64 {
    let ops = match parse_script(script) {
        Ok(ops) => ops,
        Err(_) => return 0,
    };
    let mut count = 0u64;
    let mut previous: Option<u8> = None;
    for op in ops.iter() {
        match op.value {
            OP_CHECKSIG | OP_CHECKSIGVERIFY | OP_CHECKSIGECDSA => count += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY | OP_CHECKMULTISIGECDSA => {
                count += match previous {
                    Some(value @ OP_1..=OP_16) => (value - OP_1 + 1) as u64,
                    _ => MAX_PUB_KEYS_PER_MULTISIG as u64,
                };
            }
            _ => {}
        }
        previous = Some(op.value);
    }
    count
}

/// Signature operations an input spending `script_public_key` with `signature_script` executes
pub fn get_sig_op_count(signature_script: &[u8], script_public_key: &ScriptPublicKey) -> u64 {
    if !is_pay_to_script_hash(script_public_key.script()) {
        return count_sig_ops(script_public_key.script());
    }
    match parse_script(signature_script) {
        Ok(ops) if ops.iter().all(|op| op.is_push()) => ops.last().map_or(0, |redeem| count_sig_ops(&redeem.data)),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2sh_shape() {
        let redeem = vec![OP_TRUE];
        let spk = pay_to_script_hash_script(&redeem);
        assert!(is_pay_to_script_hash(spk.script()));
        assert!(!is_pay_to_script_hash(pay_to_pub_key(&[2; 32]).script()));
        assert!(is_unspendable(&[OP_RETURN, 0x01, 0x02]));
    }

    #[test]
    fn sig_op_counting() {
        assert_eq!(count_sig_ops(pay_to_pub_key(&[2; 32]).script()), 1);
        let redeem = multisig_redeem_script(&[[1; 32], [2; 32], [3; 32]], 2).unwrap();
        assert_eq!(count_sig_ops(&redeem), 3);
        assert_eq!(count_sig_ops(&[OP_CHECKMULTISIG]), MAX_PUB_KEYS_PER_MULTISIG as u64);

        let spk = pay_to_script_hash_script(&redeem);
        let sig_script = pay_to_script_hash_signature_script(&redeem, &[]);
        assert_eq!(get_sig_op_count(&sig_script, &spk), 3);
        assert_eq!(count_sig_ops(spk.script()), 0);
    }

    #[test]
    fn multisig_bounds() {
        assert!(multisig_redeem_script(&[], 1).is_err());
        assert!(multisig_redeem_script(&[[1; 32]], 2).is_err());
        assert!(multisig_redeem_script(&[[1; 32]; 21], 1).is_err());
    }
}
