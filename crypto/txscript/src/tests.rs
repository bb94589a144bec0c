use super::*;
use crate::script_builder::ScriptBuilder;
use consensus_core::hashing::sighash_type::SIG_HASH_ALL;
use consensus_core::subnets::SUBNETWORK_ID_NATIVE;
use consensus_core::tx::{PopulatedTransaction, ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput};
use secp256k1::{KeyPair, SecretKey};

const AMOUNT: u64 = 10_000;

fn spending_tx(signature_script: Vec<u8>, lock_time: u64, sequence: u64) -> Transaction {
    Transaction::new(
        0,
        vec![TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(7), 0), signature_script, sequence, 1)],
        vec![TransactionOutput::new(AMOUNT - 100, ScriptPublicKey::from_vec(0, vec![OP_TRUE]))],
        lock_time,
        SUBNETWORK_ID_NATIVE,
        0,
        vec![],
    )
}

fn entry(script_public_key: ScriptPublicKey) -> UtxoEntry {
    UtxoEntry::new(AMOUNT, script_public_key, 1, false)
}

fn run_tx(tx: &Transaction, spk: &ScriptPublicKey, flags: u32, cache: &SigCache) -> Result<(), TxScriptError> {
    let populated = PopulatedTransaction::new(tx, vec![entry(spk.clone())]);
    let mut engine = TxScriptEngine::from_transaction_input(&populated, 0, cache, flags)?;
    engine.execute()
}

fn run(signature_script: Vec<u8>, script: Vec<u8>, flags: u32) -> Result<(), TxScriptError> {
    let tx = spending_tx(signature_script, 0, 0);
    run_tx(&tx, &ScriptPublicKey::from_vec(0, script), flags, &SigCache::new(16))
}

fn keypair(seed: u8) -> KeyPair {
    let secp = Secp256k1::new();
    KeyPair::from_secret_key(&secp, &SecretKey::from_slice(&[seed; 32]).unwrap())
}

fn x_only(keypair: &KeyPair) -> [u8; 32] {
    keypair.x_only_public_key().0.serialize()
}

fn schnorr_signature(tx: &Transaction, spk: &ScriptPublicKey, keypair: &KeyPair) -> Vec<u8> {
    let populated = PopulatedTransaction::new(tx, vec![entry(spk.clone())]);
    let sig_hash = calc_schnorr_signature_hash(&populated, 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());
    let msg = Message::from_slice(sig_hash.as_bytes()).unwrap();
    let sig = Secp256k1::new().sign_schnorr_no_aux_rand(&msg, keypair);
    let bytes: &[u8; 64] = sig.as_ref();
    let mut signature = bytes.to_vec();
    signature.push(SIG_HASH_ALL.to_u8());
    signature
}

fn ecdsa_signature(tx: &Transaction, spk: &ScriptPublicKey, secret: &SecretKey) -> [u8; 64] {
    let populated = PopulatedTransaction::new(tx, vec![entry(spk.clone())]);
    let sig_hash = calc_ecdsa_signature_hash(&populated, 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());
    let msg = Message::from_slice(sig_hash.as_bytes()).unwrap();
    Secp256k1::new().sign_ecdsa(&msg, secret).serialize_compact()
}

/// Replaces `s` with `n - s`, which verifies equally but is not canonical
fn flip_s(compact: &mut [u8; 64]) {
    const ORDER: [u8; 32] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf,
        0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
    ];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = ORDER[i] as i16 - compact[32 + i] as i16 - borrow;
        borrow = if diff < 0 { 1 } else { 0 };
        if diff < 0 {
            diff += 256;
        }
        compact[32 + i] = diff as u8;
    }
}

fn push_all(items: &[Vec<u8>]) -> Vec<u8> {
    let mut builder = ScriptBuilder::new();
    for item in items {
        builder.add_data(item);
    }
    builder.drain()
}

#[test]
fn op_true_is_accepted() {
    assert_eq!(run(vec![], vec![OP_TRUE], CONSENSUS_SCRIPT_FLAGS), Ok(()));
}

#[test]
fn empty_scripts_evaluate_false() {
    assert_eq!(run(vec![], vec![], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EvalFalse));
}

#[test]
fn operation_limit() {
    let mut script = vec![OP_NOP; MAX_OPS_PER_SCRIPT];
    script.push(OP_TRUE);
    assert_eq!(run(vec![], script.clone(), CONSENSUS_SCRIPT_FLAGS), Ok(()));

    let mut script = vec![OP_NOP; MAX_OPS_PER_SCRIPT + 1];
    script.push(OP_TRUE);
    assert_eq!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT)));
}

#[test]
fn stack_size_limit() {
    let sig_script = vec![OP_1; MAX_STACK_SIZE + 1];
    assert_eq!(
        run(sig_script, vec![OP_TRUE], CONSENSUS_SCRIPT_FLAGS),
        Err(TxScriptError::StackOverflow(MAX_STACK_SIZE + 1, MAX_STACK_SIZE))
    );
}

#[test]
fn if_operand_must_be_minimal() {
    assert_eq!(run(vec![], vec![OP_2, OP_IF, OP_1, OP_ENDIF], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::MinimalIf));
    assert_eq!(run(vec![], vec![OP_1, OP_IF, OP_1, OP_ENDIF], CONSENSUS_SCRIPT_FLAGS), Ok(()));
    assert_eq!(run(vec![], vec![OP_0, OP_NOTIF, OP_1, OP_ELSE, OP_0, OP_ENDIF], CONSENSUS_SCRIPT_FLAGS), Ok(()));
}

#[test]
fn unbalanced_conditionals() {
    assert_eq!(run(vec![], vec![OP_1, OP_IF, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::UnbalancedConditional));
    assert_eq!(run(vec![], vec![OP_1, OP_ENDIF], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::UnbalancedConditional));
    assert_eq!(run(vec![], vec![OP_ELSE, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::UnbalancedConditional));
}

#[test]
fn disabled_opcodes_fail_in_unexecuted_branches() {
    assert_eq!(
        run(vec![], vec![OP_0, OP_IF, OP_CAT, OP_ENDIF, OP_1], CONSENSUS_SCRIPT_FLAGS),
        Err(TxScriptError::DisabledOpcode("OP_CAT".into()))
    );
    assert_eq!(
        run(vec![], vec![OP_0, OP_IF, OP_VERIF, OP_ENDIF, OP_1], CONSENSUS_SCRIPT_FLAGS),
        Err(TxScriptError::ReservedOpcode("OP_VERIF".into()))
    );
    // plain reserved opcodes only fail when executed
    assert_eq!(run(vec![], vec![OP_0, OP_IF, OP_RESERVED, OP_ENDIF, OP_1], CONSENSUS_SCRIPT_FLAGS), Ok(()));
    assert_eq!(run(vec![], vec![OP_RESERVED, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::ReservedOpcode("OP_RESERVED".into())));
}

#[test]
fn final_stack_checks() {
    assert_eq!(run(vec![], vec![OP_1, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::CleanStack(1)));
    assert_eq!(run(vec![], vec![OP_1, OP_DROP], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EmptyStack));
    assert_eq!(run(vec![], vec![OP_0], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EvalFalse));
    assert_eq!(run(vec![], vec![OP_RETURN, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EarlyReturn));
}

#[test]
fn verify_variants_have_distinct_errors() {
    assert_eq!(run(vec![], vec![OP_0, OP_VERIFY, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::VerifyFailed));
    assert_eq!(run(vec![], vec![OP_1, OP_2, OP_EQUALVERIFY, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EqualVerifyFailed));
    assert_eq!(run(vec![], vec![OP_1, OP_2, OP_NUMEQUALVERIFY, OP_1], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::NumEqualVerifyFailed));
}

#[test]
fn arithmetic_and_stack_ops() {
    let script = ScriptBuilder::new()
        .add_i64(5)
        .add_i64(7)
        .add_op(OP_ADD)
        .add_op(OP_DUP)
        .add_i64(12)
        .add_op(OP_NUMEQUALVERIFY)
        .add_i64(-3)
        .add_op(OP_ABS)
        .add_op(OP_SWAP)
        .add_op(OP_SUB)
        .add_i64(-9)
        .add_op(OP_NUMEQUAL)
        .drain();
    assert_eq!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Ok(()));

    let script = ScriptBuilder::new().add_i64(3).add_i64(1).add_i64(5).add_op(OP_WITHIN).drain();
    assert_eq!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Ok(()));

    let script = ScriptBuilder::new()
        .add_i64(1)
        .add_i64(2)
        .add_i64(3)
        .add_i64(2)
        .add_op(OP_PICK)
        .add_op(OP_TOALTSTACK)
        .add_ops(&[OP_2DROP, OP_DROP, OP_FROMALTSTACK])
        .drain();
    assert_eq!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Ok(()));
}

#[test]
fn hash_opcodes() {
    let preimage = b"jio".to_vec();
    let script = ScriptBuilder::new()
        .add_ops(&[OP_DUP, OP_SHA256])
        .add_data(&crypto_hashes::sha256(&preimage))
        .add_ops(&[OP_EQUALVERIFY, OP_BLAKE2B])
        .add_data(&standard::blake2b_256(&preimage))
        .add_op(OP_EQUAL)
        .drain();
    assert_eq!(run(push_all(&[preimage]), script, CONSENSUS_SCRIPT_FLAGS), Ok(()));
}

#[test]
fn non_minimal_push_is_rejected() {
    // a one-byte push of 0x05 must use OP_5
    assert!(matches!(run(vec![], vec![OP_DATA_1, 0x05], CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::MinimalData(_))));
}

#[test]
fn construction_checks() {
    let cache = SigCache::new(4);
    let tx = spending_tx(vec![OP_NOP], 0, 0);
    let populated = PopulatedTransaction::new(&tx, vec![entry(ScriptPublicKey::from_vec(0, vec![OP_TRUE]))]);
    assert_eq!(TxScriptEngine::from_transaction_input(&populated, 0, &cache, CONSENSUS_SCRIPT_FLAGS).err(), Some(TxScriptError::NotPushOnly));
    assert_eq!(TxScriptEngine::from_transaction_input(&populated, 1, &cache, CONSENSUS_SCRIPT_FLAGS).err(), Some(TxScriptError::InvalidIndex(1, 1)));
    assert_eq!(TxScriptEngine::from_transaction_input(&populated, 0, &cache, 1 << 7).err(), Some(TxScriptError::InvalidFlags(1 << 7)));

    let tx = spending_tx(vec![], 0, 0);
    let populated = PopulatedTransaction::new(&tx, vec![entry(ScriptPublicKey::from_vec(0, vec![OP_NOP; MAX_SCRIPTS_SIZE + 1]))]);
    assert_eq!(
        TxScriptEngine::from_transaction_input(&populated, 0, &cache, CONSENSUS_SCRIPT_FLAGS).err(),
        Some(TxScriptError::ScriptTooBig(MAX_SCRIPTS_SIZE + 1, MAX_SCRIPTS_SIZE))
    );
}

#[test]
fn stepping_past_the_end_fails() {
    let cache = SigCache::new(4);
    let tx = spending_tx(vec![OP_1], 0, 0);
    let populated = PopulatedTransaction::new(&tx, vec![entry(ScriptPublicKey::from_vec(0, vec![OP_DUP, OP_DROP]))]);
    let mut engine = TxScriptEngine::from_transaction_input(&populated, 0, &cache, CONSENSUS_SCRIPT_FLAGS).unwrap();

    assert_eq!(engine.step(), Ok(false));
    assert_eq!(engine.data_stack(), &[vec![1u8]]);
    assert_eq!(engine.step(), Ok(false));
    assert_eq!(engine.data_stack().len(), 2);
    assert_eq!(engine.step(), Ok(true));
    assert!(engine.is_finished());
    assert_eq!(engine.step(), Err(TxScriptError::InvalidProgramCounter));
}

#[test]
fn schnorr_pay_to_pub_key() {
    let key = keypair(3);
    let spk = standard::pay_to_pub_key(&x_only(&key));
    let cache = SigCache::new(16);

    let mut tx = spending_tx(vec![], 0, 0);
    let signature = schnorr_signature(&tx, &spk, &key);
    tx.inputs[0].signature_script = push_all(&[signature.clone()]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Ok(()));
    assert_eq!(cache.len(), 1);
    // a second run is served from the cache
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Ok(()));
    assert_eq!(cache.len(), 1);

    // signed by another key
    let other_spk = standard::pay_to_pub_key(&x_only(&keypair(4)));
    assert_eq!(run_tx(&tx, &other_spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::NullFail));

    // an empty signature is a clean false
    tx.inputs[0].signature_script = push_all(&[vec![]]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::EvalFalse));

    let mut short = signature.clone();
    short.pop();
    tx.inputs[0].signature_script = push_all(&[short]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::SigLength(64)));

    let mut bad_type = signature;
    *bad_type.last_mut().unwrap() = 0x55;
    tx.inputs[0].signature_script = push_all(&[bad_type]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::InvalidSigHashType(0x55)));
}

#[test]
fn ecdsa_pay_to_pub_key_and_high_s() {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[5; 32]).unwrap();
    let spk = standard::pay_to_pub_key_ecdsa(&PublicKey::from_secret_key(&secp, &secret).serialize());
    let cache = SigCache::new(16);

    let mut tx = spending_tx(vec![], 0, 0);
    let compact = ecdsa_signature(&tx, &spk, &secret);
    let mut signature = compact.to_vec();
    signature.push(SIG_HASH_ALL.to_u8());
    tx.inputs[0].signature_script = push_all(&[signature]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Ok(()));

    let mut high_s = compact;
    flip_s(&mut high_s);
    let mut signature = high_s.to_vec();
    signature.push(SIG_HASH_ALL.to_u8());
    tx.inputs[0].signature_script = push_all(&[signature]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::SigHighS));
}

#[test]
fn pay_to_script_hash() {
    let redeem = vec![OP_0];
    let spk = standard::pay_to_script_hash_script(&redeem);
    let sig_script = standard::pay_to_script_hash_signature_script(&redeem, &[]);
    // the hash matches, but the redeem script leaves false behind
    assert_eq!(run(sig_script.clone(), spk.script().to_vec(), CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EvalFalse));
    assert_eq!(run(sig_script, spk.script().to_vec(), SCRIPT_VERIFY_CHECK_LOCK_TIME), Ok(()));

    let redeem = vec![OP_1];
    let spk = standard::pay_to_script_hash_script(&redeem);
    let sig_script = standard::pay_to_script_hash_signature_script(&redeem, &[]);
    assert_eq!(run(sig_script, spk.script().to_vec(), CONSENSUS_SCRIPT_FLAGS), Ok(()));

    let wrong = standard::pay_to_script_hash_signature_script(&[OP_2], &[]);
    assert_eq!(run(wrong, spk.script().to_vec(), CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::EvalFalse));
}

#[test]
fn schnorr_multisig() {
    let keys = [keypair(10), keypair(11), keypair(12)];
    let pub_keys: Vec<[u8; 32]> = keys.iter().map(x_only).collect();
    let spk = ScriptPublicKey::from_vec(0, standard::multisig_redeem_script(&pub_keys, 2).unwrap());
    let cache = SigCache::new(16);

    let mut tx = spending_tx(vec![], 0, 0);
    let sig_a = schnorr_signature(&tx, &spk, &keys[0]);
    let sig_c = schnorr_signature(&tx, &spk, &keys[2]);

    tx.inputs[0].signature_script = push_all(&[sig_a.clone(), sig_c.clone()]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Ok(()));

    // signatures must follow key order
    tx.inputs[0].signature_script = push_all(&[sig_c, sig_a]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::NullFail));

    tx.inputs[0].signature_script = push_all(&[vec![], vec![]]);
    assert_eq!(run_tx(&tx, &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::EvalFalse));
}

#[test]
fn multisig_counts() {
    let script = ScriptBuilder::new().add_i64(0).add_i64(21).add_op(OP_CHECKMULTISIG).drain();
    assert!(matches!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::InvalidPubKeyCount(_))));

    let script = ScriptBuilder::new().add_i64(2).add_data(&[1; 32]).add_i64(1).add_op(OP_CHECKMULTISIG).drain();
    assert!(matches!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::InvalidSignatureCount(_))));

    // zero-of-zero succeeds trivially
    let script = ScriptBuilder::new().add_i64(0).add_i64(0).add_op(OP_CHECKMULTISIG).drain();
    assert_eq!(run(vec![], script, CONSENSUS_SCRIPT_FLAGS), Ok(()));
}

#[test]
fn check_lock_time_verify() {
    let script = ScriptBuilder::new().add_lock_time(100).add_op(OP_CHECKLOCKTIMEVERIFY).add_op(OP_DROP).add_op(OP_1).drain();
    let spk = ScriptPublicKey::from_vec(0, script);
    let cache = SigCache::new(4);

    assert_eq!(run_tx(&spending_tx(vec![], 200, 0), &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Ok(()));
    assert!(matches!(
        run_tx(&spending_tx(vec![], 50, 0), &spk, CONSENSUS_SCRIPT_FLAGS, &cache),
        Err(TxScriptError::UnsatisfiedLockTime(_))
    ));
    assert!(matches!(
        run_tx(&spending_tx(vec![], LOCK_TIME_THRESHOLD + 1, 0), &spk, CONSENSUS_SCRIPT_FLAGS, &cache),
        Err(TxScriptError::UnsatisfiedLockTime(_))
    ));
    assert!(matches!(
        run_tx(&spending_tx(vec![], 200, MAX_TX_IN_SEQUENCE_NUM), &spk, CONSENSUS_SCRIPT_FLAGS, &cache),
        Err(TxScriptError::UnsatisfiedLockTime(_))
    ));
    // without the flag the opcode is a no-op
    assert_eq!(run_tx(&spending_tx(vec![], 50, 0), &spk, SCRIPT_VERIFY_P2SH, &cache), Ok(()));

    let negative = ScriptBuilder::new().add_i64(-1).add_op(OP_CHECKLOCKTIMEVERIFY).drain();
    assert_eq!(run(vec![], negative, CONSENSUS_SCRIPT_FLAGS), Err(TxScriptError::NegativeLockTime(-1)));
}

#[test]
fn check_sequence_verify() {
    let script = ScriptBuilder::new().add_i64(10).add_op(OP_CHECKSEQUENCEVERIFY).add_op(OP_DROP).add_op(OP_1).drain();
    let spk = ScriptPublicKey::from_vec(0, script);
    let cache = SigCache::new(4);

    assert_eq!(run_tx(&spending_tx(vec![], 0, 10), &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Ok(()));
    assert!(matches!(run_tx(&spending_tx(vec![], 0, 9), &spk, CONSENSUS_SCRIPT_FLAGS, &cache), Err(TxScriptError::UnsatisfiedLockTime(_))));
    assert!(matches!(
        run_tx(&spending_tx(vec![], 0, SEQUENCE_LOCK_TIME_DISABLED | 20), &spk, CONSENSUS_SCRIPT_FLAGS, &cache),
        Err(TxScriptError::UnsatisfiedLockTime(_))
    ));
}
