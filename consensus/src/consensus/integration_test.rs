//! End-to-end scenarios over a full engine: blocks are built as templates with
//! correct commitments and submitted through the block processor.

use super::Consensus;
use crate::consensus::finality::TestFinalityManager;
use crate::consensus::validation::TestTransactionValidator;
use crate::observability::TracingSink;
use crate::pipeline::CancelToken;
use crate::process::TemplateRequest;
use crate::testutils::{op_true_script, test_config, TestConsensus};
use consensus_core::acceptance_data::TxOutcome;
use consensus_core::block::{calc_hash_merkle_root, Block};
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::{ConsensusError, RuleError, StoreError, StoreResult, TxRuleError};
use consensus_core::hashing::sighash::{calc_schnorr_signature_hash, SigHashReusedValues};
use consensus_core::hashing::sighash_type::SIG_HASH_ALL;
use consensus_core::notify::{EventType, Notification, SubscriptionOptions};
use consensus_core::persistence::{CommitBatch, ConsensusPersistence, PersistedState};
use consensus_core::status::BlockStatus;
use consensus_core::subnets::SUBNETWORK_ID_NATIVE;
use consensus_core::tx::{PopulatedTransaction, ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput, UtxoEntry};
use consensus_core::Hash;
use jio_txscript::script_builder::ScriptBuilder;
use jio_txscript::standard::pay_to_pub_key;
use secp256k1::{KeyPair, Message, Secp256k1, SecretKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const FEE: u64 = 1_000;

fn spend(outpoint: TransactionOutpoint, value: u64, script_public_key: ScriptPublicKey) -> Transaction {
    Transaction::new(
        0,
        vec![TransactionInput::new(outpoint, vec![], 0, 0)],
        vec![TransactionOutput::new(value, script_public_key)],
        0,
        SUBNETWORK_ID_NATIVE,
        0,
        vec![],
    )
}

/// Replaces the body of `block` and fixes its merkle root
fn with_transactions(block: &Block, transactions: Vec<Transaction>) -> Block {
    let mut header = (*block.header).clone();
    header.hash_merkle_root = calc_hash_merkle_root(transactions.iter());
    header.finalize();
    Block::new(header, transactions)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap()
}

#[test]
fn chain_grows_and_answers_queries() {
    let tc = TestConsensus::new(test_config());
    let genesis = tc.genesis_hash();
    let tip = tc.add_chain(genesis, 5).unwrap();

    assert_eq!(tc.selected_tip_hash().unwrap(), tip);
    assert_eq!(tc.tips(), vec![tip]);
    assert_eq!(tc.block_count(), 6);
    assert_eq!(tc.get_ghostdag_data(tip).unwrap().blue_score, 5);
    assert_eq!(tc.virtual_state().unwrap().ghostdag_data.blue_score, 6);
    assert!(tc.is_chain_ancestor_of(genesis, tip).unwrap());
    assert!(!tc.is_dag_ancestor_of(tip, genesis).unwrap());

    let headers = tc.get_headers(genesis, 3).unwrap();
    assert_eq!(headers.len(), 3);
    assert_eq!(headers[0].hash, genesis);
    assert_eq!(headers[1].blue_score, 1);

    let chain = tc.get_virtual_chain_from_block(genesis).unwrap();
    assert!(chain.removed.is_empty());
    assert_eq!(chain.added.len(), 5);
    assert_eq!(chain.added.last(), Some(&tip));
}

#[test]
fn resubmitting_an_accepted_block_changes_nothing() {
    let tc = TestConsensus::new(test_config());
    let block = tc.build_block_with_parents(vec![tc.genesis_hash()], vec![]).unwrap();
    assert_eq!(tc.validate_and_insert_block(&block).unwrap(), BlockStatus::StatusUTXOValid);
    let version = tc.storage.version();

    assert_eq!(tc.validate_and_insert_block(&block).unwrap(), BlockStatus::AlreadyKnown);
    assert_eq!(tc.storage.version(), version);
    assert_eq!(tc.block_count(), 2);
}

#[test]
fn coinbase_matures_and_can_be_spent() {
    let tc = TestConsensus::new(test_config());
    let subsidy = tc.config().base_subsidy;
    let genesis = tc.genesis_hash();
    let b1 = tc.add_block(vec![genesis], vec![]).unwrap();
    let b2 = tc.add_block(vec![b1], vec![]).unwrap();
    let outpoint = tc.coinbase_outpoint(b1);

    // accepted by b2, so it carries blue score 2 and matures at 4
    let entry = tc.get_virtual_utxo_entry(&outpoint).unwrap();
    assert_eq!(entry.block_blue_score, 2);
    assert!(entry.is_coinbase);

    let tx = spend(outpoint, subsidy - FEE, op_true_script());
    match tc.build_block_with_parents(vec![b2], vec![tx.clone()]) {
        Err(ConsensusError::Rule(RuleError::TxInContextFailed(id, TxRuleError::ImmatureCoinbaseSpend(..)))) => assert_eq!(id, tx.id()),
        other => panic!("unexpected template result {other:?}"),
    }

    let b3 = tc.add_block(vec![b2], vec![]).unwrap();
    let b4 = tc.add_block(vec![b3], vec![tx.clone()]).unwrap();
    let block = tc.get_block(b4).unwrap();
    assert_eq!(block.transactions[0].outputs[0].value, subsidy + FEE);

    assert!(tc.get_virtual_utxo_entry(&outpoint).is_none());
    assert_eq!(tc.get_virtual_utxo_entry(&TransactionOutpoint::new(tx.id(), 0)).unwrap().amount, subsidy - FEE);
    // four coinbases accepted, one of them moved into the spend with its fee paid to b4
    assert_eq!(tc.get_balance_by_script_public_key(&op_true_script()), 4 * subsidy);
}

#[test]
fn cross_branch_double_spend_keeps_the_first_in_consensus_order() {
    let tc = TestConsensus::new(test_config());
    let subsidy = tc.config().base_subsidy;
    let b1 = tc.add_block(vec![tc.genesis_hash()], vec![]).unwrap();
    let b3 = tc.add_chain(b1, 2).unwrap();
    let outpoint = tc.coinbase_outpoint(b1);

    let left_tx = spend(outpoint, subsidy - FEE, op_true_script());
    let right_tx = spend(outpoint, subsidy - 2 * FEE, op_true_script());
    let left = tc.add_block(vec![b3], vec![left_tx.clone()]).unwrap();
    let right = tc.add_block(vec![b3], vec![right_tx.clone()]).unwrap();

    let merge = tc.add_block(vec![left, right], vec![]).unwrap();
    let selected_parent = tc.get_ghostdag_data(merge).unwrap().selected_parent;
    let (winner, loser, loser_block) =
        if selected_parent == left { (left_tx, right_tx, right) } else { (right_tx, left_tx, left) };

    let acceptance = tc.get_block_acceptance_data(merge).unwrap();
    assert_eq!(acceptance[0].block_hash, selected_parent);
    let merged = acceptance.iter().find(|data| data.block_hash == loser_block).unwrap();
    let outcome = &merged.transactions.iter().find(|tx| tx.transaction_id == loser.id()).unwrap().outcome;
    assert_eq!(outcome, &TxOutcome::Rejected(TxRuleError::DoubleSpend(outpoint)));

    // the merging block is valid and only the winner's output exists
    assert_eq!(tc.selected_tip_hash().unwrap(), merge);
    assert!(tc.get_virtual_utxo_entry(&TransactionOutpoint::new(winner.id(), 0)).is_some());
    assert!(tc.get_virtual_utxo_entry(&TransactionOutpoint::new(loser.id(), 0)).is_none());
}

#[test]
fn spend_accepted_deeper_in_the_chain_rejects_a_merged_conflict() {
    let tc = TestConsensus::new(test_config());
    let subsidy = tc.config().base_subsidy;
    let b1 = tc.add_block(vec![tc.genesis_hash()], vec![]).unwrap();
    let b3 = tc.add_chain(b1, 2).unwrap();
    let outpoint = tc.coinbase_outpoint(b1);

    let left_tx = spend(outpoint, subsidy - FEE, op_true_script());
    let right_tx = spend(outpoint, subsidy - 2 * FEE, op_true_script());
    let left = tc.add_block(vec![b3], vec![left_tx.clone()]).unwrap();
    let left2 = tc.add_block(vec![left], vec![]).unwrap();
    let right = tc.add_block(vec![b3], vec![right_tx.clone()]).unwrap();

    // left2 accepted the left spend before right was ever merged
    let accepted_by_left2 = tc.get_block_acceptance_data(left2).unwrap();
    assert!(accepted_by_left2.iter().any(|data| data.transactions.iter().any(|tx| tx.transaction_id == left_tx.id())));

    let merge = tc.add_block(vec![left2, right], vec![]).unwrap();
    assert_eq!(tc.get_ghostdag_data(merge).unwrap().selected_parent, left2);
    let acceptance = tc.get_block_acceptance_data(merge).unwrap();
    let merged = acceptance.iter().find(|data| data.block_hash == right).unwrap();
    let outcome = &merged.transactions.iter().find(|tx| tx.transaction_id == right_tx.id()).unwrap().outcome;
    assert_eq!(outcome, &TxOutcome::Rejected(TxRuleError::DoubleSpend(outpoint)));

    assert_eq!(tc.selected_tip_hash().unwrap(), merge);
    assert!(tc.get_virtual_utxo_entry(&TransactionOutpoint::new(left_tx.id(), 0)).is_some());
    assert!(tc.get_virtual_utxo_entry(&TransactionOutpoint::new(right_tx.id(), 0)).is_none());
}

#[test]
fn rule_violations_are_cached_as_invalid() {
    let tc = TestConsensus::new(test_config());
    let genesis = tc.genesis_hash();
    let template = tc.build_block_with_parents(vec![genesis], vec![]).unwrap();

    let missing = TransactionOutpoint::new(Hash::from_u64_word(99), 0);
    let bad_tx = spend(missing, 10, op_true_script());
    let mut transactions = template.transactions.to_vec();
    transactions.push(bad_tx.clone());
    let block = with_transactions(&template, transactions);

    let expected = ConsensusError::Rule(RuleError::TxInContextFailed(bad_tx.id(), TxRuleError::MissingOutpoint(missing)));
    assert_eq!(tc.validate_and_insert_block(&block).unwrap_err(), expected);
    assert!(tc.storage.read().invalid_block_error(&block.hash()).is_some());
    assert_eq!(tc.validate_and_insert_block(&block).unwrap_err(), expected);
    assert_eq!(tc.tips(), vec![genesis]);
}

#[test]
fn tampered_utxo_commitment_is_rejected() {
    let tc = TestConsensus::new(test_config());
    let block = tc.build_block_with_parents(vec![tc.genesis_hash()], vec![]).unwrap();
    let computed = block.header.utxo_commitment;
    let mut header = (*block.header).clone();
    header.utxo_commitment = Hash::from_u64_word(7);
    header.finalize();
    let tampered = Block { header: Arc::new(header), transactions: block.transactions.clone() };

    assert_eq!(
        tc.validate_and_insert_block(&tampered).unwrap_err(),
        ConsensusError::Rule(RuleError::BadUTXOCommitment(Hash::from_u64_word(7), computed))
    );
    assert_eq!(tc.block_count(), 1);
}

#[test]
fn missing_parents_are_not_cached() {
    let tc = TestConsensus::new(test_config());
    let block = tc.build_block_with_parents(vec![tc.genesis_hash()], vec![]).unwrap();
    let unknown = Hash::from_u64_word(1234);
    let mut header = (*block.header).clone();
    header.parents = vec![unknown];
    header.finalize();
    let orphan = Block { header: Arc::new(header), transactions: block.transactions.clone() };

    let err = tc.validate_and_insert_block(&orphan).unwrap_err();
    assert_eq!(err, ConsensusError::Rule(RuleError::MissingParents(vec![unknown])));
    assert!(tc.storage.read().invalid_block_error(&orphan.hash()).is_none());
}

#[test]
fn cancelled_validation_leaves_state_untouched() {
    let tc = TestConsensus::new(test_config());
    let block = tc.build_block_with_parents(vec![tc.genesis_hash()], vec![]).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = tc.validate_and_insert_block_with_cancel(&block, &cancel).unwrap_err();
    assert_eq!(err, ConsensusError::Cancelled);
    assert!(err.is_transient());
    assert_eq!(tc.block_count(), 1);
    assert_eq!(tc.validate_and_insert_block(&block).unwrap(), BlockStatus::StatusUTXOValid);
}

struct FlakyPersistence {
    failing: AtomicBool,
}

impl ConsensusPersistence for FlakyPersistence {
    fn write_commit(&self, _batch: &CommitBatch) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::DbError("device unavailable".into()));
        }
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<PersistedState>> {
        Ok(None)
    }
}

#[test]
fn storage_failures_are_transient() {
    let persistence = Arc::new(FlakyPersistence { failing: AtomicBool::new(false) });
    let consensus = Consensus::with_persistence(test_config(), persistence.clone(), Arc::new(TracingSink)).unwrap();
    let request = TemplateRequest { miner_script_public_key: op_true_script(), ..Default::default() };
    let block = consensus.build_block_template(request).unwrap();

    persistence.failing.store(true, Ordering::SeqCst);
    let err = consensus.validate_and_insert_block(&block).unwrap_err();
    assert!(matches!(err, ConsensusError::Storage(_)));
    assert!(err.is_transient());
    assert_eq!(consensus.block_count(), 1);

    persistence.failing.store(false, Ordering::SeqCst);
    assert_eq!(consensus.validate_and_insert_block(&block).unwrap(), BlockStatus::StatusUTXOValid);
    assert_eq!(consensus.selected_tip_hash().unwrap(), block.hash());
}

#[test]
fn concurrent_siblings_all_commit() {
    let tc = TestConsensus::new(test_config());
    let genesis = tc.genesis_hash();
    let siblings: Vec<Block> = (0..8).map(|_| tc.build_block_with_parents(vec![genesis], vec![]).unwrap()).collect();

    std::thread::scope(|scope| {
        for block in siblings.iter() {
            let tc = &tc;
            scope.spawn(move || assert_eq!(tc.validate_and_insert_block(block).unwrap(), BlockStatus::StatusUTXOValid));
        }
    });
    let mut tips = tc.tips();
    tips.sort();
    let mut expected: Vec<Hash> = siblings.iter().map(|block| block.hash()).collect();
    expected.sort();
    assert_eq!(tips, expected);

    let merge = tc.add_block(tips, vec![]).unwrap();
    assert_eq!(tc.tips(), vec![merge]);
    assert_eq!(tc.get_ghostdag_data(merge).unwrap().blue_score, 9);
}

#[test]
fn reorg_reports_removed_and_added_chain_blocks() {
    let tc = TestConsensus::new(test_config());
    let genesis = tc.genesis_hash();
    let mut receiver = tc.notifier().receiver();

    let a1 = tc.add_block(vec![genesis], vec![]).unwrap();
    match receiver.try_recv().unwrap() {
        Notification::VirtualChainChanged(change) => assert_eq!(*change.added_chain_block_hashes, vec![a1]),
        other => panic!("unexpected notification {other:?}"),
    }

    let b1 = tc.add_block(vec![genesis], vec![]).unwrap();
    let b2 = tc.add_block(vec![b1], vec![]).unwrap();
    let mut last = None;
    while let Ok(notification) = receiver.try_recv() {
        last = Some(notification);
    }
    match last {
        Some(Notification::VirtualChainChanged(change)) => assert_eq!(change.added_chain_block_hashes.last(), Some(&b2)),
        other => panic!("unexpected notification {other:?}"),
    }

    let path = tc.get_virtual_chain_from_block(a1).unwrap();
    assert_eq!(path.removed, vec![a1]);
    assert_eq!(path.added, vec![b1, b2]);
    assert_eq!(path.common_ancestor, genesis);
    assert_eq!(tc.get_headers(a1, 10).unwrap_err(), ConsensusError::NotInSelectedChain(a1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn finality_violation_is_recorded_and_resolved() {
    let tc = TestConsensus::new(ConsensusConfig { finality_depth: 3, ..test_config() });
    let (tx, mut rx) = mpsc::unbounded_channel();
    let options = SubscriptionOptions::only(vec![EventType::FinalityConflict, EventType::FinalityConflictResolved]);
    let _subscription = tc
        .subscribe(options, move |notification| {
            let _ = tx.send(notification);
        })
        .unwrap();

    let genesis = tc.genesis_hash();
    tc.add_chain(genesis, 6).unwrap();
    let finality_point = tc.finality_point();
    assert_eq!(finality_point, tc.get_virtual_chain_from_block(genesis).unwrap().added[2]);
    assert!(!tc.finality_manager().finality_point_cache().is_empty());

    let side = tc.build_block_with_parents(vec![genesis], vec![]).unwrap();
    let err = tc.validate_and_insert_block(&side).unwrap_err();
    assert_eq!(err, ConsensusError::Rule(RuleError::ViolatingFinality(finality_point)));
    assert_eq!(tc.unresolved_finality_conflicts(), vec![side.hash()]);
    assert_eq!(next(&mut rx).await, Notification::FinalityConflict { violating_block_hash: side.hash() });

    // known invalid now, so no second conflict is raised
    assert_eq!(tc.validate_and_insert_block(&side).unwrap_err(), err);
    assert_eq!(tc.unresolved_finality_conflicts().len(), 1);

    assert!(tc.resolve_finality_conflict(side.hash()).unwrap());
    assert!(!tc.resolve_finality_conflict(side.hash()).unwrap());
    assert!(tc.unresolved_finality_conflicts().is_empty());
    assert_eq!(next(&mut rx).await, Notification::FinalityConflictResolved { finality_block_hash: finality_point });
}

#[test]
fn pruning_point_utxo_set_import() {
    let tc = TestConsensus::new(test_config());
    let b1 = tc.add_block(vec![tc.genesis_hash()], vec![]).unwrap();
    let b2 = tc.add_block(vec![b1], vec![]).unwrap();
    let expected = tc.get_header(b2).unwrap().utxo_commitment;
    let utxo_set = tc.storage.read().utxo_set().clone();
    assert_eq!(utxo_set.len(), 1);

    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(tc.import_pruning_point_utxo_set(utxo_set.clone(), &cancel), Err(ConsensusError::Cancelled));

    let mut forged = utxo_set.clone();
    forged.insert(TransactionOutpoint::new(Hash::from_u64_word(5), 0), UtxoEntry::new(1, op_true_script(), 0, false));
    match tc.import_pruning_point_utxo_set(forged, &CancelToken::new()) {
        Err(ConsensusError::UtxoSetCommitmentMismatch(computed, commitment)) => {
            assert_ne!(computed, commitment);
            assert_eq!(commitment, expected);
        }
        other => panic!("unexpected import result {other:?}"),
    }

    let mut receiver = tc.notifier().receiver();
    tc.import_pruning_point_utxo_set(utxo_set, &CancelToken::new()).unwrap();
    assert_eq!(receiver.try_recv().unwrap(), Notification::PruningPointUtxoSetOverride);
    // the chain keeps extending on the imported base
    tc.add_chain(b2, 2).unwrap();
}

fn keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_key(&Secp256k1::new(), &SecretKey::from_slice(&[seed; 32]).unwrap())
}

fn sign_p2pk_spend(outpoint: TransactionOutpoint, entry: &UtxoEntry, value: u64, keypair: &KeyPair) -> Transaction {
    let build = |signature_script: Vec<u8>| {
        Transaction::new(
            0,
            vec![TransactionInput::new(outpoint, signature_script, 0, 1)],
            vec![TransactionOutput::new(value, op_true_script())],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    };
    let unsigned = build(vec![]);
    let populated = PopulatedTransaction::new(&unsigned, vec![entry.clone()]);
    let sig_hash = calc_schnorr_signature_hash(&populated, 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());
    let message = Message::from_slice(sig_hash.as_bytes()).unwrap();
    let schnorr = Secp256k1::new().sign_schnorr_no_aux_rand(&message, keypair);
    let bytes: &[u8; 64] = schnorr.as_ref();
    let mut signature = bytes.to_vec();
    signature.push(SIG_HASH_ALL.to_u8());
    build(ScriptBuilder::new().add_data(&signature).drain())
}

#[test]
fn schnorr_signed_spend_is_verified_and_cached() {
    let tc = TestConsensus::new(test_config());
    let subsidy = tc.config().base_subsidy;
    let owner = keypair(3);
    let owner_script = pay_to_pub_key(&owner.x_only_public_key().0.serialize());

    let b1 = tc.add_block(vec![tc.genesis_hash()], vec![]).unwrap();
    let b3 = tc.add_chain(b1, 2).unwrap();
    let funding = spend(tc.coinbase_outpoint(b1), subsidy - FEE, owner_script.clone());
    let b4 = tc.add_block(vec![b3], vec![funding.clone()]).unwrap();

    let outpoint = TransactionOutpoint::new(funding.id(), 0);
    let entry = tc.get_virtual_utxo_entry(&outpoint).unwrap();
    assert_eq!(entry.script_public_key, owner_script);

    let forged = sign_p2pk_spend(outpoint, &entry, subsidy - 2 * FEE, &keypair(4));
    match tc.build_block_with_parents(vec![b4], vec![forged]) {
        Err(ConsensusError::Rule(RuleError::TxInContextFailed(_, TxRuleError::SignatureInvalid(0, _)))) => {}
        other => panic!("unexpected template result {other:?}"),
    }

    let signed = sign_p2pk_spend(outpoint, &entry, subsidy - 2 * FEE, &owner);
    tc.add_block(vec![b4], vec![signed.clone()]).unwrap();
    assert!(!tc.transaction_validator().sig_cache().is_empty());
    assert!(tc.get_virtual_utxo_entry(&outpoint).is_none());
    assert!(tc.get_virtual_utxo_entry(&TransactionOutpoint::new(signed.id(), 0)).is_some());
}
