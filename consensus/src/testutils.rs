use crate::consensus::Consensus;
use crate::process::TemplateRequest;
use consensus_core::block::Block;
use consensus_core::config::ConsensusConfig;
use consensus_core::errors::ConsensusResult;
use consensus_core::status::BlockStatus;
use consensus_core::tx::{ScriptPublicKey, Transaction, TransactionOutpoint};
use consensus_core::Hash;
use jio_txscript::opcodes::OP_TRUE;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

/// Anyone-can-spend script paid by every test coinbase
pub fn op_true_script() -> ScriptPublicKey {
    ScriptPublicKey::from_vec(0, vec![OP_TRUE])
}

/// Devnet parameters without proof of work and with a short coinbase maturity
pub fn test_config() -> ConsensusConfig {
    ConsensusConfig { skip_proof_of_work: true, coinbase_maturity: 2, ..Default::default() }
}

/// A [`Consensus`] that mines its own blocks
pub struct TestConsensus {
    consensus: Consensus,
    nonce: AtomicU64,
}

impl TestConsensus {
    pub fn new(config: ConsensusConfig) -> Self {
        init_test_logger();
        let consensus = Consensus::new(ConsensusConfig { skip_proof_of_work: true, ..config }).unwrap();
        Self { consensus, nonce: AtomicU64::new(0) }
    }

    /// Template on `parents` carrying `transactions`, unique per call
    pub fn build_block_with_parents(&self, parents: Vec<Hash>, transactions: Vec<Transaction>) -> ConsensusResult<Block> {
        let extra_data = self.nonce.fetch_add(1, Ordering::Relaxed).to_le_bytes().to_vec();
        let request = TemplateRequest { miner_script_public_key: op_true_script(), extra_data, transactions, timestamp: 0 };
        self.consensus.build_block_with_parents(parents, request)
    }

    pub fn add_block(&self, parents: Vec<Hash>, transactions: Vec<Transaction>) -> ConsensusResult<Hash> {
        let block = self.build_block_with_parents(parents, transactions)?;
        let status = self.consensus.validate_and_insert_block(&block)?;
        assert_eq!(status, BlockStatus::StatusUTXOValid);
        Ok(block.hash())
    }

    /// Extends the chain of `from` by `count` blocks and returns the new tip
    pub fn add_chain(&self, from: Hash, count: usize) -> ConsensusResult<Hash> {
        let mut tip = from;
        for _ in 0..count {
            tip = self.add_block(vec![tip], vec![])?;
        }
        Ok(tip)
    }

    /// The output paid by the coinbase of `block`
    pub fn coinbase_outpoint(&self, block: Hash) -> TransactionOutpoint {
        let block = self.consensus.get_block(block).unwrap();
        TransactionOutpoint::new(block.transactions[0].id(), 0)
    }
}

impl Deref for TestConsensus {
    type Target = Consensus;

    fn deref(&self) -> &Self::Target {
        &self.consensus
    }
}
