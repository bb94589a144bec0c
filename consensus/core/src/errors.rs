use crate::tx::{TransactionId, TransactionOutpoint};
use crate::utxo::UtxoAlgebraError;
use crate::{BlueWorkType, Hash};
use jio_txscript_errors::TxScriptError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transaction rule violations, either in isolation or against a UTXO view
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxRuleError {
    #[error("transaction has no inputs")]
    NoTxInputs,

    #[error("transaction has no outputs")]
    NoTxOutputs,

    #[error("transaction has {0} inputs where the max allowed is {1}")]
    TooManyInputs(usize, usize),

    #[error("transaction has {0} outputs where the max allowed is {1}")]
    TooManyOutputs(usize, usize),

    #[error("transaction has duplicate input {0}")]
    TxDuplicateInputs(TransactionOutpoint),

    #[error("transaction output {0} has zero value")]
    TxOutZero(usize),

    #[error("transaction output {0} value is higher than the max allowed")]
    TxOutTooHigh(usize),

    #[error("transaction output values overflow")]
    OutputsValueOverflow,

    #[error("transaction input values overflow")]
    InputsValueOverflow,

    #[error("coinbase transaction has {0} inputs")]
    CoinbaseHasInputs(usize),

    #[error("coinbase payload length is {0} while the minimum is {1}")]
    CoinbasePayloadTooShort(usize, usize),

    #[error("coinbase payload length is {0} while the max allowed is {1}")]
    CoinbasePayloadTooLong(usize, usize),

    #[error("transaction subnetwork {0} is not allowed")]
    SubnetworkNotAllowed(crate::subnets::SubnetworkId),

    #[error("transaction has non-zero gas {0}")]
    TxHasGas(u64),

    #[error("transaction version {0} is unknown")]
    UnknownTxVersion(u16),

    #[error("transaction lock time {0} is not yet satisfied")]
    NotFinalized(u64),

    #[error("outpoint {0} is not in the utxo set")]
    MissingOutpoint(TransactionOutpoint),

    #[error("outpoint {0} was already spent by an earlier transaction in consensus order")]
    DoubleSpend(TransactionOutpoint),

    #[error("output {0} already exists in the utxo set")]
    OutpointAlreadyExists(TransactionOutpoint),

    #[error("input {0} spends coinbase outpoint {1} created at blue score {2} before maturity at blue score {3}")]
    ImmatureCoinbaseSpend(usize, TransactionOutpoint, u64, u64),

    #[error("total inputs {0} are lower than total outputs {1}")]
    SpendTooHigh(u64, u64),

    #[error("input {0} executes {2} signature operations while it declares {1}")]
    WrongSigOpCount(usize, u8, u64),

    #[error("transaction mass {0} is higher than the max allowed {1}")]
    MassTooHigh(u64, u64),

    #[error("script of input {0} failed: {1}")]
    SignatureInvalid(usize, TxScriptError),
}

pub type TxResult<T> = std::result::Result<T, TxRuleError>;

/// Block level consensus rule violations. A block failing any of these is never reconsidered unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleError {
    #[error("wrong block version: got {0} but expected {1}")]
    WrongBlockVersion(u16, u16),

    #[error("block has no parents")]
    NoParents,

    #[error("block has {0} parents where the max allowed is {1}")]
    TooManyParents(usize, usize),

    #[error("block parent {0} is listed more than once")]
    DuplicateParents(Hash),

    #[error("block parents {0:?} are unknown")]
    MissingParents(Vec<Hash>),

    #[error("parent {0} is known to be invalid")]
    InvalidParent(Hash),

    #[error("parent {0} is an ancestor of parent {1}")]
    InvalidParentsRelation(Hash, Hash),

    #[error("difficulty bits {0:#x} do not decode to a valid target")]
    InvalidDifficultyBits(u32),

    #[error("block hash is above the target of its difficulty bits")]
    InvalidPoW,

    #[error("block timestamp {0} is not after the past median time {1}")]
    TimeTooOld(u64, u64),

    #[error("header blue score {0} does not match the computed {1}")]
    UnexpectedBlueScore(u64, u64),

    #[error("header blue work {0} does not match the computed {1}")]
    UnexpectedBlueWork(BlueWorkType, BlueWorkType),

    #[error("mergeset size {0} is above the limit {1}")]
    MergeSetTooBig(u64, u64),

    #[error("block has no transactions")]
    NoTransactions,

    #[error("first transaction is not a coinbase")]
    FirstTxNotCoinbase,

    #[error("transaction at index {0} is an extra coinbase")]
    MultipleCoinbases(usize),

    #[error("transaction {0} appears more than once")]
    DuplicateTransactions(TransactionId),

    #[error("non-coinbase transactions are not sorted by subnetwork")]
    UnorderedSubnetworks,

    #[error("hash merkle root {0} does not match the computed {1}")]
    BadMerkleRoot(Hash, Hash),

    #[error("block mass {0} is above the limit {1}")]
    ExceedsMassLimit(u64, u64),

    #[error("transaction {0} is invalid: {1}")]
    TxInIsolationValidationFailed(TransactionId, TxRuleError),

    #[error("transaction {0} is invalid in the block's utxo context: {1}")]
    TxInContextFailed(TransactionId, TxRuleError),

    #[error("coinbase pays {0} while the block may pay at most {1}")]
    BadCoinbasePayoutAmount(u64, u64),

    #[error("coinbase payload blue score {0} does not match the block blue score {1}")]
    BadCoinbasePayloadBlueScore(u64, u64),

    #[error("accepted id merkle root {0} does not match the computed {1}")]
    BadAcceptedIDMerkleRoot(Hash, Hash),

    #[error("utxo commitment {0} does not match the computed {1}")]
    BadUTXOCommitment(Hash, Hash),

    #[error("block's selected chain does not contain the finality point {0}")]
    ViolatingFinality(Hash),
}

impl RuleError {
    /// Missing data is not a property of the block itself, so it must not be cached as invalid
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, RuleError::MissingParents(_))
    }
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReachabilityError {
    #[error("block {0} is not in the reachability store")]
    MissingBlock(Hash),

    #[error("block {0} already has reachability data")]
    BlockExists(Hash),

    #[error("reachability interval space is exhausted")]
    IntervalOverflow,
}

pub type ReachabilityResult<T> = std::result::Result<T, ReachabilityError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key {0} not found in store")]
    KeyNotFound(String),

    #[error("database error: {0}")]
    DbError(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Top level error returned by the consensus engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("operation was cancelled")]
    Cancelled,

    #[error("internal reachability error: {0}")]
    Reachability(#[from] ReachabilityError),

    #[error("utxo diff inconsistency: {0}")]
    UtxoAlgebra(#[from] UtxoAlgebraError),

    #[error("commit conflicted {0} times with concurrent commits")]
    CommitConflict(usize),

    #[error("block {0} is unknown")]
    UnknownBlock(Hash),

    #[error("block {0} is not on the virtual selected chain")]
    NotInSelectedChain(Hash),

    #[error("imported utxo set commits to {0} while the virtual selected parent commits to {1}")]
    UtxoSetCommitmentMismatch(Hash, Hash),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConsensusError {
    /// Transient errors say nothing about the block and the caller may retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ConsensusError::Storage(_) | ConsensusError::CommitConflict(_) | ConsensusError::Cancelled)
    }

    pub fn rule(&self) -> Option<&RuleError> {
        match self {
            ConsensusError::Rule(err) => Some(err),
            _ => None,
        }
    }
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;
