//! Script execution failures.
//!
//! The set is closed: every way the engine can reject a script maps to exactly
//! one variant, so callers can tell a malformed script from a bad signature
//! from a resource limit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxScriptError {
    #[error("internal consistency check failed: {0}")]
    Internal(String),
    #[error("invalid script flags {0:#x}")]
    InvalidFlags(u32),
    #[error("input index {0} is out of range for a transaction with {1} inputs")]
    InvalidIndex(usize, usize),
    #[error("script returned early")]
    EarlyReturn,
    #[error("stack empty at end of script execution")]
    EmptyStack,
    #[error("false stack entry at end of script execution")]
    EvalFalse,
    #[error("error check when script unfinished")]
    ScriptUnfinished,
    #[error("attempt to step past the last script")]
    InvalidProgramCounter,
    #[error("script of size {0} exceeds the maximum of {1}")]
    ScriptTooBig(usize, usize),
    #[error("element size {0} exceeds the maximum of {1}")]
    ElementTooBig(usize, usize),
    #[error("exceeded max operation limit of {0}")]
    TooManyOperations(usize),
    #[error("combined stack size {0} > max allowed {1}")]
    StackOverflow(usize, usize),
    #[error("invalid public key count: {0}")]
    InvalidPubKeyCount(String),
    #[error("invalid signature count: {0}")]
    InvalidSignatureCount(String),
    #[error("script number overflow: {0}")]
    NumberTooBig(String),
    #[error("OP_VERIFY failed")]
    VerifyFailed,
    #[error("OP_EQUALVERIFY failed")]
    EqualVerifyFailed,
    #[error("OP_NUMEQUALVERIFY failed")]
    NumEqualVerifyFailed,
    #[error("OP_CHECKSIGVERIFY failed")]
    CheckSigVerifyFailed,
    #[error("OP_CHECKMULTISIGVERIFY failed")]
    CheckMultiSigVerifyFailed,
    #[error("attempt to execute disabled opcode {0}")]
    DisabledOpcode(String),
    #[error("attempt to execute reserved opcode {0}")]
    ReservedOpcode(String),
    #[error("opcode requires {0} bytes, but script only has {1} remaining")]
    MalformedPush(usize, usize),
    #[error("attempt to read from a stack of size {1} at depth {0}")]
    InvalidStackOperation(usize, usize),
    #[error("end of script reached in conditional execution")]
    UnbalancedConditional,
    #[error("non-minimal encoding: {0}")]
    MinimalData(String),
    #[error("invalid hash type {0:#x}")]
    InvalidSigHashType(u8),
    #[error("invalid signature length {0}")]
    SigLength(usize),
    #[error("signature is not canonical due to unnecessarily high S value")]
    SigHighS,
    #[error("signature script is not push only")]
    NotPushOnly,
    #[error("unsupported public key format")]
    PubKeyFormat,
    #[error("stack contains {0} unexpected items")]
    CleanStack(usize),
    #[error("not all signatures empty on failed checkmultisig")]
    NullFail,
    #[error("negative lock time: {0}")]
    NegativeLockTime(i64),
    #[error("unsatisfied lock time: {0}")]
    UnsatisfiedLockTime(String),
    #[error("operand of OP_IF/OP_NOTIF must be empty or exactly 0x01")]
    MinimalIf,
}
