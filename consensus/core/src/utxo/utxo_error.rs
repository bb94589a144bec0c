use crate::tx::TransactionOutpoint;
use thiserror::Error;

/// Inconsistencies found while composing or applying UTXO diffs. Any of these
/// means two diffs that should be sequential were not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtxoAlgebraError {
    #[error("outpoint {0} is removed twice")]
    DuplicateRemovePoint(TransactionOutpoint),

    #[error("outpoint {0} is added twice")]
    DuplicateAddPoint(TransactionOutpoint),

    #[error("outpoint {0} is removed but is not in the base set")]
    MissingRemovePoint(TransactionOutpoint),
}

pub type UtxoResult<T> = std::result::Result<T, UtxoAlgebraError>;
