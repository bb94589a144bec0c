//! Validation rules for headers, block bodies and transactions.

pub mod block_validator;
pub mod contextual;
pub mod header_validator;
pub mod transaction_validator;

pub use block_validator::BlockValidator;
pub use contextual::ContextualValidator;
pub use header_validator::HeaderValidator;
pub use transaction_validator::{TestTransactionValidator, TransactionValidator, TxValidator};
