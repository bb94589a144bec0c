//! Block processing pipeline
//!
//! A block moves through header processing (DAG position, GHOSTDAG, finality),
//! body processing (UTXO acceptance and commitments) and finally the virtual
//! update, all against one staging area that is committed at the end.

pub mod block_processor;
pub mod body_processor;
pub mod header_processor;
pub mod virtual_processor;

pub use block_processor::BlockProcessor;
pub use body_processor::BodyProcessor;
pub use header_processor::{HeaderContext, HeaderProcessor};
pub use virtual_processor::{ChainChange, VirtualProcessor};

use consensus_core::errors::{ConsensusError, ConsensusResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and a running validation.
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] was called
    pub fn check(&self) -> ConsensusResult<()> {
        if self.is_cancelled() {
            return Err(ConsensusError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert_eq!(observer.check(), Ok(()));
        token.cancel();
        assert!(observer.is_cancelled());
        assert_eq!(observer.check(), Err(ConsensusError::Cancelled));
    }
}
