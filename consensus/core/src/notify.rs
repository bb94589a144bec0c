//! Events the engine publishes after committing state.

use crate::tx::TransactionId;
use crate::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Transactions accepted by one newly added chain block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedTransactionIds {
    pub accepting_block_hash: Hash,
    pub accepted_transaction_ids: Vec<TransactionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualChainChangedNotification {
    /// Chain blocks that left the virtual selected chain, highest first
    pub removed_chain_block_hashes: Arc<Vec<Hash>>,
    /// Chain blocks that joined the virtual selected chain, lowest first
    pub added_chain_block_hashes: Arc<Vec<Hash>>,
    /// Empty unless the subscriber asked for accepted transaction ids
    pub accepted_transaction_ids: Arc<Vec<AcceptedTransactionIds>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    VirtualChainChanged(VirtualChainChangedNotification),
    FinalityConflict { violating_block_hash: Hash },
    FinalityConflictResolved { finality_block_hash: Hash },
    PruningPointUtxoSetOverride,
}

impl Notification {
    pub fn event_type(&self) -> EventType {
        match self {
            Notification::VirtualChainChanged(_) => EventType::VirtualChainChanged,
            Notification::FinalityConflict { .. } => EventType::FinalityConflict,
            Notification::FinalityConflictResolved { .. } => EventType::FinalityConflictResolved,
            Notification::PruningPointUtxoSetOverride => EventType::PruningPointUtxoSetOverride,
        }
    }

    /// The view of this notification a subscriber with `options` receives
    pub fn apply_options(&self, options: &SubscriptionOptions) -> Notification {
        match self {
            Notification::VirtualChainChanged(data) if !options.include_accepted_transaction_ids => {
                Notification::VirtualChainChanged(VirtualChainChangedNotification {
                    removed_chain_block_hashes: data.removed_chain_block_hashes.clone(),
                    added_chain_block_hashes: data.added_chain_block_hashes.clone(),
                    accepted_transaction_ids: Arc::new(Vec::new()),
                })
            }
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    VirtualChainChanged,
    FinalityConflict,
    FinalityConflictResolved,
    PruningPointUtxoSetOverride,
}

/// What a subscriber wants to receive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionOptions {
    /// Event types to deliver; empty means all of them
    pub events: Vec<EventType>,
    pub include_accepted_transaction_ids: bool,
}

impl SubscriptionOptions {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_accepted_transaction_ids(mut self) -> Self {
        self.include_accepted_transaction_ids = true;
        self
    }

    pub fn only(events: Vec<EventType>) -> Self {
        Self { events, include_accepted_transaction_ids: false }
    }

    pub fn wants(&self, event: EventType) -> bool {
        self.events.is_empty() || self.events.contains(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_ids_are_stripped_unless_requested() {
        let notification = Notification::VirtualChainChanged(VirtualChainChangedNotification {
            removed_chain_block_hashes: Arc::new(vec![]),
            added_chain_block_hashes: Arc::new(vec![Hash::from_u64_word(1)]),
            accepted_transaction_ids: Arc::new(vec![AcceptedTransactionIds {
                accepting_block_hash: Hash::from_u64_word(1),
                accepted_transaction_ids: vec![Hash::from_u64_word(9)],
            }]),
        });
        let Notification::VirtualChainChanged(plain) = notification.apply_options(&SubscriptionOptions::all()) else { panic!() };
        assert!(plain.accepted_transaction_ids.is_empty());
        assert_eq!(plain.added_chain_block_hashes.len(), 1);
        let full = notification.apply_options(&SubscriptionOptions::all().with_accepted_transaction_ids());
        assert_eq!(full, notification);
    }

    #[test]
    fn event_filter() {
        let options = SubscriptionOptions::only(vec![EventType::FinalityConflict]);
        assert!(options.wants(EventType::FinalityConflict));
        assert!(!options.wants(EventType::VirtualChainChanged));
        assert!(SubscriptionOptions::all().wants(EventType::PruningPointUtxoSetOverride));
    }
}
