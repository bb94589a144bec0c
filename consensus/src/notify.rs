//! Notification fan-out
//!
//! The commit path publishes into a broadcast channel. Every subscriber gets
//! its own task; a panicking handler is logged and the task keeps serving.

use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::notify::{Notification, SubscriptionOptions};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

pub struct Notifier {
    sender: broadcast::Sender<Notification>,
    next_subscriber_id: AtomicU64,
}

/// A running subscriber task. Dropping the handle leaves the task running.
pub struct Subscription {
    pub id: u64,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, next_subscriber_id: AtomicU64::new(0) }
    }

    pub fn notify(&self, notification: Notification) {
        // an error only means nobody is listening
        if self.sender.send(notification).is_err() {
            trace!("notification dropped, no subscribers");
        }
    }

    /// Raw receiver of every notification, unfiltered
    pub fn receiver(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Spawns a task on the current tokio runtime feeding `handler` with the notifications `options` selects
    pub fn subscribe<F>(&self, options: SubscriptionOptions, handler: F) -> ConsensusResult<Subscription>
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|err| ConsensusError::Config(format!("subscribing needs a tokio runtime: {err}")))?;
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let mut receiver = self.sender.subscribe();
        let task = runtime.spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(notification) => {
                        if !options.wants(notification.event_type()) {
                            continue;
                        }
                        let notification = notification.apply_options(&options);
                        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(notification))) {
                            warn!("notification subscriber {} panicked: {}", id, panic_message(panic.as_ref()));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => warn!("notification subscriber {} lagged, {} notifications skipped", id, skipped),
                    Err(RecvError::Closed) => break,
                }
            }
            trace!("notification subscriber {} finished", id);
        });
        Ok(Subscription { id, task })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return message;
    }
    panic.downcast_ref::<String>().map(String::as_str).unwrap_or("unknown panic")
}
