// ── Remote entity source ──
//
// The hub connection is an external collaborator. The engine needs two
// things from it: the full entity universe, and a push subscription of
// state batches scoped to a set of entity ids.

mod static_source;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::model::{Entity, EntityState};

pub use static_source::StaticEntitySource;

/// One push update from the hub: new states keyed by entity id.
pub type StateBatch = HashMap<String, EntityState>;

/// Capability provided by the hub connection.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Every entity currently known to the hub, with registry metadata.
    async fn all_entities(&self) -> Result<Vec<Entity>, CoreError>;

    /// Subscribe to state changes of exactly `entity_ids`.
    async fn subscribe_states(&self, entity_ids: Vec<String>) -> Result<StateSubscription, CoreError>;
}

/// A live state subscription.
///
/// Dropping the subscription (or its [`Unsubscribe`] half) ends it.
pub struct StateSubscription {
    batches: mpsc::Receiver<StateBatch>,
    unsubscribe: Unsubscribe,
}

impl StateSubscription {
    pub fn new(batches: mpsc::Receiver<StateBatch>, on_unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            batches,
            unsubscribe: Unsubscribe(Some(Box::new(on_unsubscribe))),
        }
    }

    /// Wait for the next batch. `None` once the source closed the stream.
    pub async fn next_batch(&mut self) -> Option<StateBatch> {
        self.batches.recv().await
    }

    /// Separate the batch receiver from the teardown handle, so the
    /// receiver can move into a consumer task while the owner keeps
    /// control over when the subscription ends.
    pub fn split(self) -> (mpsc::Receiver<StateBatch>, Unsubscribe) {
        (self.batches, self.unsubscribe)
    }
}

/// Teardown handle of a [`StateSubscription`]; runs its hook exactly once.
pub struct Unsubscribe(Option<Box<dyn FnOnce() + Send>>);

impl Unsubscribe {
    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.0.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hook_runs_once_on_explicit_unsubscribe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::channel(1);
        let counter = Arc::clone(&calls);
        let sub = StateSubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let (_rx, handle) = sub.split();
        handle.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_runs_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::channel(1);
        let counter = Arc::clone(&calls);
        drop(StateSubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
