// ── Reactive endpoint collection ──
//
// Concurrent storage with O(1) lookups and push-based change
// notification via `watch` channels.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::EndpointId;

/// A concurrent, reactive collection of endpoints (or any value keyed
/// by endpoint id).
///
/// Every mutation bumps a version counter and rebuilds the snapshot
/// that subscribers receive.
pub(crate) struct EndpointCollection<T: Clone + Send + Sync + 'static> {
    by_id: DashMap<EndpointId, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EndpointCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert only if the id is free. Returns `false` when it was taken.
    pub(crate) fn insert_new(&self, id: EndpointId, value: T) -> bool {
        let inserted = match self.by_id.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(value));
                true
            }
        };
        if inserted {
            self.changed();
        }
        inserted
    }

    /// Replace the value of an existing id. Returns `false` if absent.
    pub(crate) fn replace(&self, id: &EndpointId, value: T) -> bool {
        let replaced = match self.by_id.get_mut(id) {
            Some(mut slot) => {
                *slot = Arc::new(value);
                true
            }
            None => false,
        };
        if replaced {
            self.changed();
        }
        replaced
    }

    /// Remove a value by id. Returns the removed value if it existed.
    pub(crate) fn remove(&self, id: &EndpointId) -> Option<Arc<T>> {
        let removed = self.by_id.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            self.changed();
        }
        removed
    }

    pub(crate) fn get(&self, id: &EndpointId) -> Option<Arc<T>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn changed(&self) {
        let values: Vec<Arc<T>> = self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
