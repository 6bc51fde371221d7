// ── In-process entity source ──
//
// A fixed entity universe with push fan-out. Used for dry runs against
// an entity dump and as the hub stand-in in tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

use super::{EntitySource, StateBatch, StateSubscription};
use crate::error::CoreError;
use crate::model::Entity;

const BATCH_CHANNEL_SIZE: usize = 64;

struct Subscriber {
    entity_ids: HashSet<String>,
    tx: mpsc::Sender<StateBatch>,
}

/// Entity source backed by an in-memory entity list.
pub struct StaticEntitySource {
    entities: ArcSwap<Vec<Entity>>,
    subscribers: Arc<DashMap<u64, Subscriber>>,
    next_subscriber: AtomicU64,
}

impl StaticEntitySource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: ArcSwap::from_pointee(entities),
            subscribers: Arc::new(DashMap::new()),
            next_subscriber: AtomicU64::new(0),
        }
    }

    /// Replace the whole entity universe (entities added or removed on the hub).
    pub fn set_entities(&self, entities: Vec<Entity>) {
        self.entities.store(Arc::new(entities));
    }

    pub fn entities(&self) -> Arc<Vec<Entity>> {
        self.entities.load_full()
    }

    /// Number of subscriptions that have not been torn down.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.len()
    }

    /// Entity ids of every live subscription.
    pub fn subscribed_ids(&self) -> Vec<HashSet<String>> {
        self.subscribers
            .iter()
            .map(|s| s.value().entity_ids.clone())
            .collect()
    }

    /// Record new states and push them to every subscriber tracking them.
    ///
    /// Returns the number of subscribers that received a batch.
    pub async fn publish(&self, batch: StateBatch) -> usize {
        self.entities.rcu(|current| {
            current
                .iter()
                .map(|e| match batch.get(&e.entity_id) {
                    Some(state) => e.with_state(state.clone()),
                    None => e.clone(),
                })
                .collect::<Vec<_>>()
        });

        // Collect senders first; no shard guard may be held across `send`.
        let targets: Vec<(mpsc::Sender<StateBatch>, StateBatch)> = self
            .subscribers
            .iter()
            .filter_map(|s| {
                let scoped: StateBatch = batch
                    .iter()
                    .filter(|(id, _)| s.entity_ids.contains(*id))
                    .map(|(id, state)| (id.clone(), state.clone()))
                    .collect();
                (!scoped.is_empty()).then(|| (s.tx.clone(), scoped))
            })
            .collect();

        let mut delivered = 0;
        for (tx, scoped) in targets {
            if tx.send(scoped).await.is_ok() {
                delivered += 1;
            }
        }
        trace!(delivered, "published state batch");
        delivered
    }
}

#[async_trait]
impl EntitySource for StaticEntitySource {
    async fn all_entities(&self) -> Result<Vec<Entity>, CoreError> {
        Ok(self.entities.load().as_ref().clone())
    }

    async fn subscribe_states(&self, entity_ids: Vec<String>) -> Result<StateSubscription, CoreError> {
        let (tx, rx) = mpsc::channel(BATCH_CHANNEL_SIZE);
        let key = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(
            key,
            Subscriber {
                entity_ids: entity_ids.into_iter().collect(),
                tx,
            },
        );

        let subscribers = Arc::clone(&self.subscribers);
        Ok(StateSubscription::new(rx, move || {
            subscribers.remove(&key);
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::EntityState;

    fn source() -> StaticEntitySource {
        StaticEntitySource::new(vec![
            Entity::new("light.a", EntityState::new("off")),
            Entity::new("light.b", EntityState::new("off")),
        ])
    }

    #[tokio::test]
    async fn publish_is_scoped_to_subscribed_ids() {
        let source = source();
        let mut sub = source.subscribe_states(vec!["light.a".into()]).await.unwrap();

        let batch: StateBatch = [
            ("light.a".to_owned(), EntityState::new("on")),
            ("light.b".to_owned(), EntityState::new("on")),
        ]
        .into_iter()
        .collect();
        assert_eq!(source.publish(batch).await, 1);

        let received = sub.next_batch().await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received["light.a"].state, "on");

        // The universe reflects the published states.
        let all = source.all_entities().await.unwrap();
        assert!(all.iter().all(|e| e.state.state == "on"));
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters() {
        let source = source();
        let sub = source.subscribe_states(vec!["light.b".into()]).await.unwrap();
        assert_eq!(source.active_subscriptions(), 1);
        drop(sub);
        assert_eq!(source.active_subscriptions(), 0);
    }
}
