// ── In-process device tree ──
//
// Keeps endpoints in a reactive collection and counts every mutation.
// Backs dry runs of a bridge and stands in for the protocol stack in
// tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::trace;

use super::collection::EndpointCollection;
use super::{DeviceTree, Endpoint};
use crate::error::CoreError;
use crate::model::{DeviceDefinition, EndpointId, Entity};

/// Mutation counters of a [`MemoryDeviceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub created: usize,
    pub deleted: usize,
    pub rebound: usize,
}

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    deleted: AtomicUsize,
    rebound: AtomicUsize,
}

pub struct MemoryDeviceTree {
    endpoints: EndpointCollection<Endpoint>,
    counters: Counters,
}

impl MemoryDeviceTree {
    pub fn new() -> Self {
        Self {
            endpoints: EndpointCollection::new(),
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            created: self.counters.created.load(Ordering::SeqCst),
            deleted: self.counters.deleted.load(Ordering::SeqCst),
            rebound: self.counters.rebound.load(Ordering::SeqCst),
        }
    }

    pub fn get(&self, id: &EndpointId) -> Option<Arc<Endpoint>> {
        self.endpoints.get(id)
    }

    /// All endpoints, sorted by id.
    pub fn snapshot(&self) -> Vec<Arc<Endpoint>> {
        let mut endpoints = self.endpoints.snapshot().as_ref().clone();
        endpoints.sort_by(|a, b| a.id.cmp(&b.id));
        endpoints
    }

    /// Watch the endpoint set; the receiver yields a new snapshot per mutation.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Endpoint>>>> {
        self.endpoints.subscribe()
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        self.endpoints.version()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryDeviceTree {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTree for MemoryDeviceTree {
    async fn create_endpoint(
        &self,
        id: &EndpointId,
        definition: &DeviceDefinition,
        entity: &Entity,
    ) -> Result<(), CoreError> {
        let endpoint = Endpoint {
            id: id.clone(),
            definition: definition.clone(),
            entity: entity.clone(),
        };
        if !self.endpoints.insert_new(id.clone(), endpoint) {
            return Err(CoreError::device_tree(id, "an endpoint with this id already exists"));
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        trace!(endpoint = %id, class = %definition.device_class, "endpoint created");
        Ok(())
    }

    async fn delete_endpoint(&self, id: &EndpointId) -> Result<(), CoreError> {
        if self.endpoints.remove(id).is_none() {
            return Err(CoreError::device_tree(id, "no such endpoint"));
        }
        self.counters.deleted.fetch_add(1, Ordering::SeqCst);
        trace!(endpoint = %id, "endpoint deleted");
        Ok(())
    }

    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, CoreError> {
        Ok(self.snapshot().iter().map(|e| e.as_ref().clone()).collect())
    }

    async fn endpoint(&self, id: &EndpointId) -> Result<Option<Endpoint>, CoreError> {
        Ok(self.endpoints.get(id).map(|e| e.as_ref().clone()))
    }

    async fn rebind_entity(&self, id: &EndpointId, entity: Entity) -> Result<(), CoreError> {
        let Some(current) = self.endpoints.get(id) else {
            return Err(CoreError::device_tree(id, "no such endpoint"));
        };
        let endpoint = Endpoint {
            entity,
            ..current.as_ref().clone()
        };
        if !self.endpoints.replace(id, endpoint) {
            return Err(CoreError::device_tree(id, "endpoint disappeared during rebind"));
        }
        self.counters.rebound.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceClass, EntityState};

    fn plug() -> DeviceDefinition {
        DeviceDefinition::base(DeviceClass::OnOffPlugInUnit)
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let tree = MemoryDeviceTree::new();
        let entity = Entity::new("switch.a", EntityState::new("on"));
        let id = EndpointId::derive(&entity.entity_id);

        tree.create_endpoint(&id, &plug(), &entity).await.unwrap();
        assert!(tree.create_endpoint(&id, &plug(), &entity).await.is_err());
        assert_eq!(tree.stats().created, 1);
    }

    #[tokio::test]
    async fn rebind_keeps_definition() {
        let tree = MemoryDeviceTree::new();
        let entity = Entity::new("switch.a", EntityState::new("on"));
        let id = EndpointId::derive(&entity.entity_id);
        tree.create_endpoint(&id, &plug(), &entity).await.unwrap();

        tree.rebind_entity(&id, entity.with_state(EntityState::new("off")))
            .await
            .unwrap();

        let endpoint = tree.endpoint(&id).await.unwrap().unwrap();
        assert_eq!(endpoint.entity.state.state, "off");
        assert_eq!(endpoint.device_class(), DeviceClass::OnOffPlugInUnit);
        assert_eq!(tree.stats().rebound, 1);
    }

    #[tokio::test]
    async fn missing_endpoints_are_errors() {
        let tree = MemoryDeviceTree::new();
        let id = EndpointId::derive("switch.ghost");
        assert!(tree.delete_endpoint(&id).await.is_err());
        let entity = Entity::new("switch.ghost", EntityState::new("on"));
        assert!(tree.rebind_entity(&id, entity).await.is_err());
        assert!(tree.endpoint(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscribers_track_the_endpoint_set() {
        let tree = MemoryDeviceTree::new();
        let mut rx = tree.subscribe();
        let entity = Entity::new("switch.a", EntityState::new("on"));
        tree.create_endpoint(&EndpointId::derive("switch.a"), &plug(), &entity)
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
        assert_eq!(tree.version(), 1);
    }
}
