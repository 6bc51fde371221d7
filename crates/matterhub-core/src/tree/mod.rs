// ── Exposed device tree ──
//
// The protocol stack that actually serves endpoints is an external
// collaborator. The engine creates, deletes, lists, and rebinds
// endpoints through this trait and never looks inside capabilities.

mod collection;
mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{DeviceClass, DeviceDefinition, EndpointId, Entity};

pub use memory::{MemoryDeviceTree, TreeStats};

/// An endpoint as currently exposed by the device tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub definition: DeviceDefinition,
    /// Entity snapshot the endpoint is bound to.
    pub entity: Entity,
}

impl Endpoint {
    pub fn device_class(&self) -> DeviceClass {
        self.definition.device_class
    }
}

/// Mutation and query capability of the exposed device tree.
#[async_trait]
pub trait DeviceTree: Send + Sync {
    /// Add an endpoint. Fails if the id is already taken.
    async fn create_endpoint(
        &self,
        id: &EndpointId,
        definition: &DeviceDefinition,
        entity: &Entity,
    ) -> Result<(), CoreError>;

    async fn delete_endpoint(&self, id: &EndpointId) -> Result<(), CoreError>;

    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, CoreError>;

    async fn endpoint(&self, id: &EndpointId) -> Result<Option<Endpoint>, CoreError> {
        Ok(self.list_endpoints().await?.into_iter().find(|e| &e.id == id))
    }

    /// Replace the entity snapshot bound to an endpoint.
    async fn rebind_entity(&self, id: &EndpointId, entity: Entity) -> Result<(), CoreError>;
}
