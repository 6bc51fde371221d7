//! Bridge synchronization engine between a home-automation hub and an
//! exposed smart-home device tree.
//!
//! This crate owns the business logic of a bridge: which hub entities are
//! exposed, what device each becomes, and how the exposed tree is kept in
//! sync with the hub:
//!
//! - **[`BridgeDeviceManager`]**: Central facade for one bridge.
//!   [`load()`](BridgeDeviceManager::load) filters the hub's entities,
//!   reconciles the device tree, then subscribes to state changes of the
//!   tracked entities and propagates them in a background task.
//!
//! - **[`eligibility`]**: Pure include/exclude evaluation with
//!   human-readable exclusion reasons.
//!
//! - **[`factory`]**: Maps an entity to a [`DeviceDefinition`]: a device
//!   class plus an ordered capability list.
//!
//! - **[`Reconciler`]** / **[`StatePipeline`]**: Endpoint set
//!   reconciliation and per-entity serialized state propagation.
//!
//! - **[`BridgeStore`]**: Persisted bridge configurations with a
//!   sequential migration chain over a pluggable [`Storage`] backend.
//!
//! - **Collaborators**: [`EntitySource`] (the hub) and [`DeviceTree`]
//!   (the protocol stack) are traits; [`StaticEntitySource`] and
//!   [`MemoryDeviceTree`] are in-process implementations.

pub mod eligibility;
pub mod error;
pub mod factory;
pub mod lock;
pub mod manager;
pub mod model;
pub mod propagate;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use eligibility::ExclusionReason;
pub use error::{CoreError, InvalidDeviceDefinition, StoreError};
pub use factory::Domain;
pub use lock::KeyedLock;
pub use manager::{BridgeDeviceManager, ManagerState};
pub use propagate::{BatchOutcome, StatePipeline};
pub use reconcile::{ReconcileReport, Reconciled, Reconciler};
pub use source::{EntitySource, StateBatch, StateSubscription, StaticEntitySource, Unsubscribe};
pub use store::{BridgeStore, FileStorage, MemoryStorage, Storage};
pub use tree::{DeviceTree, Endpoint, MemoryDeviceTree, TreeStats};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    BridgeConfig, Capability, DeviceClass, DeviceDefinition, EndpointId, Entity, EntityFilter,
    EntityRegistry, EntityState, FeatureFlags, Matcher,
};
