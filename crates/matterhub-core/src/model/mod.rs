// ── Domain model ──

pub mod bridge;
pub mod device;
pub mod endpoint_id;
pub mod entity;

pub use bridge::{BridgeConfig, EntityFilter, FeatureFlags, Matcher};
pub use device::{
    Capability, ColorFeature, DeviceClass, DeviceDefinition, Measurement, ThermostatFeature,
};
pub use endpoint_id::EndpointId;
pub use entity::{Entity, EntityRegistry, EntityState, domain_of};
