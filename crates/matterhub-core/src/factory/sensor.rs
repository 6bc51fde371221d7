// ── sensor ──

use super::BuildResult;
use crate::error::InvalidDeviceDefinition;
use crate::model::{Capability, DeviceClass, DeviceDefinition, Entity, Measurement};

pub(super) fn build(entity: &Entity) -> BuildResult {
    let (class, kind) = match entity.attribute_str("device_class") {
        Some("temperature") => (DeviceClass::TemperatureSensor, Measurement::Temperature),
        Some("humidity") => (DeviceClass::HumiditySensor, Measurement::Humidity),
        Some("illuminance") => (DeviceClass::LightSensor, Measurement::Illuminance),
        Some("pressure" | "atmospheric_pressure") => (DeviceClass::PressureSensor, Measurement::Pressure),
        Some(other) => {
            return Err(InvalidDeviceDefinition::new(
                &entity.entity_id,
                format!("sensor device class '{other}' is not supported"),
            ));
        }
        None => {
            return Err(InvalidDeviceDefinition::new(
                &entity.entity_id,
                "sensors without a device class cannot be exposed",
            ));
        }
    };
    Ok(DeviceDefinition::base(class).with(Capability::Measurement { kind }))
}
