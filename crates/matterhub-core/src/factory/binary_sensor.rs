// ── binary_sensor ──

use crate::model::{Capability, DeviceClass, DeviceDefinition, Entity, FeatureFlags};

fn contact(inverted: bool) -> DeviceDefinition {
    DeviceDefinition::base(DeviceClass::ContactSensor).with(Capability::BooleanState { inverted })
}

fn on_off_sensor() -> DeviceDefinition {
    DeviceDefinition::base(DeviceClass::OnOffSensor).with(Capability::OnOff)
}

pub(super) fn build(entity: &Entity, flags: &FeatureFlags) -> DeviceDefinition {
    match entity.attribute_str("device_class") {
        Some("occupancy" | "motion" | "moving" | "presence") => {
            DeviceDefinition::base(DeviceClass::OccupancySensor).with(Capability::OccupancySensing)
        }
        // Contact sensors report "closed" as true; the hub reports "open" as on.
        Some("door" | "window" | "garage_door" | "lock") => contact(true),
        Some("moisture") => DeviceDefinition::base(DeviceClass::WaterLeakDetector)
            .with(Capability::BooleanState { inverted: false }),
        _ if flags.use_on_off_sensor_as_default_for_binary_sensors => on_off_sensor(),
        _ => contact(false),
    }
}
