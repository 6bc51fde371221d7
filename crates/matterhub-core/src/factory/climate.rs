// ── climate ──
//
// Thermostat features come from the advertised HVAC modes. A climate
// entity that can neither heat nor cool (e.g. only "off" or "auto") has
// no valid thermostat representation.

use super::{BuildResult, has_feature};
use crate::error::InvalidDeviceDefinition;
use crate::model::{Capability, DeviceClass, DeviceDefinition, Entity, Measurement, ThermostatFeature};

const COOLING_MODES: [&str; 2] = ["heat_cool", "cool"];
const HEATING_MODES: [&str; 2] = ["heat_cool", "heat"];

const TURN_OFF: u64 = 128;
const TURN_ON: u64 = 256;

pub(super) fn build(entity: &Entity) -> BuildResult {
    let modes = entity.attribute_strings("hvac_modes");
    let cooling = modes.iter().any(|m| COOLING_MODES.contains(m));
    let heating = modes.iter().any(|m| HEATING_MODES.contains(m));

    let mut features = Vec::new();
    if cooling {
        features.push(ThermostatFeature::Cooling);
    }
    if heating {
        features.push(ThermostatFeature::Heating);
    }
    if cooling && heating {
        features.push(ThermostatFeature::AutoMode);
    }
    if features.is_empty() {
        return Err(InvalidDeviceDefinition::new(
            &entity.entity_id,
            "climates have to support either \"heating\" or \"cooling\"; just \"auto\" is not enough",
        ));
    }

    let bits = entity.attribute_u64("supported_features").unwrap_or_default();
    let switchable = has_feature(bits, TURN_ON) || has_feature(bits, TURN_OFF);

    Ok(DeviceDefinition::base(DeviceClass::Thermostat)
        .with(Capability::Thermostat { features })
        .with_if(
            entity.has_attribute("current_humidity"),
            Capability::Measurement {
                kind: Measurement::Humidity,
            },
        )
        .with_if(switchable, Capability::OnOff))
}
