// ── Device definition factory ──
//
// Maps an eligible entity to a device definition. Dispatch is a closed
// match over `Domain`; each domain module inspects attributes (device
// class, color modes, feature bitmasks) to pick a specialization and
// falls back to the domain default when the discriminator is unset or
// unknown.

mod binary_sensor;
mod climate;
mod cover;
mod fan;
mod light;
mod sensor;
mod simple;

use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::InvalidDeviceDefinition;
use crate::model::{DeviceDefinition, Entity, FeatureFlags};

/// Entity domains that can be exposed as devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Automation,
    BinarySensor,
    Button,
    Climate,
    Cover,
    Fan,
    InputBoolean,
    InputButton,
    Light,
    Lock,
    MediaPlayer,
    Scene,
    Script,
    Sensor,
    Switch,
}

impl Domain {
    /// The domain of an entity, or `None` when it cannot be exposed.
    pub fn of(entity: &Entity) -> Option<Self> {
        Self::from_str(entity.domain()).ok()
    }
}

/// Result of mapping one entity.
pub type BuildResult = Result<DeviceDefinition, InvalidDeviceDefinition>;

/// Build the device definition for an entity.
pub fn build(entity: &Entity, flags: &FeatureFlags) -> BuildResult {
    let Some(domain) = Domain::of(entity) else {
        return Err(InvalidDeviceDefinition::UnsupportedDomain {
            domain: entity.domain().to_owned(),
        });
    };

    match domain {
        Domain::BinarySensor => Ok(binary_sensor::build(entity, flags)),
        Domain::Sensor => sensor::build(entity),
        Domain::Climate => climate::build(entity),
        Domain::Light => Ok(light::build(entity)),
        Domain::Cover => cover::build(entity, flags),
        Domain::Fan => Ok(fan::build(entity, flags)),
        Domain::Switch | Domain::InputBoolean | Domain::Automation | Domain::Script => {
            Ok(simple::on_off_plug())
        }
        Domain::Button => Ok(simple::momentary("button.press")),
        Domain::InputButton => Ok(simple::momentary("input_button.press")),
        Domain::Scene => Ok(simple::momentary("scene.turn_on")),
        Domain::Lock => Ok(simple::door_lock()),
        Domain::MediaPlayer => Ok(simple::media_player(flags)),
    }
}

/// Whether `bits` has every bit of `flag` set.
pub(crate) fn has_feature(bits: u64, flag: u64) -> bool {
    bits & flag == flag
}
