// ── fan ──

use super::has_feature;
use crate::model::{Capability, DeviceClass, DeviceDefinition, Entity, FeatureFlags};

const SET_SPEED: u64 = 1;
const TURN_OFF: u64 = 16;
const TURN_ON: u64 = 32;

pub(super) fn build(entity: &Entity, flags: &FeatureFlags) -> DeviceDefinition {
    let bits = entity.attribute_u64("supported_features").unwrap_or_default();
    let switchable = has_feature(bits, TURN_ON) || has_feature(bits, TURN_OFF);

    DeviceDefinition::base(DeviceClass::Fan)
        .with(Capability::FanControl {
            multi_speed: has_feature(bits, SET_SPEED),
            full_conformance: flags.matter_fans,
        })
        .with_if(switchable, Capability::OnOff)
}
