// ── Domains without attribute discriminators ──

use crate::model::{Capability, DeviceClass, DeviceDefinition, FeatureFlags};

pub(super) fn on_off_plug() -> DeviceDefinition {
    DeviceDefinition::base(DeviceClass::OnOffPlugInUnit).with(Capability::OnOff)
}

/// A plug that triggers `action` when switched on and then reports off.
pub(super) fn momentary(action: &str) -> DeviceDefinition {
    DeviceDefinition::base(DeviceClass::OnOffPlugInUnit).with(Capability::AutoOff {
        action: action.to_owned(),
    })
}

pub(super) fn door_lock() -> DeviceDefinition {
    DeviceDefinition::base(DeviceClass::DoorLock).with(Capability::DoorLock)
}

pub(super) fn media_player(flags: &FeatureFlags) -> DeviceDefinition {
    if flags.matter_speakers {
        DeviceDefinition::base(DeviceClass::Speaker)
            .with(Capability::OnOff)
            .with(Capability::LevelControl)
    } else {
        on_off_plug()
    }
}
