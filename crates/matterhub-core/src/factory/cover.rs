// ── cover ──

use super::{BuildResult, has_feature};
use crate::error::InvalidDeviceDefinition;
use crate::model::{Capability, DeviceClass, DeviceDefinition, Entity, FeatureFlags};

const OPEN: u64 = 1;
const CLOSE: u64 = 2;
const SET_POSITION: u64 = 4;
const OPEN_TILT: u64 = 16;
const CLOSE_TILT: u64 = 32;
const SET_TILT_POSITION: u64 = 128;

pub(super) fn build(entity: &Entity, flags: &FeatureFlags) -> BuildResult {
    let bits = entity.attribute_u64("supported_features").unwrap_or_default();
    let lift = [OPEN, CLOSE, SET_POSITION].into_iter().any(|f| has_feature(bits, f));
    let tilt = [OPEN_TILT, CLOSE_TILT, SET_TILT_POSITION]
        .into_iter()
        .any(|f| has_feature(bits, f));

    if !lift && !tilt {
        return Err(InvalidDeviceDefinition::new(
            &entity.entity_id,
            "covers have to support lift or tilt movements",
        ));
    }

    Ok(DeviceDefinition::base(DeviceClass::WindowCovering).with(Capability::WindowCovering {
        lift,
        tilt,
        invert_percentage: !flags.cover_do_not_invert_percentage,
        swap_open_close: flags.cover_swap_open_close,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::EntityState;

    fn cover(bits: u64) -> Entity {
        Entity::new(
            "cover.blinds",
            EntityState::new("open").with_attribute("supported_features", bits),
        )
    }

    #[test]
    fn lift_and_tilt_from_bitmask() {
        let def = build(&cover(OPEN | CLOSE | SET_TILT_POSITION), &FeatureFlags::default()).unwrap();
        assert!(def.has(&Capability::WindowCovering {
            lift: true,
            tilt: true,
            invert_percentage: true,
            swap_open_close: false,
        }));
    }

    #[test]
    fn no_movement_is_invalid() {
        assert!(build(&cover(8), &FeatureFlags::default()).is_err());
    }

    #[test]
    fn flags_control_percentage_presentation() {
        let flags = FeatureFlags {
            cover_do_not_invert_percentage: true,
            cover_swap_open_close: true,
            ..FeatureFlags::default()
        };
        let def = build(&cover(SET_POSITION), &flags).unwrap();
        assert!(def.has(&Capability::WindowCovering {
            lift: true,
            tilt: false,
            invert_percentage: false,
            swap_open_close: true,
        }));
    }
}
