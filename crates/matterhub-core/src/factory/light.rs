// ── light ──

use crate::model::{Capability, ColorFeature, DeviceClass, DeviceDefinition, Entity};

pub(super) fn build(entity: &Entity) -> DeviceDefinition {
    let modes = entity.attribute_strings("supported_color_modes");
    let has = |mode: &str| modes.contains(&mode);

    let hue_saturation = has("hs") || has("rgb") || has("rgbw") || has("rgbww");
    let xy = has("xy");
    let color_temp = has("color_temp");
    let dimmable = has("brightness") || has("white") || hue_saturation || xy || color_temp;

    if hue_saturation || xy {
        let mut features = Vec::new();
        if hue_saturation {
            features.push(ColorFeature::HueSaturation);
        }
        if xy {
            features.push(ColorFeature::Xy);
        }
        if color_temp {
            features.push(ColorFeature::ColorTemperature);
        }
        return DeviceDefinition::base(DeviceClass::ExtendedColorLight)
            .with(Capability::OnOff)
            .with(Capability::LevelControl)
            .with(Capability::ColorControl { features });
    }

    if color_temp {
        return DeviceDefinition::base(DeviceClass::ColorTemperatureLight)
            .with(Capability::OnOff)
            .with(Capability::LevelControl)
            .with(Capability::ColorControl {
                features: vec![ColorFeature::ColorTemperature],
            });
    }

    if dimmable {
        return DeviceDefinition::base(DeviceClass::DimmableLight)
            .with(Capability::OnOff)
            .with(Capability::LevelControl);
    }

    DeviceDefinition::base(DeviceClass::OnOffLight).with(Capability::OnOff)
}
