// ── Device definitions ──
//
// Output of mapping one entity: a device class plus an ordered list of
// capability descriptors. The device tree interprets the capabilities;
// the engine only compares device classes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device type of an exposed endpoint.
///
/// Two definitions with the same class can be swapped by rebinding the
/// entity snapshot; a class change requires recreating the endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeviceClass {
    OnOffLight,
    DimmableLight,
    ColorTemperatureLight,
    ExtendedColorLight,
    OnOffPlugInUnit,
    OnOffSensor,
    ContactSensor,
    OccupancySensor,
    WaterLeakDetector,
    TemperatureSensor,
    HumiditySensor,
    LightSensor,
    PressureSensor,
    Thermostat,
    WindowCovering,
    Fan,
    DoorLock,
    Speaker,
}

/// Thermostat features derived from the supported HVAC modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermostatFeature {
    Heating,
    Cooling,
    AutoMode,
}

/// Color control features of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFeature {
    HueSaturation,
    Xy,
    ColorTemperature,
}

/// Which measured quantity a measurement capability reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Temperature,
    Humidity,
    Illuminance,
    Pressure,
}

/// One behavior attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "capability", rename_all = "snake_case")]
pub enum Capability {
    BasicInformation,
    Identify,
    /// Binds the endpoint to its entity snapshot; every definition has one.
    EntityBinding,
    OnOff,
    /// Momentary on: the action is called and the endpoint switches back off.
    AutoOff { action: String },
    LevelControl,
    ColorControl { features: Vec<ColorFeature> },
    BooleanState { inverted: bool },
    OccupancySensing,
    Measurement { kind: Measurement },
    Thermostat { features: Vec<ThermostatFeature> },
    WindowCovering {
        lift: bool,
        tilt: bool,
        invert_percentage: bool,
        swap_open_close: bool,
    },
    FanControl { multi_speed: bool, full_conformance: bool },
    DoorLock,
}

/// A complete device definition for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    pub device_class: DeviceClass,
    pub capabilities: Vec<Capability>,
}

impl DeviceDefinition {
    /// Start a definition with the capabilities every endpoint carries.
    pub fn base(device_class: DeviceClass) -> Self {
        Self {
            device_class,
            capabilities: vec![
                Capability::BasicInformation,
                Capability::Identify,
                Capability::EntityBinding,
            ],
        }
    }

    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn with_if(self, condition: bool, capability: Capability) -> Self {
        if condition { self.with(capability) } else { self }
    }

    pub fn has(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }
}
