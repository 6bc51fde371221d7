// ── Bridge configuration ──
//
// The persisted unit of the bridge store. Field names follow the stored
// camelCase representation so payloads round-trip unchanged.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which entity property a matcher compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    Domain(String),
    Label(String),
    EntityCategory(String),
    Platform(String),
    /// Shell-style glob over the full entity id (`*` = any run of characters).
    Pattern(String),
    Area(String),
}

impl Matcher {
    pub fn value(&self) -> &str {
        match self {
            Self::Domain(v)
            | Self::Label(v)
            | Self::EntityCategory(v)
            | Self::Platform(v)
            | Self::Pattern(v)
            | Self::Area(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Label(_) => "label",
            Self::EntityCategory(_) => "entity_category",
            Self::Platform(_) => "platform",
            Self::Pattern(_) => "pattern",
            Self::Area(_) => "area",
        }
    }
}

/// User-defined include/exclude rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityFilter {
    #[serde(default)]
    pub include: Vec<Matcher>,
    #[serde(default)]
    pub exclude: Vec<Matcher>,
}

/// Per-bridge toggles altering eligibility and device mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    /// Expose TVs and speakers as speaker devices (on-off and volume).
    pub matter_speakers: bool,
    /// Full fan speed conformance instead of off/high only.
    pub matter_fans: bool,
    pub cover_do_not_invert_percentage: bool,
    pub cover_swap_open_close: bool,
    pub include_hidden_entities: bool,
    pub use_on_off_sensor_as_default_for_binary_sensors: bool,
}

/// A bridge as stored and edited by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    pub id: String,
    pub name: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub filter: EntityFilter,
    #[serde(default)]
    pub feature_flags: FeatureFlags,
}

impl BridgeConfig {
    /// Check the constraints of the stored bridge schema.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(invalid("id", "must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "must be at least 1"));
        }
        if let Some(code) = &self.country_code {
            let len = code.chars().count();
            if !(2..=3).contains(&len) {
                return Err(invalid(
                    "countryCode",
                    &format!("expected an ISO 3166-1 code of 2-3 characters, got '{code}'"),
                ));
            }
        }
        let matchers = self.filter.include.iter().chain(&self.filter.exclude);
        for matcher in matchers {
            if matcher.value().is_empty() {
                return Err(invalid(
                    "filter",
                    &format!("{} matcher has an empty value", matcher.kind()),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> CoreError {
    CoreError::InvalidBridgeConfig {
        field: field.into(),
        reason: reason.into(),
    }
}
