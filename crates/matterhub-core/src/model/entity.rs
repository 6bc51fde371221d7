// ── Remote entity snapshots ──
//
// An `Entity` is one immutable snapshot of a hub entity: its current
// state, its attributes, and the registry metadata used for filtering.
// Snapshots are replaced wholesale on every update.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between the domain and the object id in an entity id.
pub const DOMAIN_SEPARATOR: char = '.';

/// A single entity as reported by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub state: EntityState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<EntityRegistry>,
    /// Area of the owning device, used when the entity has no area itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_area_id: Option<String>,
}

impl Entity {
    pub fn new(entity_id: impl Into<String>, state: EntityState) -> Self {
        Self {
            entity_id: entity_id.into(),
            state,
            registry: None,
            device_area_id: None,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_device_area(mut self, area_id: impl Into<String>) -> Self {
        self.device_area_id = Some(area_id.into());
        self
    }

    /// The domain prefix, e.g. `"light"` for `"light.kitchen"`.
    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }

    /// Effective area: the entity's own area, else its device's area.
    pub fn area_id(&self) -> Option<&str> {
        self.registry
            .as_ref()
            .and_then(|r| r.area_id.as_deref())
            .or(self.device_area_id.as_deref())
    }

    /// Read a string attribute from the current state.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.state.attributes.get(name).and_then(Value::as_str)
    }

    /// Read an unsigned integer attribute (e.g. a `supported_features` bitmask).
    pub fn attribute_u64(&self, name: &str) -> Option<u64> {
        self.state.attributes.get(name).and_then(Value::as_u64)
    }

    /// Read a list-of-strings attribute, skipping non-string members.
    pub fn attribute_strings(&self, name: &str) -> Vec<&str> {
        self.state
            .attributes
            .get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether an attribute is present. A `null` value still counts.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.state.attributes.contains_key(name)
    }

    /// Copy of this snapshot with a new state; registry data is kept.
    #[must_use]
    pub fn with_state(&self, state: EntityState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// Return the domain prefix of a raw entity id.
pub fn domain_of(entity_id: &str) -> &str {
    entity_id
        .split_once(DOMAIN_SEPARATOR)
        .map_or(entity_id, |(domain, _)| domain)
}

/// Live state of an entity: the state value plus its attribute map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Registry metadata for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    #[serde(default)]
    pub disabled_by: Option<String>,
    #[serde(default)]
    pub hidden_by: Option<String>,
    #[serde(default)]
    pub entity_category: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub area_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_is_prefix_before_first_separator() {
        assert_eq!(domain_of("binary_sensor.front_door"), "binary_sensor");
        assert_eq!(domain_of("no_separator"), "no_separator");
    }

    #[test]
    fn area_falls_back_to_device_area() {
        let entity = Entity::new("light.desk", EntityState::new("on")).with_device_area("office");
        assert_eq!(entity.area_id(), Some("office"));

        let entity = entity.with_registry(EntityRegistry {
            area_id: Some("bedroom".into()),
            ..EntityRegistry::default()
        });
        assert_eq!(entity.area_id(), Some("bedroom"));
    }

    #[test]
    fn deserializes_hub_payload() {
        let entity: Entity = serde_json::from_value(json!({
            "entity_id": "climate.living_room",
            "state": {
                "state": "heat",
                "attributes": { "hvac_modes": ["off", "heat"], "current_humidity": 41 }
            },
            "registry": { "labels": ["matter"], "platform": "tado" }
        }))
        .unwrap();

        assert_eq!(entity.domain(), "climate");
        assert_eq!(entity.attribute_strings("hvac_modes"), vec!["off", "heat"]);
        assert!(entity.has_attribute("current_humidity"));
        assert!(entity.registry.unwrap().labels.contains("matter"));
    }
}
