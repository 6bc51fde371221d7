// ── Endpoint identity ──
//
// Endpoint ids are derived from entity ids, never allocated. The same
// entity id always yields the same endpoint id, which is what makes
// reconciliation idempotent across restarts and reloads.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::DOMAIN_SEPARATOR;

/// Replacement for the domain separator, which the device tree reserves
/// as its own path separator. Entity ids never contain it.
const SEPARATOR_REPLACEMENT: char = '-';

/// Identifier of an endpoint inside the device tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Derive the endpoint id for an entity id.
    ///
    /// Injective over the hub's entity-id alphabet (`[a-z0-9_]` plus the
    /// domain separator), so distinct entities never share an endpoint.
    pub fn derive(entity_id: &str) -> Self {
        Self(entity_id.replace(DOMAIN_SEPARATOR, &SEPARATOR_REPLACEMENT.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
