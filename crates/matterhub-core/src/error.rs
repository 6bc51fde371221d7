// ── Core error types ──
//
// Three tiers: per-entity validation failures (`InvalidDeviceDefinition`,
// reported and skipped), transient collaborator failures (surfaced to the
// caller, never retried here), and store invariant violations (fatal for
// the load that hit them).

use thiserror::Error;

/// An entity cannot be mapped to a device.
///
/// Reported and skipped; never aborts the batch it occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDeviceDefinition {
    #[error("domain '{domain}' is not supported")]
    UnsupportedDomain { domain: String },

    #[error("{entity_id}: {reason}")]
    Invalid { entity_id: String, reason: String },
}

impl InvalidDeviceDefinition {
    pub(crate) fn new(entity_id: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            entity_id: entity_id.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the bridge store and its persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored value '{key}' has an unexpected shape: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("stored version {found} is newer than the latest supported version {latest}")]
    UnknownVersion { found: u64, latest: u64 },

    #[error("invalid storage key '{key}'")]
    InvalidKey { key: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Collaborator errors ──────────────────────────────────────────
    #[error("entity source unavailable: {message}")]
    Source { message: String },

    #[error("device tree operation failed on endpoint '{endpoint}': {message}")]
    DeviceTree { endpoint: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("invalid bridge config ({field}): {reason}")]
    InvalidBridgeConfig { field: String, reason: String },

    #[error("bridge '{id}' not found")]
    BridgeNotFound { id: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("bridge manager has been disposed")]
    Disposed,

    #[error("nothing to reload: no configuration has been loaded yet")]
    NotLoaded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    pub fn device_tree(endpoint: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::DeviceTree {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}
