//! CLI error types with miette diagnostics.
//!
//! Maps core, store, and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use matterhub_config::ConfigError;
use matterhub_core::{CoreError, StoreError};

/// Exit codes of the `matterhub` binary.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const STORAGE: i32 = 5;
    pub const CONFIG: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(matterhub::not_found),
        help("Run: matterhub {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(matterhub::validation))]
    Validation { field: String, reason: String },

    // ── Storage ──────────────────────────────────────────────────────

    #[error("Bridge storage error: {message}")]
    #[diagnostic(
        code(matterhub::storage),
        help("Check the storage location (matterhub config show) and its permissions.")
    )]
    Storage { message: String },

    #[error("The bridge store was written by a newer release (version {found}, supported {latest})")]
    #[diagnostic(
        code(matterhub::storage_version),
        help("Upgrade matterhub before touching this store.")
    )]
    StorageTooNew { found: u64, latest: u64 },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(matterhub::config),
        help("Inspect the file with: matterhub config show")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(matterhub::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Engine ───────────────────────────────────────────────────────

    #[error("Bridge engine error: {0}")]
    #[diagnostic(code(matterhub::engine))]
    Engine(CoreError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(matterhub::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Storage { .. } | Self::StorageTooNew { .. } => exit_code::STORAGE,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }

    pub fn bridge_not_found(id: &str) -> Self {
        Self::NotFound {
            resource_type: "bridge".into(),
            identifier: id.into(),
            list_command: "bridges list".into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Store(store) => store.into(),

            CoreError::InvalidBridgeConfig { field, reason } => CliError::Validation { field, reason },

            CoreError::BridgeNotFound { id } => CliError::bridge_not_found(&id),

            other => CliError::Engine(other),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownVersion { found, latest } => CliError::StorageTooNew { found, latest },
            StoreError::InvalidKey { key } => CliError::Validation {
                field: "id".into(),
                reason: format!("'{key}' may only contain letters, digits, '-', '_' and '.'"),
            },
            other => CliError::Storage {
                message: other.to_string(),
            },
        }
    }
}
