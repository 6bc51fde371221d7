//! CLI configuration: thin wrapper around `matterhub_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--config,
//! --storage-location) and opens the bridge store in the resolved location.

use std::path::PathBuf;
use std::sync::Arc;

use matterhub_core::store::NAMESPACE;
use matterhub_core::{BridgeStore, FileStorage, Storage};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use matterhub_config::{Config, config_path, load_config_from, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Config file selected by `--config`, else the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the configuration, applying CLI overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = load_config_from(&active_config_path(global))?;
    if let Some(ref location) = global.storage_location {
        config.storage_location = Some(location.display().to_string());
    }
    Ok(config)
}

/// File-backed storage of the bridge namespace.
pub fn bridge_storage(config: &Config) -> FileStorage {
    FileStorage::new(config.storage_path(), NAMESPACE)
}

/// Open and load the bridge store, migrating it if needed.
pub async fn open_store(config: &Config) -> Result<BridgeStore, CliError> {
    let storage: Arc<dyn Storage> = Arc::new(bridge_storage(config));
    let store = BridgeStore::new(storage);
    store.load().await?;
    Ok(store)
}
