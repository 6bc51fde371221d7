//! Storage command handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;

use matterhub_core::{BridgeStore, Storage};

use crate::cli::{GlobalOpts, StorageArgs, StorageCommand};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Render};

#[derive(Debug, Serialize)]
struct StorageStatus {
    location: String,
    stored_version: u64,
    latest_version: u64,
    up_to_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bridges: Option<usize>,
}

impl Render for StorageStatus {
    fn human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Location:        {}", self.location);
        let _ = writeln!(out, "Stored version:  {}", self.stored_version);
        let _ = write!(out, "Latest version:  {}", self.latest_version);
        if let Some(count) = self.bridges {
            let _ = write!(out, "\nBridges:         {count}");
        }
        out
    }

    fn ids(&self) -> Vec<String> {
        vec![self.stored_version.to_string()]
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: &Config, args: StorageArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let storage = config::bridge_storage(config);
    let location = storage.dir().display().to_string();
    let store = BridgeStore::new(Arc::new(storage) as Arc<dyn Storage>);
    let latest = BridgeStore::latest_version();

    let status = match args.command {
        StorageCommand::Status => {
            let stored = store.stored_version().await?;
            StorageStatus {
                location,
                stored_version: stored,
                latest_version: latest,
                up_to_date: stored == latest,
                bridges: None,
            }
        }

        StorageCommand::Migrate => {
            let before = store.stored_version().await?;
            let bridges = store.load().await?;
            let after = store.stored_version().await?;
            if before == after {
                output::status(global, &format!("Bridge store already at version {after}"));
            } else {
                output::status(
                    global,
                    &format!("Bridge store upgraded from version {before} to {after}"),
                );
            }
            StorageStatus {
                location,
                stored_version: after,
                latest_version: latest,
                up_to_date: after == latest,
                bridges: Some(bridges.len()),
            }
        }
    };

    output::emit(global, &status);
    Ok(())
}
