//! Preview command handler.
//!
//! Runs a real bridge load against an entity dump, using the in-memory
//! device tree, and reports what each entity would become.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tabled::Tabled;

use matterhub_core::eligibility;
use matterhub_core::factory::{self, Domain};
use matterhub_core::{
    BridgeConfig, BridgeDeviceManager, DeviceTree, Entity, EntitySource, MemoryDeviceTree,
    StaticEntitySource,
};

use crate::cli::{GlobalOpts, PreviewArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
enum PreviewStatus {
    Exposed,
    Excluded,
    UnsupportedDomain,
    Invalid,
}

#[derive(Debug, Serialize)]
struct PreviewEntry {
    entity_id: String,
    status: PreviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reasons: Vec<String>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&PreviewEntry> for PreviewRow {
    fn from(e: &PreviewEntry) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            status: e.status.to_string(),
            device: e.device_class.clone().unwrap_or_default(),
            reason: e.reasons.join("; "),
        }
    }
}

impl Render for [PreviewEntry] {
    fn human(&self) -> String {
        output::table(self.iter().map(PreviewRow::from))
    }

    fn ids(&self) -> Vec<String> {
        self.iter().map(|e| e.entity_id.clone()).collect()
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Explain an entity that did not end up in the device tree.
fn classify_missing(bridge: &BridgeConfig, entity: &Entity) -> PreviewEntry {
    let (status, reasons) = if Domain::of(entity).is_none() {
        (
            PreviewStatus::UnsupportedDomain,
            vec![format!("domain '{}' is not supported", entity.domain())],
        )
    } else {
        let reasons = eligibility::evaluate(entity, &bridge.filter, &bridge.feature_flags);
        if reasons.is_empty() {
            let reason = factory::build(entity, &bridge.feature_flags)
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default();
            (PreviewStatus::Invalid, vec![reason])
        } else {
            (
                PreviewStatus::Excluded,
                reasons.iter().map(ToString::to_string).collect(),
            )
        }
    };

    PreviewEntry {
        entity_id: entity.entity_id.clone(),
        status,
        endpoint: None,
        device_class: None,
        reasons,
    }
}

async fn load_bridge(config: &Config, args: &PreviewArgs) -> Result<BridgeConfig, CliError> {
    if let Some(ref path) = args.bridge_file {
        return util::read_json_file(path, "bridge-file");
    }
    let id = args.bridge.as_deref().unwrap_or_default();
    let store = config::open_store(config).await?;
    store.get(id).ok_or_else(|| CliError::bridge_not_found(id))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: &Config, args: PreviewArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let bridge = load_bridge(config, &args).await?;
    let entities: Vec<Entity> = util::read_json_file(&args.entities, "entities")?;

    let source = Arc::new(StaticEntitySource::new(entities.clone()));
    let tree = Arc::new(MemoryDeviceTree::new());
    let manager = BridgeDeviceManager::new(
        Arc::clone(&source) as Arc<dyn EntitySource>,
        Arc::clone(&tree) as Arc<dyn DeviceTree>,
    );

    let result = manager.load(bridge.clone()).await;
    manager.dispose().await;
    let report = result?;

    let exposed: HashMap<String, _> = tree
        .snapshot()
        .into_iter()
        .map(|endpoint| (endpoint.entity.entity_id.clone(), endpoint))
        .collect();

    let entries: Vec<PreviewEntry> = entities
        .iter()
        .map(|entity| match exposed.get(&entity.entity_id) {
            Some(endpoint) => PreviewEntry {
                entity_id: entity.entity_id.clone(),
                status: PreviewStatus::Exposed,
                endpoint: Some(endpoint.id.to_string()),
                device_class: Some(endpoint.device_class().to_string()),
                reasons: Vec::new(),
            },
            None => classify_missing(&bridge, entity),
        })
        .filter(|entry| !args.exposed_only || entry.status == PreviewStatus::Exposed)
        .collect();

    output::status(
        global,
        &format!(
            "Bridge '{}': {} of {} entities exposed ({} skipped as invalid)",
            bridge.id,
            report.created,
            entities.len(),
            report.skipped
        ),
    );

    output::emit(global, entries.as_slice());
    Ok(())
}
