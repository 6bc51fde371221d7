// ── Endpoint reconciliation ──
//
// Brings the exposed endpoint set in line with the eligible entities of a
// bridge: stale endpoints are pruned first, then every desired endpoint is
// created, updated in place, or replaced when its device class changed.
// Each entity is handled under the same per-entity lock the state
// pipeline takes, so a push that lands mid-pass is never overwritten.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::factory;
use crate::lock::KeyedLock;
use crate::model::{BridgeConfig, EndpointId, Entity};
use crate::tree::{DeviceTree, Endpoint};

/// Counts of what a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub skipped: usize,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciled {
    /// Entity ids now backed by a live endpoint.
    pub tracked: BTreeSet<String>,
    pub report: ReconcileReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Created,
    Updated,
    Unchanged,
    Replaced,
    /// Not mappable; `true` when a previously exposed endpoint was removed.
    Skipped(bool),
}

pub struct Reconciler {
    tree: Arc<dyn DeviceTree>,
    locks: Arc<KeyedLock>,
}

impl Reconciler {
    pub fn new(tree: Arc<dyn DeviceTree>) -> Self {
        Self::with_locks(tree, Arc::new(KeyedLock::new()))
    }

    pub fn with_locks(tree: Arc<dyn DeviceTree>, locks: Arc<KeyedLock>) -> Self {
        Self { tree, locks }
    }

    /// Reconcile `current` endpoints against the `eligible` entities.
    ///
    /// Device tree failures abort the pass and propagate; entities that
    /// cannot be mapped are logged and left out of the tracked set.
    pub async fn reconcile(
        &self,
        bridge: &BridgeConfig,
        eligible: &[Entity],
        current: Vec<Endpoint>,
    ) -> Result<Reconciled, CoreError> {
        let mut desired: BTreeMap<EndpointId, &Entity> = BTreeMap::new();
        for entity in eligible {
            desired
                .entry(EndpointId::derive(&entity.entity_id))
                .or_insert(entity);
        }

        let (kept, stale): (Vec<Endpoint>, Vec<Endpoint>) = current
            .into_iter()
            .partition(|endpoint| desired.contains_key(&endpoint.id));

        // ── Prune ────────────────────────────────────────────────
        try_join_all(stale.iter().map(|endpoint| self.tree.delete_endpoint(&endpoint.id))).await?;
        let mut report = ReconcileReport {
            deleted: stale.len(),
            ..ReconcileReport::default()
        };

        // ── Create / update / replace ────────────────────────────
        let kept: HashMap<EndpointId, Endpoint> = kept
            .into_iter()
            .map(|endpoint| (endpoint.id.clone(), endpoint))
            .collect();

        let actions = try_join_all(desired.iter().map(|(id, entity)| {
            let existing = kept.get(id);
            async move {
                let action = self.reconcile_one(bridge, id, entity, existing).await?;
                Ok::<_, CoreError>((entity.entity_id.as_str(), action))
            }
        }))
        .await?;

        let mut tracked = BTreeSet::new();
        for (entity_id, action) in actions {
            match action {
                Action::Created => report.created += 1,
                Action::Updated => report.updated += 1,
                Action::Unchanged => report.unchanged += 1,
                Action::Replaced => report.replaced += 1,
                Action::Skipped(removed) => {
                    report.skipped += 1;
                    if removed {
                        report.deleted += 1;
                    }
                    continue;
                }
            }
            tracked.insert(entity_id.to_owned());
        }

        info!(
            bridge_id = %bridge.id,
            tracked = tracked.len(),
            created = report.created,
            updated = report.updated,
            replaced = report.replaced,
            deleted = report.deleted,
            skipped = report.skipped,
            "bridge reconciled"
        );
        Ok(Reconciled { tracked, report })
    }

    async fn reconcile_one(
        &self,
        bridge: &BridgeConfig,
        id: &EndpointId,
        entity: &Entity,
        listed: Option<&Endpoint>,
    ) -> Result<Action, CoreError> {
        let _guard = self.locks.acquire(&entity.entity_id).await;

        let existing = match listed {
            Some(_) => self.tree.endpoint(id).await?,
            None => None,
        };
        let entity = &fresher(entity, listed, existing.as_ref());

        let definition = match factory::build(entity, &bridge.feature_flags) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(
                    bridge_id = %bridge.id,
                    entity_id = %entity.entity_id,
                    error = %e,
                    "entity cannot be mapped to a device, skipping"
                );
                if existing.is_some() {
                    self.tree.delete_endpoint(id).await?;
                }
                return Ok(Action::Skipped(existing.is_some()));
            }
        };

        match existing.as_ref() {
            Some(endpoint) if endpoint.device_class() == definition.device_class => {
                if endpoint.entity == *entity {
                    return Ok(Action::Unchanged);
                }
                self.tree.rebind_entity(id, entity.clone()).await?;
                Ok(Action::Updated)
            }
            Some(endpoint) => {
                debug!(
                    endpoint = %id,
                    from = %endpoint.device_class(),
                    to = %definition.device_class,
                    "device class changed, replacing endpoint"
                );
                self.tree.delete_endpoint(id).await?;
                self.tree.create_endpoint(id, &definition, entity).await?;
                Ok(Action::Replaced)
            }
            None => {
                self.tree.create_endpoint(id, &definition, entity).await?;
                Ok(Action::Created)
            }
        }
    }
}

/// The snapshot entity, keeping the bound state when a push rebound the
/// endpoint after it was listed.
fn fresher(snapshot: &Entity, listed: Option<&Endpoint>, bound: Option<&Endpoint>) -> Entity {
    match (listed, bound) {
        (Some(listed), Some(bound)) if listed.entity != bound.entity => {
            debug!(
                entity_id = %snapshot.entity_id,
                "endpoint rebound since listing, keeping pushed state"
            );
            snapshot.with_state(bound.entity.state.clone())
        }
        _ => snapshot.clone(),
    }
}
