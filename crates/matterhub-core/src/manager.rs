// ── Bridge device manager ──
//
// Lifecycle of one bridge: filter the hub's entities, reconcile the
// exposed endpoints, and keep them live through a state subscription
// consumed by a background task. Loads are serialized; a newer load
// supersedes the tracked set and subscription of the previous one.

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use strum::Display;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::eligibility;
use crate::error::CoreError;
use crate::factory::Domain;
use crate::lock::KeyedLock;
use crate::model::{BridgeConfig, Entity};
use crate::propagate::StatePipeline;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::source::{EntitySource, StateBatch, Unsubscribe};
use crate::tree::DeviceTree;

// ── ManagerState ─────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ManagerState {
    Idle,
    Loading,
    Synced,
    Disposed,
}

// ── BridgeDeviceManager ──────────────────────────────────────────

/// Keeps the device tree of one bridge in sync with the hub.
///
/// Cheaply cloneable via `Arc<ManagerInner>`.
#[derive(Clone)]
pub struct BridgeDeviceManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    source: Arc<dyn EntitySource>,
    tree: Arc<dyn DeviceTree>,
    reconciler: Reconciler,
    pipeline: Arc<StatePipeline>,
    state: watch::Sender<ManagerState>,
    /// Serializes `load` calls.
    load_lock: Mutex<()>,
    /// Last successfully loaded configuration, for `reload`.
    config: ArcSwapOption<BridgeConfig>,
    tracked: ArcSwap<BTreeSet<String>>,
    active: Mutex<Option<ActiveSubscription>>,
    /// Parent of every subscription task token; cancelled on dispose.
    cancel: CancellationToken,
}

/// The live subscription and the task consuming it.
struct ActiveSubscription {
    unsubscribe: Unsubscribe,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActiveSubscription {
    fn teardown(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.unsubscribe.unsubscribe();
        self.task
    }
}

impl BridgeDeviceManager {
    pub fn new(source: Arc<dyn EntitySource>, tree: Arc<dyn DeviceTree>) -> Self {
        let (state, _) = watch::channel(ManagerState::Idle);
        // Reconciliation and propagation both rebind endpoints.
        let locks = Arc::new(KeyedLock::new());
        Self {
            inner: Arc::new(ManagerInner {
                source,
                reconciler: Reconciler::with_locks(Arc::clone(&tree), Arc::clone(&locks)),
                pipeline: Arc::new(StatePipeline::with_locks(Arc::clone(&tree), locks)),
                tree,
                state,
                load_lock: Mutex::new(()),
                config: ArcSwapOption::empty(),
                tracked: ArcSwap::from_pointee(BTreeSet::new()),
                active: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Synchronize the device tree with `config` and start propagating
    /// state changes of the tracked entities.
    ///
    /// The previous subscription stays live until the new tracked set is
    /// known. On failure every subscription is torn down and the manager
    /// returns to [`ManagerState::Idle`].
    pub async fn load(&self, config: BridgeConfig) -> Result<ReconcileReport, CoreError> {
        let _serial = self.inner.load_lock.lock().await;
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }
        self.inner.state.send_replace(ManagerState::Loading);
        debug!(bridge_id = %config.id, "loading bridge");

        match self.sync(&config).await {
            Ok((tracked, report, subscription)) => {
                if self.is_disposed() {
                    drop(subscription.teardown());
                    return Err(CoreError::Disposed);
                }
                let previous = self.inner.active.lock().await.replace(subscription);
                if let Some(previous) = previous {
                    drop(previous.teardown());
                    debug!(bridge_id = %config.id, "previous subscription torn down");
                }

                info!(bridge_id = %config.id, tracked = tracked.len(), "bridge synced");
                self.inner.tracked.store(Arc::new(tracked));
                self.inner.config.store(Some(Arc::new(config)));
                self.inner.state.send_replace(ManagerState::Synced);
                Ok(report)
            }
            Err(e) => {
                warn!(bridge_id = %config.id, error = %e, "bridge load failed");
                if let Some(previous) = self.inner.active.lock().await.take() {
                    drop(previous.teardown());
                }
                self.inner.tracked.store(Arc::new(BTreeSet::new()));
                if !self.is_disposed() {
                    self.inner.state.send_replace(ManagerState::Idle);
                }
                Err(e)
            }
        }
    }

    /// Re-run [`load`](Self::load) with the last successfully loaded config.
    pub async fn reload(&self) -> Result<ReconcileReport, CoreError> {
        let config = self.inner.config.load_full().ok_or(CoreError::NotLoaded)?;
        self.load(config.as_ref().clone()).await
    }

    /// Stop propagating state changes. Exposed endpoints are left in place.
    pub async fn dispose(&self) {
        self.inner.cancel.cancel();
        self.inner.state.send_replace(ManagerState::Disposed);

        let active = self.inner.active.lock().await.take();
        if let Some(active) = active {
            if let Err(e) = active.teardown().await {
                warn!(error = %e, "state consumer task failed");
            }
        }
        self.inner.tracked.store(Arc::new(BTreeSet::new()));
        debug!("bridge manager disposed");
    }

    // ── Accessors ────────────────────────────────────────────────

    /// Entity ids currently backed by an endpoint and subscribed to.
    pub fn tracked_entities(&self) -> Arc<BTreeSet<String>> {
        self.inner.tracked.load_full()
    }

    pub fn state(&self) -> ManagerState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ManagerState> {
        self.inner.state.subscribe()
    }

    pub fn config(&self) -> Option<Arc<BridgeConfig>> {
        self.inner.config.load_full()
    }

    pub fn device_tree(&self) -> &Arc<dyn DeviceTree> {
        &self.inner.tree
    }

    // ── Private helpers ──────────────────────────────────────────

    fn is_disposed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    async fn sync(
        &self,
        config: &BridgeConfig,
    ) -> Result<(BTreeSet<String>, ReconcileReport, ActiveSubscription), CoreError> {
        config.validate()?;

        // Listed first: pushes applied before this point are also in the
        // entity snapshot; later ones are caught under the entity lock.
        let current = self.inner.tree.list_endpoints().await?;

        let entities = self.inner.source.all_entities().await?;
        let total = entities.len();
        let eligible = select_eligible(config, entities);
        debug!(bridge_id = %config.id, total, eligible = eligible.len(), "entities filtered");

        let reconciled = self
            .inner
            .reconciler
            .reconcile(config, &eligible, current)
            .await?;

        let subscription = self
            .inner
            .source
            .subscribe_states(reconciled.tracked.iter().cloned().collect())
            .await?;
        let (batches, unsubscribe) = subscription.split();

        let cancel = self.inner.cancel.child_token();
        let task = tokio::spawn(consume_batches(
            Arc::clone(&self.inner.pipeline),
            batches,
            cancel.clone(),
            config.id.clone(),
        ));

        Ok((
            reconciled.tracked,
            reconciled.report,
            ActiveSubscription {
                unsubscribe,
                cancel,
                task,
            },
        ))
    }
}

/// Entities of a supported domain that pass the bridge filter.
pub fn select_eligible(config: &BridgeConfig, entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|entity| Domain::of(entity).is_some())
        .filter(|entity| eligibility::is_eligible(entity, &config.filter, &config.feature_flags))
        .collect()
}

// ── Background task ──────────────────────────────────────────────

/// Apply batches in arrival order until cancelled or the source closes
/// the stream.
async fn consume_batches(
    pipeline: Arc<StatePipeline>,
    mut batches: mpsc::Receiver<StateBatch>,
    cancel: CancellationToken,
    bridge_id: String,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            batch = batches.recv() => {
                let Some(batch) = batch else {
                    debug!(bridge_id = %bridge_id, "state stream closed by source");
                    break;
                };
                let outcome = pipeline.apply(batch).await;
                if outcome.failed > 0 {
                    warn!(bridge_id = %bridge_id, failed = outcome.failed, "some state updates were not applied");
                }
            }
        }
    }
}
