// ── State propagation ──
//
// Applies pushed state batches to the bound endpoints. Each entity is
// checked cheaply first, then re-checked under its lock so concurrent
// batches for the same entity never interleave their rebinds.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::lock::KeyedLock;
use crate::model::{EndpointId, EntityState};
use crate::source::StateBatch;
use crate::tree::DeviceTree;

/// What happened to the entries of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub applied: usize,
    pub unchanged: usize,
    /// Entities without an endpoint, ignored.
    pub unknown: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Rebound,
    Unchanged,
    Unknown,
    Failed,
}

pub struct StatePipeline {
    tree: Arc<dyn DeviceTree>,
    locks: Arc<KeyedLock>,
}

impl StatePipeline {
    pub fn new(tree: Arc<dyn DeviceTree>) -> Self {
        Self::with_locks(tree, Arc::new(KeyedLock::new()))
    }

    /// Share the per-entity lock table with other writers of the tree.
    pub fn with_locks(tree: Arc<dyn DeviceTree>, locks: Arc<KeyedLock>) -> Self {
        Self { tree, locks }
    }

    /// Apply one batch. Entities are processed concurrently; failures are
    /// logged and counted, never propagated.
    pub async fn apply(&self, batch: StateBatch) -> BatchOutcome {
        let results = join_all(
            batch
                .into_iter()
                .map(|(entity_id, state)| async move { self.apply_one(&entity_id, state).await }),
        )
        .await;

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                Applied::Rebound => outcome.applied += 1,
                Applied::Unchanged => outcome.unchanged += 1,
                Applied::Unknown => outcome.unknown += 1,
                Applied::Failed => outcome.failed += 1,
            }
        }
        trace!(?outcome, "state batch applied");
        outcome
    }

    async fn apply_one(&self, entity_id: &str, state: EntityState) -> Applied {
        let id = EndpointId::derive(entity_id);

        match self.differs(&id, &state).await {
            Ok(Some(true)) => {}
            Ok(Some(false)) => return Applied::Unchanged,
            Ok(None) => return Applied::Unknown,
            Err(e) => {
                warn!(entity_id, error = %e, "failed to read endpoint");
                return Applied::Failed;
            }
        }

        let _guard = self.locks.acquire(entity_id).await;

        // Another update may have landed while we waited.
        let endpoint = match self.tree.endpoint(&id).await {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => return Applied::Unknown,
            Err(e) => {
                warn!(entity_id, error = %e, "failed to read endpoint");
                return Applied::Failed;
            }
        };
        if endpoint.entity.state == state {
            return Applied::Unchanged;
        }

        match self.tree.rebind_entity(&id, endpoint.entity.with_state(state)).await {
            Ok(()) => {
                debug!(entity_id, "state propagated");
                Applied::Rebound
            }
            Err(e) => {
                warn!(entity_id, error = %e, "failed to propagate state");
                Applied::Failed
            }
        }
    }

    /// `None` when no endpoint exists for the entity.
    async fn differs(
        &self,
        id: &EndpointId,
        state: &EntityState,
    ) -> Result<Option<bool>, CoreError> {
        let endpoint = self.tree.endpoint(id).await?;
        Ok(endpoint.map(|endpoint| endpoint.entity.state != *state))
    }
}
