// ── Bridge store ──
//
// Persisted bridge configurations: an id index plus one payload per
// bridge, upgraded through the migration chain on load. The in-memory
// list only changes after the corresponding write succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::migrations::{self, IDS_KEY, LATEST_VERSION, RawBridgeData};
use super::storage::Storage;
use crate::error::{CoreError, StoreError};
use crate::model::BridgeConfig;

/// Namespace the bridge store lives in.
pub const NAMESPACE: &str = "bridges";

const VERSION_KEY: &str = "version";
const INITIAL_VERSION: u64 = 1;

pub struct BridgeStore {
    storage: Arc<dyn Storage>,
    bridges: ArcSwap<Vec<BridgeConfig>>,
    /// Serializes writers so index and payloads stay consistent.
    write_lock: Mutex<()>,
}

impl BridgeStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            bridges: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Migrate the stored layout to the latest version and read every bridge.
    pub async fn load(&self) -> Result<Vec<BridgeConfig>, CoreError> {
        let _write = self.write_lock.lock().await;

        let version = self.stored_version().await?;
        let ids = self.storage.get(IDS_KEY).await?.unwrap_or(Value::Null);
        let mut raw = RawBridgeData {
            payloads: self.read_payloads(&migrations::index_ids(&ids)?).await?,
            ids,
        };

        let reached = migrations::migrate(&mut raw, version)?;
        if reached != version {
            self.persist_raw(&raw, reached).await?;
            info!(from = version, to = reached, "bridge store upgraded");
        }

        let mut bridges = Vec::new();
        for id in migrations::index_ids(&raw.ids)? {
            let Some(payload) = raw.payloads.remove(&id) else {
                warn!(bridge_id = %id, "bridge listed in index has no payload, skipping");
                continue;
            };
            if !payload.is_object() {
                return Err(StoreError::Corrupt {
                    key: id,
                    reason: "bridge payload is not an object".into(),
                }
                .into());
            }
            let bridge: BridgeConfig = serde_json::from_value(payload)
                .map_err(|source| StoreError::Json { key: id, source })?;
            bridges.push(bridge);
        }

        debug!(count = bridges.len(), "bridges loaded");
        self.bridges.store(Arc::new(bridges.clone()));
        Ok(bridges)
    }

    /// Insert or fully replace a bridge.
    pub async fn add(&self, bridge: BridgeConfig) -> Result<(), CoreError> {
        bridge.validate()?;
        if bridge.id == IDS_KEY || bridge.id == VERSION_KEY {
            return Err(CoreError::InvalidBridgeConfig {
                field: "id".into(),
                reason: format!("'{}' is reserved", bridge.id),
            });
        }

        let _write = self.write_lock.lock().await;
        let payload = serde_json::to_value(&bridge).map_err(|source| StoreError::Json {
            key: bridge.id.clone(),
            source,
        })?;
        self.storage.set(&bridge.id, payload).await?;

        let mut next = self.bridges.load().as_ref().clone();
        match next.iter_mut().find(|b| b.id == bridge.id) {
            Some(existing) => *existing = bridge,
            None => next.push(bridge),
        }
        self.persist_index(&next).await?;
        self.bridges.store(Arc::new(next));
        Ok(())
    }

    /// Remove a bridge. Returns whether it was present.
    pub async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let _write = self.write_lock.lock().await;
        self.storage.delete(id).await?;

        let mut next = self.bridges.load().as_ref().clone();
        let before = next.len();
        next.retain(|b| b.id != id);
        let removed = next.len() != before;

        self.persist_index(&next).await?;
        self.bridges.store(Arc::new(next));
        Ok(removed)
    }

    pub fn bridges(&self) -> Arc<Vec<BridgeConfig>> {
        self.bridges.load_full()
    }

    pub fn get(&self, id: &str) -> Option<BridgeConfig> {
        self.bridges.load().iter().find(|b| b.id == id).cloned()
    }

    /// Version currently recorded in storage.
    pub async fn stored_version(&self) -> Result<u64, StoreError> {
        match self.storage.get(VERSION_KEY).await? {
            None => Ok(INITIAL_VERSION),
            Some(value) => value.as_u64().ok_or_else(|| StoreError::Corrupt {
                key: VERSION_KEY.into(),
                reason: format!("expected a version number, got {value}"),
            }),
        }
    }

    pub fn latest_version() -> u64 {
        LATEST_VERSION
    }

    // ── Private helpers ──────────────────────────────────────────

    async fn read_payloads(&self, ids: &[String]) -> Result<BTreeMap<String, Value>, StoreError> {
        let mut payloads = BTreeMap::new();
        for id in ids {
            if let Some(payload) = self.storage.get(id).await? {
                payloads.insert(id.clone(), payload);
            }
        }
        Ok(payloads)
    }

    /// Payloads and index first, version last: an interrupted upgrade is
    /// re-run from the old version on the next load.
    async fn persist_raw(&self, raw: &RawBridgeData, version: u64) -> Result<(), StoreError> {
        for (id, payload) in &raw.payloads {
            self.storage.set(id, payload.clone()).await?;
        }
        self.storage.set(IDS_KEY, raw.ids.clone()).await?;
        self.storage.set(VERSION_KEY, Value::from(version)).await
    }

    async fn persist_index(&self, bridges: &[BridgeConfig]) -> Result<(), StoreError> {
        let ids: Vec<Value> = bridges.iter().map(|b| Value::String(b.id.clone())).collect();
        self.storage.set(IDS_KEY, Value::Array(ids)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{EntityFilter, FeatureFlags};
    use crate::store::MemoryStorage;

    fn bridge(id: &str, name: &str) -> BridgeConfig {
        BridgeConfig {
            id: id.into(),
            name: name.into(),
            port: 5540,
            country_code: None,
            filter: EntityFilter::default(),
            feature_flags: FeatureFlags::default(),
        }
    }

    fn store() -> (Arc<MemoryStorage>, BridgeStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = BridgeStore::new(Arc::clone(&storage) as Arc<dyn Storage>);
        (storage, store)
    }

    #[tokio::test]
    async fn empty_storage_is_stamped_with_latest_version() {
        let (storage, store) = store();
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(storage.get("version").await.unwrap(), Some(json!(LATEST_VERSION)));
        assert_eq!(storage.get("ids").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn add_upserts_and_persists() {
        let (storage, store) = store();
        store.load().await.unwrap();

        store.add(bridge("b1", "First")).await.unwrap();
        store.add(bridge("b2", "Second")).await.unwrap();
        store.add(bridge("b1", "Renamed")).await.unwrap();

        assert_eq!(store.bridges().len(), 2);
        assert_eq!(store.get("b1").unwrap().name, "Renamed");
        assert_eq!(storage.get("ids").await.unwrap(), Some(json!(["b1", "b2"])));
        assert_eq!(storage.get("b1").await.unwrap().unwrap()["name"], "Renamed");
    }

    #[tokio::test]
    async fn remove_deletes_payload_and_index_entry() {
        let (storage, store) = store();
        store.add(bridge("b1", "First")).await.unwrap();

        assert!(store.remove("b1").await.unwrap());
        assert!(!store.remove("b1").await.unwrap());
        assert!(store.bridges().is_empty());
        assert_eq!(storage.get("b1").await.unwrap(), None);
        assert_eq!(storage.get("ids").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn invalid_bridges_are_rejected_before_writing() {
        let (storage, store) = store();
        assert!(store.add(bridge("b1", "")).await.is_err());
        assert!(store.add(bridge("ids", "Clash")).await.is_err());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_entries_without_payload_are_skipped() {
        let storage = Arc::new(MemoryStorage::with_values([
            ("version".to_owned(), json!(4)),
            ("ids".to_owned(), json!(["b1", "gone"])),
            (
                "b1".to_owned(),
                json!({"id": "b1", "name": "B", "port": 5540, "filter": {"include": [], "exclude": []}}),
            ),
        ]));
        let store = BridgeStore::new(storage as Arc<dyn Storage>);
        let bridges = store.load().await.unwrap();
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].id, "b1");
    }

    #[tokio::test]
    async fn non_object_payload_is_corrupt() {
        let storage = Arc::new(MemoryStorage::with_values([
            ("version".to_owned(), json!(4)),
            ("ids".to_owned(), json!(["b1"])),
            ("b1".to_owned(), json!([1, 2, 3])),
        ]));
        let store = BridgeStore::new(storage as Arc<dyn Storage>);
        assert!(matches!(
            store.load().await,
            Err(CoreError::Store(StoreError::Corrupt { .. }))
        ));
    }
}
