// ── Bridge storage migrations ──
//
// Each migration is a pure transform of the raw stored layout and moves
// it exactly one version forward. Entries are appended, never edited:
// stores written by any released version must keep migrating.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::info;

use crate::error::StoreError;

pub const LATEST_VERSION: u64 = 4;

/// Key of the bridge id index.
pub const IDS_KEY: &str = "ids";

/// The stored bridge namespace before it is interpreted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawBridgeData {
    /// Bridge id index: a JSON-encoded string up to v2, a list afterwards.
    pub ids: Value,
    /// Payload per bridge id: JSON-encoded strings up to v2, objects afterwards.
    pub payloads: BTreeMap<String, Value>,
}

pub struct Migration {
    pub from: u64,
    pub to: u64,
    pub apply: fn(&mut RawBridgeData) -> Result<(), StoreError>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        to: 2,
        apply: v1_to_v2,
    },
    Migration {
        from: 2,
        to: 3,
        apply: v2_to_v3,
    },
    Migration {
        from: 3,
        to: 4,
        apply: v3_to_v4,
    },
];

/// Run the chain starting at `version` until no migration applies.
///
/// Returns the reached version. A version newer than [`LATEST_VERSION`]
/// was written by a newer release and is refused.
pub fn migrate(data: &mut RawBridgeData, version: u64) -> Result<u64, StoreError> {
    if version > LATEST_VERSION {
        return Err(StoreError::UnknownVersion {
            found: version,
            latest: LATEST_VERSION,
        });
    }

    let mut current = version;
    while let Some(step) = MIGRATIONS.iter().find(|m| m.from == current) {
        (step.apply)(data)?;
        info!(from = step.from, to = step.to, "bridge storage migrated");
        current = step.to;
    }
    Ok(current)
}

/// Bridge ids listed by an index in either encoding.
pub fn index_ids(ids: &Value) -> Result<Vec<String>, StoreError> {
    match decode(IDS_KEY, ids.clone())? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(id) => Ok(id),
                other => Err(corrupt(IDS_KEY, &format!("expected a bridge id, got {other}"))),
            })
            .collect(),
        other => Err(corrupt(IDS_KEY, &format!("expected a list, got {other}"))),
    }
}

// ── Steps ────────────────────────────────────────────────────────

/// Index and payloads stop being JSON-encoded strings; the retired
/// `compatibility` block is dropped.
fn v1_to_v2(data: &mut RawBridgeData) -> Result<(), StoreError> {
    normalize(data)?;
    for payload in data.payloads.values_mut() {
        if let Value::Object(bridge) = payload {
            bridge.remove("compatibility");
        }
    }
    Ok(())
}

/// Some v2 writers still stored encoded strings; accept both forms.
fn v2_to_v3(data: &mut RawBridgeData) -> Result<(), StoreError> {
    normalize(data)
}

/// `mimicHaCoverPercentage` is split into two independent cover flags.
fn v3_to_v4(data: &mut RawBridgeData) -> Result<(), StoreError> {
    for payload in data.payloads.values_mut() {
        let Value::Object(bridge) = payload else {
            continue;
        };
        let flags = bridge
            .entry("featureFlags")
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(flags) = flags else {
            continue;
        };
        let mimic = flags
            .remove("mimicHaCoverPercentage")
            .unwrap_or(Value::Bool(false));
        flags.insert("coverDoNotInvertPercentage".into(), mimic.clone());
        flags.insert("coverSwapOpenClose".into(), mimic);
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────

fn normalize(data: &mut RawBridgeData) -> Result<(), StoreError> {
    data.ids = Value::Array(index_ids(&data.ids)?.into_iter().map(Value::String).collect());
    for (id, payload) in &mut data.payloads {
        *payload = decode(id, std::mem::take(payload))?;
    }
    Ok(())
}

/// Decode a value that may have been stored as a JSON-encoded string.
fn decode(key: &str, value: Value) -> Result<Value, StoreError> {
    match value {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(|source| StoreError::Json {
            key: key.to_owned(),
            source,
        }),
        other => Ok(other),
    }
}

fn corrupt(key: &str, reason: &str) -> StoreError {
    StoreError::Corrupt {
        key: key.to_owned(),
        reason: reason.to_owned(),
    }
}
