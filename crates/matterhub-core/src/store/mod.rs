// ── Versioned bridge persistence ──

mod bridge_store;
pub mod migrations;
mod storage;

pub use bridge_store::{BridgeStore, NAMESPACE};
pub use migrations::LATEST_VERSION;
pub use storage::{FileStorage, MemoryStorage, Storage};
