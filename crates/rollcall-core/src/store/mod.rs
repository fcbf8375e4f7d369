// ── Local key-value store ──
//
// Thin async wrapper over persistent device storage. Everything the data
// layer keeps locally (records, device id, option lists, cache snapshots)
// lives here under a string key.

mod file;
mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Failure of the local store. Fatal for writes; there is no second store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("value stored under '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistent string-keyed JSON storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Every key currently stored, in discovery order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Load a list of strings, treating a missing or mistyped value as empty.
pub(crate) async fn load_string_list(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<String>, StoreError> {
    Ok(match store.get(key).await? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

pub(crate) async fn save_string_list(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[String],
) -> Result<(), StoreError> {
    let value = Value::Array(items.iter().cloned().map(Value::String).collect());
    store.set(key, value).await
}
