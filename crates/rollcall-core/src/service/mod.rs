// ── Hybrid data service ──
//
// Every write lands in the local store first and is then offered to the
// backend if the probe says it is reachable. A remote failure never fails
// the write; the record just stays `synced = false` until `manual_sync`.
// Reads prefer the backend and fall back to the local copy.

mod options;
mod sync;

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::try_join_all;
use rollcall_api::RemoteGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::config::ServiceConfig;
use crate::error::CoreError;
use crate::identity::DeviceIdentity;
use crate::model::key::collection_prefix;
use crate::model::{Record, StorageKey, fields, timestamp_now, validate_collection};
use crate::probe::AvailabilityProber;
use crate::store::KeyValueStore;

pub use options::OPTIONS_COLLECTION;
pub use sync::SyncReport;

/// Result of [`HybridDataService::delete_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    pub id: String,
}

struct ServiceInner {
    config: ServiceConfig,
    store: Arc<dyn KeyValueStore>,
    gateway: Arc<dyn RemoteGateway>,
    identity: DeviceIdentity,
    prober: AvailabilityProber,
    cache: QueryCache,
    /// One async mutex per storage key; same-key writes run one at a time.
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Offline-first CRUD over the local store and the remote gateway.
///
/// Cheaply cloneable; clones share the store, gateway, cache and locks.
#[derive(Clone)]
pub struct HybridDataService {
    inner: Arc<ServiceInner>,
}

impl HybridDataService {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn KeyValueStore>,
        gateway: Arc<dyn RemoteGateway>,
    ) -> Self {
        let identity = DeviceIdentity::new(Arc::clone(&store), config.device_tag.clone());
        let prober = AvailabilityProber::new(Arc::clone(&gateway), config.probe_collection.clone());
        let cache = QueryCache::new(Arc::clone(&store), config.cache.clone());
        Self {
            inner: Arc::new(ServiceInner {
                config,
                store,
                gateway,
                identity,
                prober,
                cache,
                write_locks: DashMap::new(),
            }),
        }
    }

    /// Resolve the device id and hydrate the query cache from storage.
    /// Returns the number of cached collections restored.
    pub async fn initialize(&self) -> Result<usize, CoreError> {
        let device_id = self.device_id().await;
        let restored = self.inner.cache.initialize_from_storage().await?;
        debug!(%device_id, restored, "data service initialized");
        Ok(restored)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.identity
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    pub async fn device_id(&self) -> String {
        self.inner.identity.device_id().await
    }

    pub async fn is_backend_available(&self) -> bool {
        self.inner.prober.is_available().await
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// All items of a collection: remote when reachable, else local.
    ///
    /// Never fails. An invalid collection name or an unreadable store
    /// yields an empty list.
    pub async fn get_items(&self, collection: &str) -> Vec<Record> {
        if let Err(e) = validate_collection(collection) {
            warn!(collection, error = %e, "refusing to read invalid collection");
            return Vec::new();
        }

        if self.is_backend_available().await {
            match self.inner.gateway.get_items(collection).await {
                Ok(items) => {
                    debug!(collection, count = items.len(), "read from backend");
                    return items.into_iter().map(Record::from).collect();
                }
                Err(e) => {
                    warn!(collection, error = %e, "backend read failed, using local data");
                }
            }
        }
        self.local_items(collection).await
    }

    /// Only the locally stored items of a collection. Never fails.
    pub async fn local_items(&self, collection: &str) -> Vec<Record> {
        match self.scan_local(collection).await {
            Ok(items) => items,
            Err(e) => {
                warn!(collection, error = %e, "local read failed");
                Vec::new()
            }
        }
    }

    /// [`get_items`](Self::get_items) through the query cache.
    pub async fn cached_items(&self, collection: &str) -> Result<Arc<Vec<Record>>, CoreError> {
        validate_collection(collection)?;
        let service = self.clone();
        let owned = collection.to_owned();
        self.inner
            .cache
            .get_data(collection, move || async move {
                Ok::<_, CoreError>(service.get_items(&owned).await)
            })
            .await
    }

    /// One locally stored record, if present.
    pub async fn get_local(&self, collection: &str, id: &str) -> Result<Option<Record>, CoreError> {
        let key = StorageKey::new(collection, id)?;
        self.load_record(&key).await
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Create a record locally, then try the backend.
    ///
    /// Fills in `id` (unless supplied), `deviceId` (unless supplied),
    /// `createdAt` (unless supplied) and `updatedAt`. If the backend answers
    /// with a different id it is kept as `remoteId`; the local id stays.
    pub async fn save_data(&self, data: Record, collection: &str) -> Result<Record, CoreError> {
        validate_collection(collection)?;
        let id = data
            .id()
            .map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_owned);
        let key = StorageKey::new(collection, &id)?;
        let _guard = self.lock(&key).await;

        let now = timestamp_now();
        let mut record = data;
        record.insert(fields::ID, id.as_str());
        if record.device_id().is_none() {
            record.insert(fields::DEVICE_ID, self.device_id().await);
        }
        if record.get(fields::CREATED_AT).is_none() {
            record.insert(fields::CREATED_AT, now.as_str());
        }
        record.insert(fields::UPDATED_AT, now);
        record.set_synced(false);
        self.persist(&key, &record).await?;
        debug!(%key, "saved locally");

        if self.is_backend_available().await {
            match self.inner.gateway.save_data(record.as_map(), collection).await {
                Ok(remote) => {
                    record.set_synced(true);
                    if let Some(remote_id) = remote.get(fields::ID).and_then(Value::as_str) {
                        if remote_id != id {
                            record.insert(fields::REMOTE_ID, remote_id);
                        }
                    }
                    self.persist(&key, &record).await?;
                    debug!(%key, "saved to backend");
                }
                Err(e) => warn!(%key, error = %e, "backend save failed, kept locally"),
            }
        }

        self.inner.cache.invalidate(collection).await;
        Ok(record)
    }

    /// Merge `data` over the stored record and offer the result to the
    /// backend. `id`, `deviceId` and `createdAt` of the stored copy win.
    pub async fn update_data(
        &self,
        collection: &str,
        id: &str,
        data: Record,
    ) -> Result<Record, CoreError> {
        let key = StorageKey::new(collection, id)?;
        let _guard = self.lock(&key).await;

        let existing = self.load_record(&key).await?;
        let mut record = existing.clone().unwrap_or_default();
        record.merge(data);
        if let Some(previous) = &existing {
            for field in [fields::DEVICE_ID, fields::CREATED_AT] {
                if let Some(value) = previous.get(field) {
                    record.insert(field, value.clone());
                }
            }
        }
        record.insert(fields::ID, id);
        if record.device_id().is_none() {
            record.insert(fields::DEVICE_ID, self.device_id().await);
        }
        let now = timestamp_now();
        if record.get(fields::CREATED_AT).is_none() {
            record.insert(fields::CREATED_AT, now.as_str());
        }
        record.insert(fields::UPDATED_AT, now);
        record.set_synced(false);
        self.persist(&key, &record).await?;
        debug!(%key, "updated locally");

        if self.is_backend_available().await {
            let remote_id = record.get_str(fields::REMOTE_ID).unwrap_or(id).to_owned();
            let result = self
                .inner
                .gateway
                .update_data(&key.to_string(), &remote_id, record.as_map(), collection)
                .await;
            match result {
                Ok(_) => {
                    record.set_synced(true);
                    self.persist(&key, &record).await?;
                    debug!(%key, "updated on backend");
                }
                Err(e) => warn!(%key, error = %e, "backend update failed, kept locally"),
            }
        }

        self.inner.cache.invalidate(collection).await;
        Ok(record)
    }

    /// [`update_data`](Self::update_data) addressed by an explicit storage
    /// key, which must equal `"<collection>_<id>"`.
    pub async fn update_by_key(
        &self,
        key: &str,
        id: &str,
        data: Record,
        collection: &str,
    ) -> Result<Record, CoreError> {
        StorageKey::verify(key, collection, id)?;
        self.update_data(collection, id, data).await
    }

    /// Delete remotely (best effort) then locally (always).
    pub async fn delete_data(&self, collection: &str, id: &str) -> Result<DeleteOutcome, CoreError> {
        let key = StorageKey::new(collection, id)?;
        let _guard = self.lock(&key).await;
        let storage_key = key.to_string();

        if self.is_backend_available().await {
            let remote_id = match self.load_record(&key).await {
                Ok(Some(record)) => record.get_str(fields::REMOTE_ID).unwrap_or(id).to_owned(),
                _ => id.to_owned(),
            };
            match self
                .inner
                .gateway
                .delete_data(&storage_key, &remote_id, collection)
                .await
            {
                Ok(ack) if !ack.success => {
                    warn!(%key, "backend declined delete");
                }
                Ok(_) => debug!(%key, "deleted on backend"),
                Err(e) => warn!(%key, error = %e, "backend delete failed"),
            }
        }

        self.inner.store.remove(&storage_key).await?;
        debug!(%key, "deleted locally");
        self.inner.cache.invalidate(collection).await;
        Ok(DeleteOutcome {
            success: true,
            id: id.to_owned(),
        })
    }

    /// [`delete_data`](Self::delete_data) addressed by an explicit storage key.
    pub async fn delete_by_key(
        &self,
        key: &str,
        id: &str,
        collection: &str,
    ) -> Result<DeleteOutcome, CoreError> {
        StorageKey::verify(key, collection, id)?;
        self.delete_data(collection, id).await
    }

    /// Save many records in fixed-size chunks. Chunks run one after another;
    /// records inside a chunk are saved concurrently. A chunk with any
    /// failure is logged and dropped from the result.
    pub async fn batch_save_data(&self, items: Vec<Record>, collection: &str) -> Vec<Record> {
        if let Err(e) = validate_collection(collection) {
            warn!(collection, error = %e, "refusing to batch-save into invalid collection");
            return Vec::new();
        }

        let chunk_size = self.inner.config.batch_chunk_size.max(1);
        let total = items.len();
        let mut saved = Vec::with_capacity(total);
        for (index, chunk) in items.chunks(chunk_size).enumerate() {
            let saves = chunk
                .iter()
                .cloned()
                .map(|item| self.save_data(item, collection));
            match try_join_all(saves).await {
                Ok(records) => saved.extend(records),
                Err(e) => warn!(collection, chunk = index, error = %e, "batch chunk failed, skipped"),
            }
        }
        debug!(collection, saved = saved.len(), total, "batch save finished");
        saved
    }

    // ── Local plumbing ───────────────────────────────────────────────

    async fn lock(&self, key: &StorageKey) -> OwnedMutexGuard<()> {
        self.lock_key(key.to_string()).await
    }

    /// Serialize read-modify-write cycles on one store key.
    async fn lock_key(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&self.inner.write_locks.entry(key).or_default());
        lock.lock_owned().await
    }

    async fn persist(&self, key: &StorageKey, record: &Record) -> Result<(), CoreError> {
        self.inner
            .store
            .set(&key.to_string(), record.to_value())
            .await
            .map_err(CoreError::from)
    }

    async fn load_record(&self, key: &StorageKey) -> Result<Option<Record>, CoreError> {
        Ok(self
            .inner
            .store
            .get(&key.to_string())
            .await?
            .and_then(Record::from_value))
    }

    /// Write an already-complete record (e.g. from an import) under the
    /// per-key lock, without touching the backend.
    pub(crate) async fn write_local(&self, collection: &str, record: &Record) -> Result<(), CoreError> {
        let id = record.id().unwrap_or_default();
        let key = StorageKey::new(collection, id)?;
        let _guard = self.lock(&key).await;
        self.persist(&key, record).await
    }

    /// Every readable record stored under the collection's prefix. Entries
    /// that are missing, unreadable or not JSON objects are skipped.
    async fn scan_local(&self, collection: &str) -> Result<Vec<Record>, CoreError> {
        validate_collection(collection)?;
        let prefix = collection_prefix(collection);
        let keys = self.inner.store.keys().await?;

        let mut items = Vec::new();
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            let Some(key_id) = StorageKey::id_from_key(key, collection) else {
                continue;
            };
            let value = match self.inner.store.get(key).await {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    debug!(%key, error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Some(mut record) = Record::from_value(value) else {
                debug!(%key, "skipping non-object entry");
                continue;
            };
            if record.id().is_none() {
                record.insert(fields::ID, key_id);
            }
            items.push(record);
        }
        Ok(items)
    }
}
