// Shared fixtures for rollcall-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rollcall_api::{DeleteAck, Error, RemoteGateway, RemoteRecord};
use rollcall_core::store::StoreError;
use rollcall_core::{HybridDataService, KeyValueStore, MemoryStore, Record, ServiceConfig};
use serde_json::Value;

/// Scripted in-memory backend.
#[derive(Default)]
pub struct StubGateway {
    online: AtomicBool,
    reject_writes: AtomicBool,
    assign_ids: AtomicBool,
    failure: Mutex<String>,
    latency: Mutex<Duration>,
    items: Mutex<HashMap<String, Vec<RemoteRecord>>>,
    next_id: AtomicUsize,
    pub probes: AtomicUsize,
    pub reads: AtomicUsize,
    pub saves: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub last_update_id: Mutex<Option<String>>,
}

impl StubGateway {
    pub fn online() -> Arc<Self> {
        let stub = Self::default();
        stub.online.store(true, Ordering::SeqCst);
        Arc::new(stub)
    }

    pub fn offline() -> Arc<Self> {
        let stub = Self::default();
        *stub.failure.lock().unwrap() = "connection refused".into();
        Arc::new(stub)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Go offline with a specific failure text.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = message.into();
        self.set_online(false);
    }

    /// Stay reachable for reads but refuse every write.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Answer saves with a backend-assigned id (`srv-N`).
    pub fn assign_ids(&self, assign: bool) {
        self.assign_ids.store(assign, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn seed(&self, collection: &str, items: Vec<Value>) {
        let records = items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.items
            .lock()
            .unwrap()
            .insert(collection.to_owned(), records);
    }

    pub fn remote_items(&self, collection: &str) -> Vec<RemoteRecord> {
        self.items
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), Error> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable(self.failure.lock().unwrap().clone()))
        }
    }

    fn check_writable(&self) -> Result<(), Error> {
        self.check_online()?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "write rejected".into(),
            });
        }
        Ok(())
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteGateway for StubGateway {
    async fn get_items(&self, collection: &str) -> Result<Vec<RemoteRecord>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_online()?;
        Ok(self.remote_items(collection))
    }

    async fn get_items_limited(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>, Error> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut items = self.remote_items(collection);
        items.truncate(limit);
        Ok(items)
    }

    async fn save_data(&self, item: &RemoteRecord, collection: &str) -> Result<RemoteRecord, Error> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut stored = item.clone();
        if self.assign_ids.load(Ordering::SeqCst) {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            stored.insert("id".into(), Value::String(format!("srv-{n}")));
        }
        self.items
            .lock()
            .unwrap()
            .entry(collection.to_owned())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update_data(
        &self,
        _key: &str,
        id: &str,
        item: &RemoteRecord,
        collection: &str,
    ) -> Result<RemoteRecord, Error> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        *self.last_update_id.lock().unwrap() = Some(id.to_owned());
        let mut items = self.items.lock().unwrap();
        let list = items.entry(collection.to_owned()).or_default();
        let mut stored = item.clone();
        stored.insert("id".into(), Value::String(id.to_owned()));
        match list
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
        {
            Some(existing) => *existing = stored.clone(),
            None => list.push(stored.clone()),
        }
        Ok(stored)
    }

    async fn delete_data(&self, _key: &str, id: &str, collection: &str) -> Result<DeleteAck, Error> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut items = self.items.lock().unwrap();
        let list = items.entry(collection.to_owned()).or_default();
        let before = list.len();
        list.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        Ok(DeleteAck {
            success: list.len() != before,
        })
    }
}

/// Memory store that refuses to write any key containing `poison`.
#[derive(Default)]
pub struct PoisonedStore {
    inner: MemoryStore,
    poison: String,
}

impl PoisonedStore {
    pub fn new(poison: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            poison: poison.into(),
        }
    }
}

#[async_trait]
impl KeyValueStore for PoisonedStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if key.contains(&self.poison) {
            return Err(StoreError::Unavailable(format!("cannot write {key}")));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys().await
    }
}

pub fn config(tag: &str) -> ServiceConfig {
    ServiceConfig {
        device_tag: Some(tag.into()),
        ..ServiceConfig::default()
    }
}

pub fn service_with(
    tag: &str,
    gateway: &Arc<StubGateway>,
) -> (HybridDataService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = HybridDataService::new(config(tag), store.clone(), gateway.clone());
    (service, store)
}

pub fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}
