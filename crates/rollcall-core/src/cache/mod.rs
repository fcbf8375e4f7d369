// ── Query result cache ──
//
// Per-collection snapshots of the last successful read, served for a TTL
// and written through to the local store so a cold start has something to
// show. Concurrent misses share one fetch; writes elsewhere in the layer
// invalidate the affected collection.

mod listener;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::CoreError;
use crate::model::Record;
use crate::model::key::cache_key;
use crate::store::KeyValueStore;

pub use listener::{CacheEvent, Listener, ListenerHandle};

type LoadResult = Result<Arc<Vec<Record>>, Arc<CoreError>>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Persisted form of a snapshot: `{data, timestamp}` with epoch millis.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    data: &'a [Record],
    timestamp: i64,
}

#[derive(Deserialize)]
struct Snapshot {
    data: Vec<Record>,
    timestamp: i64,
}

#[derive(Default)]
struct CacheEntry {
    data: Option<Arc<Vec<Record>>>,
    fetched_at: Option<DateTime<Utc>>,
    /// Bumped by every invalidation or direct write. A fetch only populates
    /// the entry if the generation it started under is still current.
    generation: u64,
    in_flight: Option<SharedLoad>,
}

impl CacheEntry {
    fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.data = None;
        self.fetched_at = None;
        self.in_flight = None;
    }
}

enum Slot {
    Fresh(Arc<Vec<Record>>),
    Loading(SharedLoad),
    Empty,
}

struct CacheInner {
    config: CacheConfig,
    store: Arc<dyn KeyValueStore>,
    entries: DashMap<String, CacheEntry>,
    listeners: DashMap<String, Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

/// Single-flight, TTL-bounded cache of collection reads.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                store,
                entries: DashMap::new(),
                listeners: DashMap::new(),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the collection's snapshot, fetching it with `loader` on a miss.
    ///
    /// A caller that finds another caller's fetch in flight awaits that
    /// fetch instead of starting its own, for at most the configured wait
    /// timeout. A failed fetch falls back to the stale in-memory snapshot,
    /// then to the persisted one, before the error is returned.
    pub async fn get_data<F, Fut>(
        &self,
        collection: &str,
        loader: F,
    ) -> Result<Arc<Vec<Record>>, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Record>, CoreError>> + Send + 'static,
    {
        let slot = self
            .inner
            .entries
            .get(collection)
            .map_or(Slot::Empty, |entry| self.inner.slot(&entry));

        let (load, leader) = match slot {
            Slot::Fresh(data) => {
                debug!(collection, "cache hit");
                return Ok(data);
            }
            Slot::Loading(load) => (load, false),
            Slot::Empty => {
                let fetch = loader();
                let mut entry = self.inner.entries.entry(collection.to_owned()).or_default();
                match self.inner.slot(&entry) {
                    Slot::Fresh(data) => return Ok(data),
                    Slot::Loading(load) => (load, false),
                    Slot::Empty => {
                        debug!(collection, "cache miss, fetching");
                        let load = run_load(
                            Arc::clone(&self.inner),
                            collection.to_owned(),
                            entry.generation,
                            fetch,
                        )
                        .boxed()
                        .shared();
                        entry.in_flight = Some(load.clone());
                        (load, true)
                    }
                }
            }
        };

        let outcome = if leader {
            load.await
        } else {
            let wait = self.inner.config.wait_timeout;
            match tokio::time::timeout(wait, load).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(collection, "timed out waiting for in-flight fetch");
                    return Err(CoreError::CacheTimeout {
                        collection: collection.to_owned(),
                        timeout_ms: millis(wait),
                    });
                }
            }
        };

        match outcome {
            Ok(data) => Ok(data),
            Err(err) => self.fallback(collection, err).await,
        }
    }

    /// The in-memory snapshot regardless of age, without fetching.
    pub fn peek(&self, collection: &str) -> Option<Arc<Vec<Record>>> {
        self.inner
            .entries
            .get(collection)
            .and_then(|entry| entry.data.clone())
    }

    pub fn is_cache_valid(&self, collection: &str) -> bool {
        self.inner
            .entries
            .get(collection)
            .is_some_and(|entry| matches!(self.inner.slot(&entry), Slot::Fresh(_)))
    }

    /// Drop the collection's snapshot in memory and on disk. A fetch already
    /// in flight still answers its callers but no longer populates the entry.
    pub async fn invalidate(&self, collection: &str) {
        if let Some(mut entry) = self.inner.entries.get_mut(collection) {
            entry.reset();
        }
        debug!(collection, "cache invalidated");
        self.inner.notify(collection, &CacheEvent::Invalidated);
        if let Err(e) = self.inner.store.remove(&cache_key(collection)).await {
            warn!(collection, error = %e, "failed to remove persisted cache snapshot");
        }
    }

    /// Invalidate every collection and delete every persisted snapshot.
    pub async fn clear_all(&self) {
        let collections: Vec<String> = self
            .inner
            .entries
            .iter_mut()
            .map(|mut entry| {
                entry.reset();
                entry.key().clone()
            })
            .collect();
        for collection in &collections {
            self.inner.notify(collection, &CacheEvent::Invalidated);
        }

        let prefix = cache_key("");
        match self.inner.store.keys().await {
            Ok(keys) => {
                for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
                    if let Err(e) = self.inner.store.remove(key).await {
                        warn!(%key, error = %e, "failed to remove persisted cache snapshot");
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to list persisted cache snapshots"),
        }
    }

    // ── Optimistic mutation ──────────────────────────────────────────

    /// Replace the snapshot outright, as if freshly fetched.
    pub async fn update_cache(&self, collection: &str, items: Vec<Record>) {
        let data = Arc::new(items);
        let fetched_at = Utc::now();
        {
            let mut entry = self.inner.entries.entry(collection.to_owned()).or_default();
            entry.reset();
            entry.data = Some(Arc::clone(&data));
            entry.fetched_at = Some(fetched_at);
        }
        self.inner.publish(collection, &data, fetched_at).await;
    }

    /// Append to an existing snapshot. `false` if nothing is cached.
    pub async fn add_to_cache(&self, collection: &str, item: Record) -> bool {
        self.mutate(collection, |items| {
            items.push(item);
            true
        })
        .await
    }

    /// Replace the cached item with the same id. `false` if absent.
    pub async fn update_in_cache(&self, collection: &str, id: &str, item: Record) -> bool {
        self.mutate(collection, |items| {
            match items.iter_mut().find(|r| r.id() == Some(id)) {
                Some(slot) => {
                    *slot = item;
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Drop the cached item with this id. `false` if absent.
    pub async fn remove_from_cache(&self, collection: &str, id: &str) -> bool {
        self.mutate(collection, |items| {
            let before = items.len();
            items.retain(|r| r.id() != Some(id));
            items.len() != before
        })
        .await
    }

    async fn mutate(&self, collection: &str, edit: impl FnOnce(&mut Vec<Record>) -> bool) -> bool {
        let Some((data, fetched_at)) = self.inner.edit_entry(collection, edit) else {
            return false;
        };
        self.inner.publish(collection, &data, fetched_at).await;
        true
    }

    // ── Listeners ────────────────────────────────────────────────────

    pub fn add_listener<F>(&self, collection: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&CacheEvent<'_>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .entry(collection.to_owned())
            .or_default()
            .push((id, Arc::new(callback)));
        ListenerHandle {
            cache: Arc::downgrade(&self.inner),
            collection: collection.to_owned(),
            id,
        }
    }

    pub fn listener_count(&self, collection: &str) -> usize {
        self.inner.listeners.get(collection).map_or(0, |l| l.len())
    }

    // ── Hydration ────────────────────────────────────────────────────

    /// Load persisted snapshots younger than the restore age into memory.
    /// Returns how many collections were restored.
    pub async fn initialize_from_storage(&self) -> Result<usize, CoreError> {
        let prefix = cache_key("");
        let keys = self.inner.store.keys().await?;
        let max_age = self.inner.config.restore_max_age;
        let mut restored = 0;

        for key in keys {
            let Some(collection) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some((data, fetched_at)) = self.inner.read_snapshot(collection).await else {
                continue;
            };
            if age_of(fetched_at) >= max_age {
                debug!(collection, "persisted snapshot too old, skipping");
                continue;
            }
            let mut entry = self.inner.entries.entry(collection.to_owned()).or_default();
            if entry.data.is_none() {
                entry.data = Some(data);
                entry.fetched_at = Some(fetched_at);
                restored += 1;
            }
        }

        debug!(restored, "cache hydrated from storage");
        Ok(restored)
    }

    async fn fallback(
        &self,
        collection: &str,
        err: Arc<CoreError>,
    ) -> Result<Arc<Vec<Record>>, CoreError> {
        if let Some(stale) = self.peek(collection) {
            warn!(collection, error = %err, "fetch failed, serving stale snapshot");
            return Ok(stale);
        }
        if let Some((persisted, _)) = self.inner.read_snapshot(collection).await {
            warn!(collection, error = %err, "fetch failed, serving persisted snapshot");
            return Ok(persisted);
        }
        Err(CoreError::from_shared(err))
    }
}

impl CacheInner {
    fn slot(&self, entry: &CacheEntry) -> Slot {
        if let (Some(data), Some(fetched_at)) = (&entry.data, entry.fetched_at) {
            if age_of(fetched_at) < self.config.ttl {
                return Slot::Fresh(Arc::clone(data));
            }
        }
        entry.in_flight.clone().map_or(Slot::Empty, Slot::Loading)
    }

    fn edit_entry(
        &self,
        collection: &str,
        edit: impl FnOnce(&mut Vec<Record>) -> bool,
    ) -> Option<(Arc<Vec<Record>>, DateTime<Utc>)> {
        let mut entry = self.entries.get_mut(collection)?;
        let fetched_at = entry.fetched_at?;
        let mut items = entry.data.as_deref()?.clone();
        if !edit(&mut items) {
            return None;
        }
        let data = Arc::new(items);
        entry.generation = entry.generation.wrapping_add(1);
        entry.in_flight = None;
        entry.data = Some(Arc::clone(&data));
        Some((data, fetched_at))
    }

    async fn publish(&self, collection: &str, data: &Arc<Vec<Record>>, fetched_at: DateTime<Utc>) {
        self.notify(collection, &CacheEvent::Updated(data));
        self.persist(collection, data, fetched_at).await;
    }

    fn notify(&self, collection: &str, event: &CacheEvent<'_>) {
        let listeners: Vec<Listener> = match self.listeners.get(collection) {
            Some(registered) => registered.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return,
        };
        listener::dispatch(&listeners, collection, event);
    }

    async fn persist(&self, collection: &str, data: &[Record], fetched_at: DateTime<Utc>) {
        if !self.config.persist {
            return;
        }
        let snapshot = SnapshotRef {
            data,
            timestamp: fetched_at.timestamp_millis(),
        };
        let result = match serde_json::to_value(&snapshot) {
            Ok(value) => self
                .store
                .set(&cache_key(collection), value)
                .await
                .map_err(CoreError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(collection, error = %e, "failed to persist cache snapshot");
        }
    }

    async fn read_snapshot(&self, collection: &str) -> Option<(Arc<Vec<Record>>, DateTime<Utc>)> {
        let value = match self.store.get(&cache_key(collection)).await {
            Ok(value) => value?,
            Err(e) => {
                debug!(collection, error = %e, "cannot read persisted snapshot");
                return None;
            }
        };
        match serde_json::from_value::<Snapshot>(value) {
            Ok(snapshot) => {
                let fetched_at = Utc.timestamp_millis_opt(snapshot.timestamp).single()?;
                Some((Arc::new(snapshot.data), fetched_at))
            }
            Err(e) => {
                debug!(collection, error = %e, "ignoring malformed persisted snapshot");
                None
            }
        }
    }
}

async fn run_load<Fut>(
    inner: Arc<CacheInner>,
    collection: String,
    generation: u64,
    fetch: Fut,
) -> LoadResult
where
    Fut: Future<Output = Result<Vec<Record>, CoreError>> + Send + 'static,
{
    match fetch.await {
        Ok(items) => {
            let data = Arc::new(items);
            let fetched_at = Utc::now();
            let current = {
                let mut entry = inner.entries.entry(collection.clone()).or_default();
                let current = entry.generation == generation;
                if current {
                    entry.data = Some(Arc::clone(&data));
                    entry.fetched_at = Some(fetched_at);
                    entry.in_flight = None;
                }
                current
            };
            if current {
                debug!(collection = %collection, count = data.len(), "cache populated");
                inner.publish(&collection, &data, fetched_at).await;
            } else {
                debug!(collection = %collection, "fetch finished after invalidation, not cached");
            }
            Ok(data)
        }
        Err(e) => {
            if let Some(mut entry) = inner.entries.get_mut(&collection) {
                if entry.generation == generation {
                    entry.in_flight = None;
                }
            }
            Err(Arc::new(e))
        }
    }
}

fn age_of(at: DateTime<Utc>) -> Duration {
    // A timestamp in the future (clock moved back) counts as brand new.
    (Utc::now() - at).to_std().unwrap_or_default()
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::AtomicUsize;

    type Loader = Box<dyn FnOnce() -> BoxFuture<'static, Result<Vec<Record>, CoreError>> + Send>;

    fn records(ids: &[&str]) -> Vec<Record> {
        ids.iter().map(|id| Record::new().with("id", *id)).collect()
    }

    fn ids(data: &[Record]) -> Vec<String> {
        data.iter().filter_map(|r| r.id().map(str::to_owned)).collect()
    }

    fn loader(calls: &Arc<AtomicUsize>, ids: &'static [&'static str], delay: Duration) -> Loader {
        let calls = Arc::clone(calls);
        Box::new(move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok::<_, CoreError>(records(ids))
            }
            .boxed()
        })
    }

    fn failing() -> Loader {
        Box::new(|| {
            async {
                Err::<Vec<Record>, _>(CoreError::Remote {
                    message: "offline".into(),
                    status: None,
                })
            }
            .boxed()
        })
    }

    fn cache(config: CacheConfig) -> (QueryCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (QueryCache::new(store.clone(), config), store)
    }

    #[tokio::test]
    async fn serves_within_ttl_and_refetches_after() {
        let (cache, _) = cache(CacheConfig {
            ttl: Duration::from_millis(60),
            ..CacheConfig::default()
        });
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_data("cases", loader(&calls, &["c1"], Duration::ZERO)).await.unwrap();
        cache.get_data("cases", loader(&calls, &["c1"], Duration::ZERO)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_cache_valid("cases"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!cache.is_cache_valid("cases"));
        cache.get_data("cases", loader(&calls, &["c1"], Duration::ZERO)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let (cache, _) = cache(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = Duration::from_millis(30);

        let (a, b, c) = tokio::join!(
            cache.get_data("employees", loader(&calls, &["e1", "e2"], slow)),
            cache.get_data("employees", loader(&calls, &["e1", "e2"], slow)),
            cache.get_data("employees", loader(&calls, &["e1", "e2"], slow)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ids(&a.unwrap()), ["e1", "e2"]);
        assert_eq!(ids(&b.unwrap()), ["e1", "e2"]);
        assert_eq!(ids(&c.unwrap()), ["e1", "e2"]);
    }

    #[tokio::test]
    async fn waiter_timeout_does_not_poison_entry() {
        let (cache, _) = cache(CacheConfig {
            wait_timeout: Duration::from_millis(20),
            ..CacheConfig::default()
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = Duration::from_millis(150);

        let (leader, waiter) = tokio::join!(
            cache.get_data("payroll", loader(&calls, &["p1"], slow)),
            cache.get_data("payroll", loader(&calls, &["p1"], slow)),
        );

        assert!(matches!(
            waiter.unwrap_err(),
            CoreError::CacheTimeout { ref collection, timeout_ms: 20 } if collection == "payroll"
        ));
        assert_eq!(ids(&leader.unwrap()), ["p1"]);
        assert!(cache.is_cache_valid("payroll"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_serves_stale_memory_snapshot() {
        let (cache, _) = cache(CacheConfig {
            ttl: Duration::ZERO,
            ..CacheConfig::default()
        });
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_data("leaves", loader(&calls, &["l1"], Duration::ZERO)).await.unwrap();
        let stale = cache.get_data("leaves", failing()).await.unwrap();
        assert_eq!(ids(&stale), ["l1"]);
    }

    #[tokio::test]
    async fn failure_serves_persisted_snapshot_after_restart() {
        let (first, store) = cache(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        first.get_data("vehicles", loader(&calls, &["v1"], Duration::ZERO)).await.unwrap();
        assert!(store.get("cache_vehicles").await.unwrap().is_some());

        let restarted = QueryCache::new(store, CacheConfig::default());
        let data = restarted.get_data("vehicles", failing()).await.unwrap();
        assert_eq!(ids(&data), ["v1"]);
    }

    #[tokio::test]
    async fn failure_without_any_snapshot_propagates() {
        let (cache, _) = cache(CacheConfig::default());
        let err = cache.get_data("cases", failing()).await.unwrap_err();
        assert!(matches!(err, CoreError::Remote { .. }));
        assert!(!cache.is_cache_valid("cases"));
    }

    #[tokio::test]
    async fn invalidate_drops_memory_and_persisted_snapshot() {
        let (cache, store) = cache(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_data("cases", loader(&calls, &["c1"], Duration::ZERO)).await.unwrap();

        cache.invalidate("cases").await;
        assert!(!cache.is_cache_valid("cases"));
        assert!(cache.peek("cases").is_none());
        assert!(store.get("cache_cases").await.unwrap().is_none());

        cache.get_data("cases", loader(&calls, &["c1"], Duration::ZERO)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_racing_invalidation_is_not_cached() {
        let (cache, _) = cache(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let (result, ()) = tokio::join!(
            cache.get_data("cases", loader(&calls, &["old"], Duration::from_millis(50))),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.invalidate("cases").await;
            },
        );

        assert_eq!(ids(&result.unwrap()), ["old"]);
        assert!(!cache.is_cache_valid("cases"));
    }

    #[tokio::test]
    async fn optimistic_mutations() {
        let (cache, store) = cache(CacheConfig::default());
        assert!(!cache.add_to_cache("cases", Record::new().with("id", "x")).await);

        cache.update_cache("cases", records(&["a", "b"])).await;
        assert!(cache.add_to_cache("cases", Record::new().with("id", "c")).await);
        assert!(
            cache
                .update_in_cache("cases", "b", Record::new().with("id", "b").with("status", "closed"))
                .await
        );
        assert!(cache.remove_from_cache("cases", "a").await);
        assert!(!cache.remove_from_cache("cases", "missing").await);

        let data = cache.peek("cases").unwrap();
        assert_eq!(ids(&data), ["b", "c"]);
        assert_eq!(data[0].get_str("status"), Some("closed"));

        let persisted = store.get("cache_cases").await.unwrap().unwrap();
        assert_eq!(persisted["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn listeners_notified_until_unsubscribed() {
        let (cache, _) = cache(CacheConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));

        let _bad = cache.add_listener("cases", |_| panic!("listener bug"));
        let counter = Arc::clone(&seen);
        let handle = cache.add_listener("cases", move |event| {
            if matches!(event, CacheEvent::Updated(items) if items.len() == 2) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(cache.listener_count("cases"), 2);

        cache.update_cache("cases", records(&["a", "b"])).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        handle.unsubscribe();
        assert_eq!(cache.listener_count("cases"), 1);
        cache.update_cache("cases", records(&["a", "b"])).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hydration_restores_only_recent_snapshots() {
        let (cache, store) = cache(CacheConfig::default());
        let now = Utc::now().timestamp_millis();
        let two_hours = 2 * 60 * 60 * 1000;
        store
            .set("cache_cases", serde_json::json!({"data": [{"id": "c1"}], "timestamp": now}))
            .await
            .unwrap();
        store
            .set(
                "cache_leaves",
                serde_json::json!({"data": [{"id": "l1"}], "timestamp": now - two_hours}),
            )
            .await
            .unwrap();
        store.set("cache_broken", serde_json::json!("nope")).await.unwrap();
        store.set("cases_c1", serde_json::json!({"id": "c1"})).await.unwrap();

        assert_eq!(cache.initialize_from_storage().await.unwrap(), 1);
        assert!(cache.is_cache_valid("cases"));
        assert!(cache.peek("leaves").is_none());

        let calls = Arc::new(AtomicUsize::new(0));
        let data = cache.get_data("cases", loader(&calls, &["zzz"], Duration::ZERO)).await.unwrap();
        assert_eq!(ids(&data), ["c1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clear_all_removes_every_snapshot() {
        let (cache, store) = cache(CacheConfig::default());
        cache.update_cache("cases", records(&["a"])).await;
        cache.update_cache("leaves", records(&["b"])).await;
        store.set("deviceId", serde_json::json!("host_abc1234")).await.unwrap();

        cache.clear_all().await;

        assert!(!cache.is_cache_valid("cases"));
        assert!(!cache.is_cache_valid("leaves"));
        assert_eq!(store.keys().await.unwrap(), ["deviceId"]);
    }
}
