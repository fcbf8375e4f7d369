// ── Option lists ──
//
// Per-field pick lists (departments, ranks, ...). Locally each field has an
// active list and a tombstone list; a tombstone hides a value even when the
// backend keeps sending it back.

use serde_json::{Map, Value};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use super::HybridDataService;
use crate::error::CoreError;
use crate::model::key::{deleted_options_key, options_key};
use crate::store::{load_string_list, save_string_list};

/// Remote collection holding `{fieldName, value}` items.
pub const OPTIONS_COLLECTION: &str = "fieldOptions";

const FIELD_NAME: &str = "fieldName";
const VALUE: &str = "value";

impl HybridDataService {
    /// Visible values of an option field: local values plus (when reachable)
    /// remote values, minus tombstones. The merged list is saved locally.
    pub async fn get_options(&self, field: &str) -> Result<Vec<String>, CoreError> {
        let remote = self.remote_options(field).await;
        let _guard = self.lock_options(field).await;
        self.merge_visible(field, &remote).await
    }

    /// Local visible values only; no backend round trip.
    pub async fn local_options(&self, field: &str) -> Result<Vec<String>, CoreError> {
        let store = self.inner.store.as_ref();
        let mut active = load_string_list(store, &options_key(field)).await?;
        let deleted = load_string_list(store, &deleted_options_key(field)).await?;
        active.retain(|v| !deleted.contains(v));
        Ok(active)
    }

    /// Tombstoned values of a field.
    pub async fn deleted_options(&self, field: &str) -> Result<Vec<String>, CoreError> {
        Ok(load_string_list(self.inner.store.as_ref(), &deleted_options_key(field)).await?)
    }

    /// Add a value. Returns `false` if it is empty or already visible.
    ///
    /// Adding a tombstoned value clears its tombstone.
    pub async fn add_option(&self, field: &str, value: &str) -> Result<bool, CoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(false);
        }

        let remote = self.remote_options(field).await;
        {
            let _guard = self.lock_options(field).await;
            let mut active = self.merge_visible(field, &remote).await?;
            if active.iter().any(|v| v == value) {
                return Ok(false);
            }
            active.push(value.to_owned());
            save_string_list(self.inner.store.as_ref(), &options_key(field), &active).await?;
            self.edit_tombstones(field, |deleted| {
                let before = deleted.len();
                deleted.retain(|v| v != value);
                deleted.len() != before
            })
            .await?;
        }
        debug!(field, value, "option added");

        if self.is_backend_available().await {
            let mut item = Map::new();
            item.insert(FIELD_NAME.into(), Value::from(field));
            item.insert(VALUE.into(), Value::from(value));
            if let Err(e) = self.inner.gateway.save_data(&item, OPTIONS_COLLECTION).await {
                warn!(field, value, error = %e, "backend option save failed, kept locally");
            }
        }
        Ok(true)
    }

    /// Tombstone a value. Returns `false` if it was already tombstoned.
    /// The active list and the backend are left alone.
    pub async fn remove_option(&self, field: &str, value: &str) -> Result<bool, CoreError> {
        let removed = {
            let _guard = self.lock_options(field).await;
            self.edit_tombstones(field, |deleted| {
                if deleted.iter().any(|v| v == value) {
                    false
                } else {
                    deleted.push(value.to_owned());
                    true
                }
            })
            .await?
        };
        if removed {
            debug!(field, value, "option tombstoned");
        }
        Ok(removed)
    }

    /// Clear a tombstone. Returns `false` if the value was not tombstoned.
    pub async fn restore_option(&self, field: &str, value: &str) -> Result<bool, CoreError> {
        let restored = {
            let _guard = self.lock_options(field).await;
            self.edit_tombstones(field, |deleted| {
                let before = deleted.len();
                deleted.retain(|v| v != value);
                deleted.len() != before
            })
            .await?
        };
        if restored {
            debug!(field, value, "option restored");
        }
        Ok(restored)
    }

    /// Ordered union of `values` into the local active list. Returns how
    /// many values were new.
    pub(crate) async fn merge_options(&self, field: &str, values: &[String]) -> Result<usize, CoreError> {
        let _guard = self.lock_options(field).await;
        let store = self.inner.store.as_ref();
        let key = options_key(field);
        let mut active = load_string_list(store, &key).await?;
        let before = active.len();
        for value in values {
            if !active.contains(value) {
                active.push(value.clone());
            }
        }
        let added = active.len() - before;
        if added > 0 {
            save_string_list(store, &key, &active).await?;
        }
        Ok(added)
    }

    /// One lock per field covers both its active and tombstone lists.
    async fn lock_options(&self, field: &str) -> OwnedMutexGuard<()> {
        self.lock_key(options_key(field)).await
    }

    /// Remote values of `field`; empty when the backend is unreachable.
    async fn remote_options(&self, field: &str) -> Vec<String> {
        if !self.is_backend_available().await {
            return Vec::new();
        }
        match self.inner.gateway.get_items(OPTIONS_COLLECTION).await {
            Ok(items) => items
                .iter()
                .filter(|item| item.get(FIELD_NAME).and_then(Value::as_str) == Some(field))
                .filter_map(|item| item.get(VALUE).and_then(Value::as_str))
                .map(str::to_owned)
                .collect(),
            Err(e) => {
                warn!(field, error = %e, "backend options read failed, using local list");
                Vec::new()
            }
        }
    }

    /// Fold `remote` into the active list, drop tombstoned values and save.
    /// Caller holds the field lock.
    async fn merge_visible(&self, field: &str, remote: &[String]) -> Result<Vec<String>, CoreError> {
        let store = self.inner.store.as_ref();
        let mut active = load_string_list(store, &options_key(field)).await?;
        let deleted = load_string_list(store, &deleted_options_key(field)).await?;
        for value in remote {
            if !active.contains(value) {
                active.push(value.clone());
            }
        }
        active.retain(|v| !deleted.contains(v));
        save_string_list(store, &options_key(field), &active).await?;
        Ok(active)
    }

    /// Caller holds the field lock.
    async fn edit_tombstones(
        &self,
        field: &str,
        edit: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> Result<bool, CoreError> {
        let store = self.inner.store.as_ref();
        let key = deleted_options_key(field);
        let mut deleted = load_string_list(store, &key).await?;
        if !edit(&mut deleted) {
            return Ok(false);
        }
        save_string_list(store, &key, &deleted).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rollcall_api::{DeleteAck, RemoteGateway, RemoteRecord};
    use serde_json::json;

    use super::*;
    use crate::config::ServiceConfig;
    use crate::store::{FileStore, KeyValueStore, MemoryStore};

    /// Backend that only serves a fixed option list.
    struct OptionsBackend(Vec<RemoteRecord>);

    #[async_trait::async_trait]
    impl RemoteGateway for OptionsBackend {
        async fn get_items(&self, collection: &str) -> Result<Vec<RemoteRecord>, rollcall_api::Error> {
            Ok(if collection == OPTIONS_COLLECTION {
                self.0.clone()
            } else {
                Vec::new()
            })
        }
        async fn save_data(
            &self,
            item: &RemoteRecord,
            _c: &str,
        ) -> Result<RemoteRecord, rollcall_api::Error> {
            Ok(item.clone())
        }
        async fn update_data(
            &self,
            _key: &str,
            _id: &str,
            item: &RemoteRecord,
            _c: &str,
        ) -> Result<RemoteRecord, rollcall_api::Error> {
            Ok(item.clone())
        }
        async fn delete_data(
            &self,
            _key: &str,
            _id: &str,
            _c: &str,
        ) -> Result<DeleteAck, rollcall_api::Error> {
            Ok(DeleteAck { success: true })
        }
    }

    fn option(field: &str, value: &str) -> RemoteRecord {
        match json!({"fieldName": field, "value": value}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn service(remote: Vec<RemoteRecord>) -> (HybridDataService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = HybridDataService::new(
            ServiceConfig::default(),
            store.clone(),
            Arc::new(OptionsBackend(remote)),
        );
        (service, store)
    }

    #[tokio::test]
    async fn union_of_local_and_remote_is_persisted() {
        let (service, store) = service(vec![
            option("ranks", "Sergeant"),
            option("ranks", "Officer"),
            option("stations", "North"),
        ]);
        store.set("options_ranks", json!(["Officer", "Captain"])).await.unwrap();

        let ranks = service.get_options("ranks").await.unwrap();
        assert_eq!(ranks, ["Officer", "Captain", "Sergeant"]);
        assert_eq!(
            store.get("options_ranks").await.unwrap(),
            Some(json!(["Officer", "Captain", "Sergeant"]))
        );
    }

    #[tokio::test]
    async fn tombstone_survives_remote_refetch() {
        let (service, store) = service(vec![option("ranks", "Sergeant")]);

        assert!(service.remove_option("ranks", "Sergeant").await.unwrap());
        assert!(!service.remove_option("ranks", "Sergeant").await.unwrap());
        assert!(service.get_options("ranks").await.unwrap().is_empty());
        assert!(service.get_options("ranks").await.unwrap().is_empty());
        assert_eq!(
            store.get("deleted_options_ranks").await.unwrap(),
            Some(json!(["Sergeant"]))
        );

        assert!(service.restore_option("ranks", "Sergeant").await.unwrap());
        assert!(!service.restore_option("ranks", "Sergeant").await.unwrap());
        assert_eq!(service.get_options("ranks").await.unwrap(), ["Sergeant"]);
    }

    #[tokio::test]
    async fn add_rejects_visible_and_revives_tombstoned() {
        let (service, _) = service(Vec::new());

        assert!(service.add_option("departments", "Traffic").await.unwrap());
        assert!(!service.add_option("departments", "Traffic").await.unwrap());
        assert!(!service.add_option("departments", "  ").await.unwrap());

        service.remove_option("departments", "Traffic").await.unwrap();
        assert!(service.local_options("departments").await.unwrap().is_empty());
        assert!(service.add_option("departments", "Traffic").await.unwrap());
        assert_eq!(service.local_options("departments").await.unwrap(), ["Traffic"]);
        assert!(service.deleted_options("departments").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_is_ordered_union() {
        let (service, _) = service(Vec::new());
        service.add_option("stations", "North").await.unwrap();

        let added = service
            .merge_options("stations", &["South".into(), "North".into(), "East".into()])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(
            service.local_options("stations").await.unwrap(),
            ["North", "South", "East"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_edits_keep_every_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let service = HybridDataService::new(
            ServiceConfig::default(),
            store,
            Arc::new(OptionsBackend(Vec::new())),
        );

        let adds: Vec<_> = (0..40)
            .map(|n| {
                let service = service.clone();
                tokio::spawn(async move { service.add_option("ranks", &format!("Rank {n}")).await })
            })
            .collect();
        for add in adds {
            assert!(add.await.unwrap().unwrap());
        }
        assert_eq!(service.local_options("ranks").await.unwrap().len(), 40);

        let removes: Vec<_> = (0..20)
            .map(|n| {
                let service = service.clone();
                tokio::spawn(async move { service.remove_option("ranks", &format!("Rank {n}")).await })
            })
            .collect();
        for remove in removes {
            assert!(remove.await.unwrap().unwrap());
        }

        let mut deleted = service.deleted_options("ranks").await.unwrap();
        deleted.sort();
        let mut expected: Vec<String> = (0..20).map(|n| format!("Rank {n}")).collect();
        expected.sort();
        assert_eq!(deleted, expected);
        assert_eq!(service.local_options("ranks").await.unwrap().len(), 20);
    }
}
