// Hybrid data service behaviour against a scripted backend.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rollcall_core::{
    CacheConfig, FileStore, HybridDataService, KeyValueStore, OPTIONS_COLLECTION, Record,
    ServiceConfig, fields,
};
use serde_json::json;

use common::{PoisonedStore, StubGateway, config, record, service_with};

// ── Write durability ─────────────────────────────────────────────────

#[tokio::test]
async fn offline_save_is_durable_and_unsynced() {
    let gateway = StubGateway::offline();
    let (service, store) = service_with("patrol", &gateway);

    let saved = service
        .save_data(record(json!({"name": "Ana Ruiz", "rank": "Officer"})), "employees")
        .await
        .unwrap();

    let id = saved.id().unwrap().to_owned();
    assert!(!saved.synced());
    assert!(saved.device_id().unwrap().starts_with("patrol_"));
    assert!(saved.created_at().is_some());
    assert!(saved.updated_at().is_some());

    let stored = store.get(&format!("employees_{id}")).await.unwrap().unwrap();
    assert_eq!(stored["name"], "Ana Ruiz");
    assert_eq!(stored["synced"], false);

    let listed = service.get_items("employees").await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), Some(id.as_str()));
    assert_eq!(StubGateway::count(&gateway.saves), 0);
}

#[tokio::test]
async fn online_save_reaches_backend_and_marks_synced() {
    let gateway = StubGateway::online();
    let (service, store) = service_with("desk", &gateway);

    let saved = service
        .save_data(record(json!({"plate": "ABC-123"})), "vehicles")
        .await
        .unwrap();

    assert!(saved.synced());
    assert!(saved.get(fields::REMOTE_ID).is_none());
    let key = format!("vehicles_{}", saved.id().unwrap());
    assert_eq!(store.get(&key).await.unwrap().unwrap()["synced"], true);
    assert_eq!(gateway.remote_items("vehicles").len(), 1);
}

#[tokio::test]
async fn remote_write_failure_still_succeeds_locally() {
    let gateway = StubGateway::online();
    gateway.reject_writes(true);
    let (service, _) = service_with("desk", &gateway);

    let saved = service
        .save_data(record(json!({"hours": 4})), "overtime")
        .await
        .unwrap();

    assert!(!saved.synced());
    assert_eq!(StubGateway::count(&gateway.saves), 1);
    assert_eq!(service.local_items("overtime").await.len(), 1);
}

#[tokio::test]
async fn quota_refusal_behaves_like_offline() {
    let gateway = StubGateway::online();
    gateway.fail_with("Backend error (HTTP 402): payment required, upgrade to higher plans");
    let (service, _) = service_with("desk", &gateway);

    assert!(!service.is_backend_available().await);
    let saved = service.save_data(Record::new(), "leaves").await.unwrap();
    assert!(!saved.synced());
    assert_eq!(StubGateway::count(&gateway.saves), 0);
}

#[tokio::test]
async fn backend_assigned_id_is_kept_as_remote_id() {
    let gateway = StubGateway::online();
    gateway.assign_ids(true);
    let (service, _) = service_with("desk", &gateway);

    let saved = service
        .save_data(record(json!({"title": "Burglary"})), "cases")
        .await
        .unwrap();
    let id = saved.id().unwrap().to_owned();
    assert_ne!(id, "srv-0");
    assert_eq!(saved.get_str(fields::REMOTE_ID), Some("srv-0"));

    service
        .update_data("cases", &id, record(json!({"status": "closed"})))
        .await
        .unwrap();
    assert_eq!(
        gateway.last_update_id.lock().unwrap().as_deref(),
        Some("srv-0")
    );
}

#[tokio::test]
async fn reads_prefer_backend_and_fall_back_to_local() {
    let gateway = StubGateway::online();
    gateway.seed("employees", vec![json!({"id": "r1"}), json!({"id": "r2"})]);
    let (service, store) = service_with("desk", &gateway);
    store.set("employees_l1", json!({"id": "l1"})).await.unwrap();

    assert_eq!(service.get_items("employees").await.len(), 2);

    gateway.set_online(false);
    let local = service.get_items("employees").await;
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id(), Some("l1"));
}

// ── Update / delete ──────────────────────────────────────────────────

#[tokio::test]
async fn update_merges_and_refreshes_timestamp() {
    let gateway = StubGateway::offline();
    let (service, _) = service_with("desk", &gateway);
    let saved = service
        .save_data(
            record(json!({"name": "Luis", "rank": "Officer", "updatedAt": "2020-01-01T00:00:00.000Z"})),
            "employees",
        )
        .await
        .unwrap();
    let id = saved.id().unwrap();

    let updated = service
        .update_by_key(
            &format!("employees_{id}"),
            id,
            record(json!({"rank": "Sergeant"})),
            "employees",
        )
        .await
        .unwrap();

    assert_eq!(updated.get_str("name"), Some("Luis"));
    assert_eq!(updated.get_str("rank"), Some("Sergeant"));
    assert!(updated.updated_at() >= saved.updated_at());
}

#[tokio::test]
async fn delete_goes_remote_then_local() {
    let gateway = StubGateway::online();
    let (service, store) = service_with("desk", &gateway);
    let saved = service.save_data(Record::new(), "payroll").await.unwrap();
    let id = saved.id().unwrap();

    let outcome = service.delete_data("payroll", id).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.id, id);
    assert!(gateway.remote_items("payroll").is_empty());
    assert!(store.get(&format!("payroll_{id}")).await.unwrap().is_none());
}

#[tokio::test]
async fn offline_delete_still_removes_local_copy() {
    let gateway = StubGateway::offline();
    let (service, _) = service_with("desk", &gateway);
    let saved = service.save_data(Record::new(), "payroll").await.unwrap();

    service.delete_data("payroll", saved.id().unwrap()).await.unwrap();
    assert!(service.local_items("payroll").await.is_empty());
    assert_eq!(StubGateway::count(&gateway.deletes), 0);
}

#[tokio::test]
async fn concurrent_updates_to_one_key_all_land() {
    let gateway = StubGateway::offline();
    let (service, _) = service_with("desk", &gateway);
    let saved = service.save_data(Record::new(), "cases").await.unwrap();
    let id = saved.id().unwrap().to_owned();

    let updates = (0..10).map(|n| {
        let service = service.clone();
        let id = id.clone();
        async move {
            service
                .update_data("cases", &id, Record::new().with(format!("note{n}"), n))
                .await
        }
    });
    for result in futures_util::future::join_all(updates).await {
        result.unwrap();
    }

    let stored = service.get_local("cases", &id).await.unwrap().unwrap();
    for n in 0..10 {
        assert_eq!(stored.get(&format!("note{n}")), Some(&json!(n)));
    }
}

// ── Batch ────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_saves_in_chunks_and_skips_failed_chunk() {
    let gateway = StubGateway::offline();
    let store = Arc::new(PoisonedStore::new("poison"));
    let service = HybridDataService::new(config("desk"), store, gateway);

    let items: Vec<Record> = (0..12)
        .map(|n| {
            let id = if n == 6 { "poison".to_owned() } else { format!("e{n}") };
            record(json!({"id": id}))
        })
        .collect();

    let saved = service.batch_save_data(items, "employees").await;

    // Chunk 0 (e0..e4) and chunk 2 (e10, e11) survive; chunk 1 is dropped.
    let ids: Vec<_> = saved.iter().filter_map(|r| r.id()).collect();
    assert_eq!(ids, ["e0", "e1", "e2", "e3", "e4", "e10", "e11"]);
}

// ── Query cache ──────────────────────────────────────────────────────

#[tokio::test]
async fn cached_reads_fetch_once_and_refetch_after_write() {
    let gateway = StubGateway::online();
    gateway.seed("cases", vec![json!({"id": "c1"})]);
    let (service, _) = service_with("desk", &gateway);

    service.cached_items("cases").await.unwrap();
    service.cached_items("cases").await.unwrap();
    assert_eq!(StubGateway::count(&gateway.reads), 1);

    service.save_data(Record::new(), "cases").await.unwrap();
    assert!(!service.cache().is_cache_valid("cases"));

    let items = service.cached_items("cases").await.unwrap();
    assert_eq!(StubGateway::count(&gateway.reads), 2);
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn cached_reads_expire_after_ttl() {
    let gateway = StubGateway::online();
    let config = ServiceConfig {
        cache: CacheConfig {
            ttl: Duration::from_millis(50),
            ..CacheConfig::default()
        },
        ..config("desk")
    };
    let service = HybridDataService::new(
        config,
        Arc::new(rollcall_core::MemoryStore::new()),
        gateway.clone(),
    );

    service.cached_items("cases").await.unwrap();
    service.cached_items("cases").await.unwrap();
    assert_eq!(StubGateway::count(&gateway.reads), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    service.cached_items("cases").await.unwrap();
    assert_eq!(StubGateway::count(&gateway.reads), 2);
}

#[tokio::test]
async fn concurrent_cached_reads_share_one_fetch() {
    let gateway = StubGateway::online();
    gateway.set_latency(Duration::from_millis(40));
    let (service, _) = service_with("desk", &gateway);

    let (a, b, c) = tokio::join!(
        service.cached_items("leaves"),
        service.cached_items("leaves"),
        service.cached_items("leaves"),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();
    assert_eq!(StubGateway::count(&gateway.reads), 1);
}

// ── Options ──────────────────────────────────────────────────────────

#[tokio::test]
async fn tombstoned_option_stays_hidden_after_refetch() {
    let gateway = StubGateway::online();
    gateway.seed(
        OPTIONS_COLLECTION,
        vec![
            json!({"fieldName": "departments", "value": "Traffic"}),
            json!({"fieldName": "departments", "value": "Homicide"}),
        ],
    );
    let (service, _) = service_with("desk", &gateway);

    assert_eq!(
        service.get_options("departments").await.unwrap(),
        ["Traffic", "Homicide"]
    );
    service.remove_option("departments", "Traffic").await.unwrap();
    assert_eq!(service.get_options("departments").await.unwrap(), ["Homicide"]);
    assert_eq!(gateway.remote_items(OPTIONS_COLLECTION).len(), 2);

    assert!(service.add_option("departments", "K9").await.unwrap());
    assert_eq!(gateway.remote_items(OPTIONS_COLLECTION).len(), 3);
}

// ── Sync ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_sync_refuses_when_offline() {
    let gateway = StubGateway::offline();
    let (service, _) = service_with("desk", &gateway);
    service.save_data(Record::new(), "cases").await.unwrap();

    let report = service.manual_sync().await.unwrap();
    assert!(!report.success);
    assert_eq!(report.synced, 0);
    assert_eq!(StubGateway::count(&gateway.updates), 0);
    assert!(!service.local_items("cases").await[0].synced());
}

#[tokio::test]
async fn manual_sync_counts_rejected_records() {
    let gateway = StubGateway::offline();
    let (service, _) = service_with("desk", &gateway);
    service.save_data(Record::new(), "expenses").await.unwrap();
    service.save_data(Record::new(), "expenses").await.unwrap();

    gateway.set_online(true);
    gateway.reject_writes(true);
    let report = service.manual_sync().await.unwrap();

    assert!(report.success);
    assert_eq!((report.synced, report.total), (0, 2));
}

#[tokio::test]
async fn theft_case_recorded_offline_then_synced() {
    let gateway = StubGateway::offline();
    let (service, _) = service_with("patrol", &gateway);

    // A patrol officer records a theft with no coverage.
    let case = service
        .save_data(
            record(json!({
                "type": "theft",
                "description": "Bicycle stolen outside station North",
                "officer": "Ana Ruiz",
            })),
            "cases",
        )
        .await
        .unwrap();
    assert!(!case.synced());
    assert!(gateway.remote_items("cases").is_empty());

    // Back at the station, coverage returns and the officer syncs.
    gateway.set_online(true);
    let report = service.manual_sync().await.unwrap();
    assert!(report.success);
    assert_eq!((report.synced, report.total), (1, 1));

    let local = service.get_local("cases", case.id().unwrap()).await.unwrap().unwrap();
    assert!(local.synced());
    let remote = gateway.remote_items("cases");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0]["id"], json!(case.id().unwrap()));
    assert_eq!(remote[0]["type"], "theft");

    // Nothing left to replay.
    let again = service.manual_sync().await.unwrap();
    assert_eq!((again.synced, again.total), (0, 0));
}

// ── Identity ─────────────────────────────────────────────────────────

#[tokio::test]
async fn device_id_and_records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::offline();

    let first = HybridDataService::new(
        config("tablet"),
        Arc::new(FileStore::open(dir.path()).await.unwrap()),
        gateway.clone(),
    );
    first.initialize().await.unwrap();
    let device_id = first.device_id().await;
    first.save_data(Record::new(), "vehicles").await.unwrap();
    drop(first);

    let restarted = HybridDataService::new(
        config("tablet"),
        Arc::new(FileStore::open(dir.path()).await.unwrap()),
        gateway,
    );
    restarted.initialize().await.unwrap();
    assert_eq!(restarted.device_id().await, device_id);
    let vehicles = restarted.local_items("vehicles").await;
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].device_id(), Some(device_id.as_str()));
}
