//! Offline-first data layer between `rollcall-api` and UI consumers.
//!
//! This crate owns the local persistence, sync policy and caching for the
//! rollcall workspace:
//!
//! - **[`HybridDataService`]**: central facade. Every write lands in the
//!   [`KeyValueStore`] first and is then offered to the remote backend when
//!   the [`AvailabilityProber`] says it is reachable. Reads prefer the
//!   backend and fall back to local data. Unsynced records are replayed by
//!   [`manual_sync`](HybridDataService::manual_sync).
//!
//! - **[`QueryCache`]**: per-collection snapshots with a TTL, single-flight
//!   fetches (one shared future per collection), change listeners, and
//!   write-through persistence so a cold start has data to show.
//!
//! - **[`DeviceIdentity`]**: a stable per-install id stamped on every record
//!   created here.
//!
//! - **[`DataTransfer`]**: JSON export of one collection and last-write-wins
//!   import of another device's export.
//!
//! - **Domain model** ([`model`]): schemaless [`Record`]s addressed by
//!   [`StorageKey`] (`"<collection>_<id>"`).

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod probe;
pub mod service;
pub mod store;
pub mod transfer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheEvent, ListenerHandle, QueryCache};
pub use config::{CacheConfig, ServiceConfig};
pub use error::CoreError;
pub use identity::DeviceIdentity;
pub use model::{Record, StorageKey, fields};
pub use probe::{AvailabilityProber, ProbeFailure};
pub use service::{DeleteOutcome, HybridDataService, OPTIONS_COLLECTION, SyncReport};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use transfer::{DataTransfer, EXPORT_BANNER, ExportDocument, ImportReport};
