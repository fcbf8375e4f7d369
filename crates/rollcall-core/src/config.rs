// ── Runtime service configuration ──
//
// Describes *how* the data layer behaves: cache timing, which collections
// manual sync walks, which option fields travel with exports. Built by the
// config crate or by tests; core never reads config files.

use std::time::Duration;

/// Collections walked by `manual_sync` when nothing else is configured.
pub const DEFAULT_SYNC_COLLECTIONS: [&str; 7] = [
    "employees",
    "cases",
    "expenses",
    "overtime",
    "leaves",
    "payroll",
    "vehicles",
];

/// Option fields exported alongside collection data by default.
pub const DEFAULT_OPTION_FIELDS: [&str; 6] = [
    "departments",
    "ranks",
    "positions",
    "stations",
    "leaveTypes",
    "vehicleTypes",
];

/// Query result cache timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a fetched snapshot is served without refetching.
    pub ttl: Duration,
    /// Persisted snapshots older than this are ignored at startup.
    pub restore_max_age: Duration,
    /// How long a caller waits on another caller's in-flight fetch.
    pub wait_timeout: Duration,
    /// Whether snapshots are written through to the local store.
    pub persist: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            restore_max_age: Duration::from_secs(60 * 60),
            wait_timeout: Duration::from_secs(10),
            persist: true,
        }
    }
}

/// Configuration for one [`HybridDataService`](crate::HybridDataService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Environment tag used as the device id prefix. `None` = derive from host.
    pub device_tag: Option<String>,
    /// Collection read (at most one item) to probe backend health.
    pub probe_collection: String,
    /// Collections replayed by `manual_sync`.
    pub sync_collections: Vec<String>,
    /// Option fields included in exports.
    pub option_fields: Vec<String>,
    /// Items per concurrently-saved chunk in `batch_save_data`.
    pub batch_chunk_size: usize,
    pub cache: CacheConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            device_tag: None,
            probe_collection: "employees".into(),
            sync_collections: DEFAULT_SYNC_COLLECTIONS.iter().map(|&s| s.into()).collect(),
            option_fields: DEFAULT_OPTION_FIELDS.iter().map(|&s| s.into()).collect(),
            batch_chunk_size: 5,
            cache: CacheConfig::default(),
        }
    }
}
