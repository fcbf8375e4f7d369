// ── Manual resync ──

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::HybridDataService;
use crate::error::CoreError;

/// Outcome of [`HybridDataService::manual_sync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    /// Records the backend accepted during this run.
    pub synced: usize,
    /// Records that were pending when the run started.
    pub total: usize,
}

impl HybridDataService {
    /// Replay every unsynced local record of the configured collections
    /// through the update path.
    ///
    /// Returns `success = false` without touching anything when the backend
    /// is unreachable. Individual record failures are logged and counted as
    /// not synced.
    pub async fn manual_sync(&self) -> Result<SyncReport, CoreError> {
        if !self.is_backend_available().await {
            warn!("manual sync skipped: backend unavailable");
            return Ok(SyncReport {
                success: false,
                message: "Backend unavailable; nothing was synced".into(),
                synced: 0,
                total: 0,
            });
        }

        let mut synced = 0;
        let mut total = 0;
        for collection in &self.inner.config.sync_collections {
            let pending: Vec<_> = self
                .scan_local(collection)
                .await?
                .into_iter()
                .filter(|record| !record.synced())
                .collect();
            total += pending.len();

            for record in pending {
                let Some(id) = record.id().map(str::to_owned) else {
                    continue;
                };
                match self.update_data(collection, &id, record).await {
                    Ok(updated) if updated.synced() => synced += 1,
                    Ok(_) => warn!(%collection, %id, "record still unsynced after replay"),
                    Err(e) => warn!(%collection, %id, error = %e, "replay failed"),
                }
            }
        }

        info!(synced, total, "manual sync finished");
        Ok(SyncReport {
            success: true,
            message: format!("Synced {synced} of {total} pending records"),
            synced,
            total,
        })
    }
}
