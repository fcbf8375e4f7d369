// ── Device identity ──
//
// A stable per-install id, `"<tag>_<7 random chars>"`, generated on first
// use and persisted under `deviceId`. Records created here carry it so
// imports can tell their own exports apart from another device's.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::key::{DEVICE_ID_KEY, SEPARATOR};
use crate::store::KeyValueStore;

const SUFFIX_LEN: usize = 7;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const FALLBACK_TAG: &str = "mobile";

/// Derives and persists the install's device id.
pub struct DeviceIdentity {
    store: Arc<dyn KeyValueStore>,
    tag: Option<String>,
    /// Memo of the persisted id. Held across the load-or-create sequence so
    /// concurrent first calls agree on one id.
    current: Mutex<Option<String>>,
}

impl DeviceIdentity {
    pub fn new(store: Arc<dyn KeyValueStore>, tag: Option<String>) -> Self {
        Self {
            store,
            tag,
            current: Mutex::new(None),
        }
    }

    /// Best-effort environment tag: configured tag, then the host name from
    /// the environment, then a fixed fallback. Never contains `_`.
    pub fn hostname(&self) -> String {
        let raw = self
            .tag
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok())
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_TAG.into());
        raw.trim().replace(SEPARATOR, "-")
    }

    /// The persisted device id, created on first call.
    ///
    /// If the store fails, a timestamp-derived id is returned instead. It is
    /// neither persisted nor remembered, so a later successful call wins.
    pub async fn device_id(&self) -> String {
        let mut current = self.current.lock().await;
        if let Some(ref id) = *current {
            return id.clone();
        }

        match self.load_or_create().await {
            Ok(id) => {
                *current = Some(id.clone());
                id
            }
            Err(e) => {
                let fallback = format!("fallback{SEPARATOR}{}", Utc::now().timestamp_millis());
                warn!(error = %e, %fallback, "device id storage failed, using ephemeral id");
                fallback
            }
        }
    }

    /// Id used to attribute admin actions. Currently identical to
    /// [`device_id`](Self::device_id).
    pub async fn admin_device_id(&self) -> String {
        self.device_id().await
    }

    /// The random suffix of the device id, used inside device-scoped
    /// employee records.
    pub async fn device_employee_id(&self) -> String {
        let id = self.device_id().await;
        match id.split_once(SEPARATOR) {
            Some((_, suffix)) if !suffix.is_empty() => suffix.to_owned(),
            _ => id,
        }
    }

    /// Forget the persisted id; the next call generates a new one.
    pub async fn clear_device_id(&self) -> Result<(), CoreError> {
        let mut current = self.current.lock().await;
        self.store.remove(DEVICE_ID_KEY).await?;
        *current = None;
        debug!("device id cleared");
        Ok(())
    }

    async fn load_or_create(&self) -> Result<String, CoreError> {
        if let Some(Value::String(id)) = self.store.get(DEVICE_ID_KEY).await? {
            if !id.is_empty() {
                return Ok(id);
            }
        }

        let id = format!("{}{SEPARATOR}{}", self.hostname(), random_suffix());
        self.store
            .set(DEVICE_ID_KEY, Value::String(id.clone()))
            .await?;
        debug!(device_id = %id, "generated device id");
        Ok(id)
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())]))
        .collect()
}
