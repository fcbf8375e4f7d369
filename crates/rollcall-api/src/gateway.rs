// ── Remote backend contract ──
//
// The offline-first core never talks HTTP directly. It holds an
// `Arc<dyn RemoteGateway>` and only cares whether a call succeeded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A record as the backend sees it: one JSON object.
pub type RemoteRecord = serde_json::Map<String, serde_json::Value>;

/// Acknowledgement of a remote delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub success: bool,
}

/// The capability set expected of the cloud backend.
///
/// Every method fails with an [`Error`] on any problem; authentication,
/// retry and pagination are the implementor's responsibility.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Fetch every item of a collection.
    async fn get_items(&self, collection: &str) -> Result<Vec<RemoteRecord>, Error>;

    /// Fetch at most `limit` items. Used as the cheap availability probe.
    ///
    /// The default implementation fetches everything and truncates;
    /// backends with server-side limits should override it.
    async fn get_items_limited(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>, Error> {
        let mut items = self.get_items(collection).await?;
        items.truncate(limit);
        Ok(items)
    }

    /// Create an item. The backend may assign its own id in the response.
    async fn save_data(&self, item: &RemoteRecord, collection: &str)
    -> Result<RemoteRecord, Error>;

    /// Replace (upsert) the item addressed by `id`. `key` is the caller's
    /// local storage key, forwarded for backends that index by it.
    async fn update_data(
        &self,
        key: &str,
        id: &str,
        item: &RemoteRecord,
        collection: &str,
    ) -> Result<RemoteRecord, Error>;

    /// Delete the item addressed by `id`.
    async fn delete_data(&self, key: &str, id: &str, collection: &str) -> Result<DeleteAck, Error>;
}

/// Gateway for profiles with no backend configured. Every call fails, so
/// the data layer keeps everything local.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

impl OfflineGateway {
    fn refuse<T>() -> Result<T, Error> {
        Err(Error::Unavailable("no backend configured".into()))
    }
}

#[async_trait]
impl RemoteGateway for OfflineGateway {
    async fn get_items(&self, _collection: &str) -> Result<Vec<RemoteRecord>, Error> {
        Self::refuse()
    }

    async fn save_data(
        &self,
        _item: &RemoteRecord,
        _collection: &str,
    ) -> Result<RemoteRecord, Error> {
        Self::refuse()
    }

    async fn update_data(
        &self,
        _key: &str,
        _id: &str,
        _item: &RemoteRecord,
        _collection: &str,
    ) -> Result<RemoteRecord, Error> {
        Self::refuse()
    }

    async fn delete_data(
        &self,
        _key: &str,
        _id: &str,
        _collection: &str,
    ) -> Result<DeleteAck, Error> {
        Self::refuse()
    }
}
