// HTTP binding of the remote gateway contract.
//
// Wraps `reqwest::Client` with collection-scoped URL construction and
// envelope unwrapping. Every response is `{ "data": ... }` on success or
// `{ "error": "..." }` alongside a non-2xx status.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::gateway::{DeleteAck, RemoteGateway, RemoteRecord};
use crate::transport::GatewayConfig;

/// Header forwarding the caller's local storage key on updates.
pub const STORAGE_KEY_HEADER: &str = "x-storage-key";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<String>,
}

/// REST client for the backend.
///
/// All methods return the unwrapped `data` payload; the envelope is
/// stripped before the caller sees it.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpGateway {
    /// Create a gateway from a [`GatewayConfig`], building a fresh client.
    pub fn new(config: &GatewayConfig) -> Result<Self, Error> {
        let headers = config.default_headers()?;
        let http = config.transport.build_client(headers)?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Create a gateway around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/collections/{collection}/items[/{id}]`, with each segment
    /// percent-encoded.
    pub(crate) fn items_url(&self, collection: &str, id: Option<&str>) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments
                .pop_if_empty()
                .extend(["collections", collection, "items"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    // ── Response handling ────────────────────────────────────────────

    /// Unwrap the `{ data, error }` envelope.
    async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if body.trim().is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_owned()
                    } else {
                        body.clone()
                    }
                });
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        envelope.data.ok_or(Error::EmptyEnvelope)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn get_items(&self, collection: &str) -> Result<Vec<RemoteRecord>, Error> {
        let url = self.items_url(collection, None)?;
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::parse_envelope(resp).await
    }

    async fn get_items_limited(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>, Error> {
        let mut url = self.items_url(collection, None)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let mut items: Vec<RemoteRecord> = Self::parse_envelope(resp).await?;
        items.truncate(limit);
        Ok(items)
    }

    async fn save_data(
        &self,
        item: &RemoteRecord,
        collection: &str,
    ) -> Result<RemoteRecord, Error> {
        let url = self.items_url(collection, None)?;
        debug!("POST {}", url);
        let resp = self.http.post(url).json(item).send().await?;
        Self::parse_envelope(resp).await
    }

    async fn update_data(
        &self,
        key: &str,
        id: &str,
        item: &RemoteRecord,
        collection: &str,
    ) -> Result<RemoteRecord, Error> {
        let url = self.items_url(collection, Some(id))?;
        debug!("PUT {}", url);
        let resp = self
            .http
            .put(url)
            .header(STORAGE_KEY_HEADER, key)
            .json(item)
            .send()
            .await?;
        Self::parse_envelope(resp).await
    }

    async fn delete_data(&self, key: &str, id: &str, collection: &str) -> Result<DeleteAck, Error> {
        let url = self.items_url(collection, Some(id))?;
        debug!("DELETE {}", url);
        let resp = self
            .http
            .delete(url)
            .header(STORAGE_KEY_HEADER, key)
            .send()
            .await?;
        Self::parse_envelope(resp).await
    }
}
