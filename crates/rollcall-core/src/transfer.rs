// ── Import / export ──
//
// Moves one collection between devices as a JSON document, for crews that
// share data over a messaging app rather than the backend. Imports are
// last-write-wins by `updatedAt` and never touch the backend.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{Record, fields, timestamp_now, validate_collection};
use crate::service::HybridDataService;

/// First line of a shared export. Everything before the first `{` of a
/// text containing it is ignored on import.
pub const EXPORT_BANNER: &str = "Rollcall data export";

/// Serialized form of one exported collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub collection_id: String,
    pub device_id: String,
    pub timestamp: String,
    pub data: Vec<Record>,
    #[serde(default)]
    pub options: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success: bool,
    /// Records written locally.
    pub imported: usize,
    /// Records present in the document.
    pub total: usize,
    /// Option values that were new to this device.
    pub imported_options: usize,
}

/// Export and import bridge over a [`HybridDataService`].
#[derive(Clone)]
pub struct DataTransfer {
    service: HybridDataService,
}

impl DataTransfer {
    pub fn new(service: HybridDataService) -> Self {
        Self { service }
    }

    pub async fn export_document(&self, collection: &str) -> Result<ExportDocument, CoreError> {
        validate_collection(collection)?;
        let data = self.service.get_items(collection).await;

        let mut options = IndexMap::new();
        for field in &self.service.config().option_fields {
            options.insert(field.clone(), self.service.local_options(field).await?);
        }

        Ok(ExportDocument {
            collection_id: collection.to_owned(),
            device_id: self.service.device_id().await,
            timestamp: timestamp_now(),
            data,
            options,
        })
    }

    /// Pretty-printed export document.
    pub async fn export_data(&self, collection: &str) -> Result<String, CoreError> {
        let document = self.export_document(collection).await?;
        debug!(collection, records = document.data.len(), "exported");
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// The export as a share sheet would send it: banner, blank line, JSON.
    pub async fn export_share_text(&self, collection: &str) -> Result<String, CoreError> {
        let json = self.export_data(collection).await?;
        Ok(format!("{EXPORT_BANNER}: {collection}\n\n{json}"))
    }

    pub async fn import_data(&self, text: &str) -> Result<ImportReport, CoreError> {
        let document: Value = serde_json::from_str(strip_banner(text).trim())?;
        let Value::Object(document) = document else {
            return Err(CoreError::invalid_import("document", "must be a JSON object"));
        };
        let collection = document
            .get("collectionId")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_import("collectionId", "is missing or not a string"))?;
        let source_device = document
            .get("deviceId")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_import("deviceId", "is missing or not a string"))?;
        let data = document
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::invalid_import("data", "is missing or not an array"))?;
        validate_collection(collection)?;

        let total = data.len();
        if source_device == self.service.device_id().await {
            info!(collection, "import from this device ignored");
            return Ok(ImportReport {
                success: true,
                imported: 0,
                total,
                imported_options: 0,
            });
        }

        let imported_at = timestamp_now();
        let mut imported = 0;
        for item in data {
            let Some(mut record) = Record::from_value(item.clone()) else {
                debug!(collection, "item is not an object, skipped");
                continue;
            };
            let Some(id) = record.id().map(str::to_owned) else {
                debug!(collection, id = ?record.get("id"), "item has no string id, skipped");
                continue;
            };
            if let Some(local) = self.service.get_local(collection, &id).await? {
                if !supersedes(&record, &local) {
                    debug!(collection, %id, "local copy is as new or newer, skipped");
                    continue;
                }
            }
            record.insert(fields::IMPORTED_FROM, source_device);
            record.insert(fields::IMPORTED_AT, imported_at.as_str());
            record.set_synced(false);
            self.service.write_local(collection, &record).await?;
            imported += 1;
        }

        let mut imported_options = 0;
        if let Some(Value::Object(options)) = document.get("options") {
            for (field, values) in options {
                let Some(values) = values.as_array() else {
                    continue;
                };
                let values: Vec<String> = values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect();
                imported_options += self.service.merge_options(field, &values).await?;
            }
        }

        self.service.cache().invalidate(collection).await;
        info!(
            collection,
            from = source_device,
            imported,
            total,
            imported_options,
            "import finished"
        );
        Ok(ImportReport {
            success: true,
            imported,
            total,
            imported_options,
        })
    }
}

fn strip_banner(text: &str) -> &str {
    if !text.contains(EXPORT_BANNER) {
        return text;
    }
    text.find('{').map_or(text, |start| &text[start..])
}

/// Last-write-wins: the incoming copy must be strictly newer. A missing
/// incoming timestamp always loses; a missing local one always loses.
fn supersedes(incoming: &Record, local: &Record) -> bool {
    match (incoming.updated_at(), local.updated_at()) {
        (Some(theirs), Some(ours)) => theirs > ours,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
