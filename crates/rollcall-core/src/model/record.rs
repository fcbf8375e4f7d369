// ── Record ──
//
// One domain entity (officer, case, overtime entry, ...) as a JSON object.
// The data layer only interprets the bookkeeping fields below; everything
// else is carried through untouched.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rollcall_api::RemoteRecord;

/// Field names the data layer reads and writes.
pub mod fields {
    pub const ID: &str = "id";
    pub const DEVICE_ID: &str = "deviceId";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const SYNCED: &str = "synced";
    pub const REMOTE_ID: &str = "remoteId";
    pub const IMPORTED_FROM: &str = "importedFrom";
    pub const IMPORTED_AT: &str = "importedAt";
}

/// Current time as an RFC 3339 string with millisecond precision.
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp: RFC 3339 text or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// A JSON object with typed access to the bookkeeping fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret an arbitrary JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    // ── Generic field access ─────────────────────────────────────────

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    /// Overlay every field of `other` onto this record.
    pub fn merge(&mut self, other: Record) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    /// Chainable insert, handy for building records in code and tests.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    // ── Bookkeeping fields ───────────────────────────────────────────

    /// The record id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.get_str(fields::ID).filter(|s| !s.is_empty())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.get_str(fields::DEVICE_ID).filter(|s| !s.is_empty())
    }

    /// Whether the backend holds a matching copy. Missing means `false`.
    pub fn synced(&self) -> bool {
        self.get(fields::SYNCED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_synced(&mut self, synced: bool) {
        self.insert(fields::SYNCED, synced);
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get(fields::CREATED_AT).and_then(parse_timestamp)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.get(fields::UPDATED_AT).and_then(parse_timestamp)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for RemoteRecord {
    fn from(record: Record) -> Self {
        record.0
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}
