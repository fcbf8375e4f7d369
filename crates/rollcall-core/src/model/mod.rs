// ── Domain model ──
//
// Records are schemaless JSON objects addressed by collection + id.

pub mod key;
pub mod record;

pub use key::{StorageKey, validate_collection};
pub use record::{Record, fields, timestamp_now};
