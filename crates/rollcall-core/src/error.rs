// ── Core error types ──
//
// User-facing errors from rollcall-core. Remote failures on the read and
// write paths are swallowed before they get here; what remains is local
// storage failure, contract violations, malformed imports, and cache
// wait timeouts.

use std::sync::Arc;

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local storage ────────────────────────────────────────────────
    #[error("Local storage failure: {0}")]
    Store(#[from] StoreError),

    // ── Contract violations ──────────────────────────────────────────
    #[error("Invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid import payload: {field} {reason}")]
    InvalidImport { field: String, reason: String },

    // ── Cache ────────────────────────────────────────────────────────
    #[error("Timed out after {timeout_ms}ms waiting for '{collection}' to load")]
    CacheTimeout { collection: String, timeout_ms: u64 },

    // ── Remote (only surfaced by explicit remote-only calls) ─────────
    #[error("Remote backend error: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Serialization ────────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An error produced once and handed to several single-flight waiters.
    #[error(transparent)]
    Shared(Arc<CoreError>),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid_import(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidImport {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Recover an owned error from a shared one when this is the last handle.
    pub(crate) fn from_shared(err: Arc<CoreError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(Self::Shared)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rollcall_api::Error> for CoreError {
    fn from(err: rollcall_api::Error) -> Self {
        CoreError::Remote {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}
