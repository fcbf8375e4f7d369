//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use rollcall_config::ConfigError;
use rollcall_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const STORAGE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Backend ──────────────────────────────────────────────────────
    #[error("Backend is unreachable for profile '{profile}'")]
    #[diagnostic(
        code(rollcall::backend_unavailable),
        help(
            "Records saved while offline stay on this device.\n\
             Check the backend URL and network, then run: rollcall sync"
        )
    )]
    BackendUnavailable { profile: String },

    #[error("Backend error: {message}")]
    #[diagnostic(code(rollcall::backend))]
    Backend {
        message: String,
        status: Option<u16>,
    },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(rollcall::no_credentials),
        help(
            "Store a key with: rollcall config set-key\n\
             Or set the ROLLCALL_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Records ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(rollcall::not_found),
        help("Run: rollcall {list_command} to see what is stored")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Invalid import file: {field} {reason}")]
    #[diagnostic(
        code(rollcall::invalid_import),
        help("Import accepts documents produced by: rollcall export <collection>")
    )]
    InvalidImport { field: String, reason: String },

    #[error("Invalid data: {message}")]
    #[diagnostic(
        code(rollcall::data),
        help("Records are JSON objects, e.g. --data '{{\"name\": \"Ana Ruiz\"}}'")
    )]
    Data { message: String },

    // ── Local storage ────────────────────────────────────────────────
    #[error("Local storage failed: {message}")]
    #[diagnostic(
        code(rollcall::storage),
        help("Check that the data directory is writable, or point --data-dir elsewhere.")
    )]
    Storage { message: String },

    #[error("Timed out after {timeout_ms}ms waiting for '{collection}'")]
    #[diagnostic(
        code(rollcall::timeout),
        help("Another load of this collection is still running. Retry, or raise cache.wait_timeout.")
    )]
    Timeout { collection: String, timeout_ms: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rollcall::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(rollcall::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: rollcall config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(rollcall::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {reason}")]
    #[diagnostic(
        code(rollcall::keyring),
        help("Use api_key_env or --api-key when no system keyring is available.")
    )]
    Keyring { reason: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(rollcall::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(rollcall::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Backend {
                status: Some(401 | 403),
                ..
            }
            | Self::NoCredentials { .. }
            | Self::Keyring { .. } => exit_code::AUTH,
            Self::BackendUnavailable { .. } | Self::Backend { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Storage { .. } => exit_code::STORAGE,
            Self::Validation { .. }
            | Self::InvalidImport { .. }
            | Self::Data { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::ProfileNotFound { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}

impl From<&CoreError> for CliError {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::Store(e) => CliError::Storage {
                message: e.to_string(),
            },
            CoreError::InvalidKey { key, reason } => CliError::Validation {
                field: format!("key '{key}'"),
                reason: reason.clone(),
            },
            CoreError::InvalidImport { field, reason } => CliError::InvalidImport {
                field: field.clone(),
                reason: reason.clone(),
            },
            CoreError::CacheTimeout {
                collection,
                timeout_ms,
            } => CliError::Timeout {
                collection: collection.clone(),
                timeout_ms: *timeout_ms,
            },
            CoreError::Remote { message, status } => CliError::Backend {
                message: message.clone(),
                status: *status,
            },
            CoreError::Serialization(e) => CliError::Data {
                message: e.to_string(),
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message.clone(),
            },
            CoreError::Shared(inner) => CliError::from(inner.as_ref()),
            CoreError::Internal(message) => CliError::Internal(message.clone()),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
