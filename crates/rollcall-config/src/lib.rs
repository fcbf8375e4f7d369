//! Shared configuration for rollcall tools.
//!
//! TOML profiles, API-key resolution (env var + keyring + plaintext), and
//! translation to `rollcall_api::GatewayConfig` plus
//! `rollcall_core::ServiceConfig`. The CLI adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollcall_api::{GatewayConfig, TlsMode, TransportConfig};
use rollcall_core::config::{DEFAULT_OPTION_FIELDS, DEFAULT_SYNC_COLLECTIONS};
use rollcall_core::model::validate_collection;
use rollcall_core::{CacheConfig, ServiceConfig};

/// Keyring service name under which API keys are stored.
pub const KEYRING_SERVICE: &str = "rollcall";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile selected by `name`, else the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    15
}

/// A named backend profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://hr.example.org/api"). Empty means
    /// offline-only: every probe fails and all data stays local.
    #[serde(default)]
    pub backend: String,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Device id prefix. Defaults to the host name.
    pub device_tag: Option<String>,

    /// Local store directory. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

/// Query cache timing, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    #[serde(default = "default_restore_max_age")]
    pub restore_max_age: u64,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            restore_max_age: default_restore_max_age(),
            wait_timeout: default_wait_timeout(),
            persist: true,
        }
    }
}

fn default_ttl() -> u64 {
    300
}
fn default_restore_max_age() -> u64 {
    3600
}
fn default_wait_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Collection read to test backend health.
    #[serde(default = "default_probe_collection")]
    pub probe_collection: String,

    /// Collections replayed by `rollcall sync`.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Option fields carried in exports.
    #[serde(default = "default_option_fields")]
    pub option_fields: Vec<String>,

    #[serde(default = "default_batch_chunk_size")]
    pub batch_chunk_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            probe_collection: default_probe_collection(),
            collections: default_collections(),
            option_fields: default_option_fields(),
            batch_chunk_size: default_batch_chunk_size(),
        }
    }
}

fn default_probe_collection() -> String {
    "employees".into()
}
fn default_collections() -> Vec<String> {
    DEFAULT_SYNC_COLLECTIONS.iter().map(|&s| s.into()).collect()
}
fn default_option_fields() -> Vec<String> {
    DEFAULT_OPTION_FIELDS.iter().map(|&s| s.into()).collect()
}
fn default_batch_chunk_size() -> usize {
    5
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "rollcall", "rollcall")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("rollcall");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding the local store for a profile.
pub fn data_dir(profile: &Profile, profile_name: &str) -> PathBuf {
    if let Some(ref dir) = profile.data_dir {
        return dir.clone();
    }
    project_dirs()
        .map_or_else(
            || home_fallback(".local/share"),
            |dirs| dirs.data_dir().to_path_buf(),
        )
        .join(profile_name)
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, then `ROLLCALL_`-prefixed environment
/// variables (`__` separates nesting, e.g. `ROLLCALL_DEFAULTS__OUTPUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ROLLCALL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
}

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring for a profile.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `GatewayConfig` from a profile. `None` for an offline-only
/// profile (no backend URL).
///
/// The API key is optional: a profile without credentials talks to the
/// backend unauthenticated.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<GatewayConfig>, ConfigError> {
    if profile.backend.trim().is_empty() {
        return Ok(None);
    }
    let base_url: url::Url = profile
        .backend
        .parse()
        .map_err(|_| invalid("backend", format!("invalid URL: {}", profile.backend)))?;

    let api_key = match resolve_api_key(profile, profile_name) {
        Ok(key) => Some(key),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    let tls = if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));

    Ok(Some(GatewayConfig {
        base_url,
        api_key,
        transport: TransportConfig { tls, timeout },
    }))
}

/// Build the data layer's `ServiceConfig` from a profile, validating
/// every collection name it mentions.
pub fn profile_to_service_config(profile: &Profile) -> Result<ServiceConfig, ConfigError> {
    let sync = &profile.sync;
    let check = |field: &str, name: &str| {
        validate_collection(name).map_err(|e| invalid(field, e.to_string()))
    };
    check("sync.probe_collection", &sync.probe_collection)?;
    for name in &sync.collections {
        check("sync.collections", name)?;
    }
    if sync.batch_chunk_size == 0 {
        return Err(invalid("sync.batch_chunk_size", "must be at least 1"));
    }
    if let Some(ref tag) = profile.device_tag {
        if tag.trim().is_empty() {
            return Err(invalid("device_tag", "must not be blank"));
        }
    }

    Ok(ServiceConfig {
        device_tag: profile.device_tag.clone(),
        probe_collection: sync.probe_collection.clone(),
        sync_collections: sync.collections.clone(),
        option_fields: sync.option_fields.clone(),
        batch_chunk_size: sync.batch_chunk_size,
        cache: CacheConfig {
            ttl: Duration::from_secs(profile.cache.ttl),
            restore_max_age: Duration::from_secs(profile.cache.restore_max_age),
            wait_timeout: Duration::from_secs(profile.cache.wait_timeout),
            persist: profile.cache.persist,
        },
    })
}
