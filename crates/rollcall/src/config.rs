//! CLI configuration: a thin layer over `rollcall_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--backend,
//! --api-key, --data-dir, --offline, ...) and builds the data service the
//! record commands run against.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use rollcall_api::{GatewayConfig, HttpGateway, OfflineGateway, RemoteGateway, TlsMode};
use rollcall_core::{CoreError, FileStore, HybridDataService, ServiceConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use rollcall_config::{Config, Profile};

/// Config file in effect: `--config`, else the platform path.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(rollcall_config::config_path)
}

/// Load the config file (missing file = defaults) plus `ROLLCALL_` env.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(rollcall_config::load_config_from(&config_file(global))?)
}

pub fn save(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    Ok(rollcall_config::save_config_to(cfg, &config_file(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Everything needed to open the data layer for one invocation.
pub struct Resolved {
    pub profile_name: String,
    pub data_dir: PathBuf,
    pub service: ServiceConfig,
    /// `None` when running offline-only.
    pub gateway: Option<GatewayConfig>,
}

/// Merge the selected profile with flag overrides.
///
/// An explicitly named profile must exist. Without one, an unconfigured
/// install runs on an offline-only default profile.
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);
    let fallback = Profile::default();
    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(cfg),
                name: profile_name,
            });
        }
        None => &fallback,
    };

    let mut service = rollcall_config::profile_to_service_config(profile)?;
    if let Some(ref tag) = global.device_tag {
        service.device_tag = Some(tag.clone());
    }

    let data_dir = global
        .data_dir
        .clone()
        .unwrap_or_else(|| rollcall_config::data_dir(profile, &profile_name));

    let gateway = if global.offline {
        None
    } else {
        resolve_gateway(profile, &profile_name, global, cfg.defaults.timeout)?
    };

    Ok(Resolved {
        profile_name,
        data_dir,
        service,
        gateway,
    })
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

fn resolve_gateway(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    default_timeout: u64,
) -> Result<Option<GatewayConfig>, CliError> {
    let mut gateway = match global.backend.as_deref() {
        // Flag beats profile; the rest of the profile still applies.
        Some(url) => {
            let base_url = url.parse().map_err(|_| CliError::Validation {
                field: "backend".into(),
                reason: format!("invalid URL: {url}"),
            })?;
            let mut gateway = GatewayConfig::new(base_url);
            gateway.api_key = rollcall_config::resolve_api_key(profile, profile_name).ok();
            gateway
        }
        None => match rollcall_config::profile_to_gateway_config(profile, profile_name)? {
            Some(gateway) => gateway,
            None => return Ok(None),
        },
    };

    if let Some(ref key) = global.api_key {
        gateway.api_key = Some(SecretString::from(key.clone()));
    }
    if global.insecure {
        gateway.transport.tls = TlsMode::DangerAcceptInvalid;
    }
    let timeout = global.timeout.or(profile.timeout).unwrap_or(default_timeout);
    gateway.transport.timeout = Duration::from_secs(timeout);

    Ok(Some(gateway))
}

/// Open the local store and gateway for the active profile and hydrate the
/// query cache.
pub async fn open_service(global: &GlobalOpts) -> Result<(HybridDataService, Resolved), CliError> {
    let cfg = load(global)?;
    let resolved = resolve(global, &cfg)?;

    let store = FileStore::open(resolved.data_dir.clone())
        .await
        .map_err(CoreError::from)?;
    let gateway: Arc<dyn RemoteGateway> = match resolved.gateway {
        Some(ref gateway) => Arc::new(HttpGateway::new(gateway).map_err(CoreError::from)?),
        None => Arc::new(OfflineGateway),
    };

    let service = HybridDataService::new(resolved.service.clone(), Arc::new(store), gateway);
    let restored = service.initialize().await?;
    debug!(
        profile = %resolved.profile_name,
        data_dir = %resolved.data_dir.display(),
        online = resolved.gateway.is_some(),
        restored,
        "data service ready"
    );
    Ok((service, resolved))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["rollcall"];
        argv.extend_from_slice(args);
        argv.push("sync");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), profile);
        cfg
    }

    #[test]
    fn unconfigured_install_runs_offline() {
        let resolved = resolve(&global(&[]), &Config::default()).unwrap();
        assert_eq!(resolved.profile_name, "default");
        assert!(resolved.gateway.is_none());
    }

    #[test]
    fn named_profile_must_exist() {
        let cfg = config_with("station", Profile::default());
        match resolve(&global(&["--profile", "ghost"]), &cfg) {
            Err(CliError::ProfileNotFound { name, available }) => {
                assert_eq!(name, "ghost");
                assert_eq!(available, "station");
            }
            _ => panic!("expected ProfileNotFound"),
        }
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with(
            "default",
            Profile {
                backend: "https://hr.example.org/api".into(),
                device_tag: Some("front-desk".into()),
                timeout: Some(5),
                ..Profile::default()
            },
        );
        let resolved = resolve(
            &global(&[
                "--backend",
                "https://backup.example.org",
                "--api-key",
                "k-flag",
                "--device-tag",
                "patrol",
                "--data-dir",
                "/tmp/rollcall-flag",
                "-k",
            ]),
            &cfg,
        )
        .unwrap();

        let gateway = resolved.gateway.unwrap();
        assert_eq!(gateway.base_url.as_str(), "https://backup.example.org/");
        assert!(gateway.api_key.is_some());
        assert_eq!(gateway.transport.tls, TlsMode::DangerAcceptInvalid);
        assert_eq!(gateway.transport.timeout, Duration::from_secs(5));
        assert_eq!(resolved.service.device_tag.as_deref(), Some("patrol"));
        assert_eq!(resolved.data_dir, PathBuf::from("/tmp/rollcall-flag"));
    }

    #[test]
    fn offline_flag_drops_gateway() {
        let cfg = config_with(
            "default",
            Profile {
                backend: "https://hr.example.org/api".into(),
                ..Profile::default()
            },
        );
        assert!(resolve(&global(&["--offline"]), &cfg).unwrap().gateway.is_none());
    }

    #[test]
    fn bad_backend_flag_is_rejected() {
        let result = resolve(&global(&["--backend", "not a url"]), &Config::default());
        assert!(matches!(result, Err(CliError::Validation { ref field, .. }) if field == "backend"));
    }
}
