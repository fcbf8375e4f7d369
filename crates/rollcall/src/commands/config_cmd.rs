//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Password, Select};
use serde_json::Value;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const SETTABLE_KEYS: &str = "backend, api_key, api_key_env, ca_cert, insecure, timeout, \
    device_tag, data_dir, cache.ttl, cache.restore_max_age, cache.wait_timeout, cache.persist, \
    sync.probe_collection, sync.collections, sync.option_fields, sync.batch_chunk_size";

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if p.backend.is_empty() {
            let _ = writeln!(out, "backend = \"\"  # offline only");
        } else {
            let _ = writeln!(out, "backend = \"{}\"", p.backend);
        }
        if p.api_key.is_some() {
            let _ = writeln!(out, "api_key = \"****\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ref tag) = p.device_tag {
            let _ = writeln!(out, "device_tag = \"{tag}\"");
        }
        if let Some(ref dir) = p.data_dir {
            let _ = writeln!(out, "data_dir = \"{}\"", dir.display());
        }
        let _ = writeln!(
            out,
            "cache = {{ ttl = {}, restore_max_age = {}, wait_timeout = {}, persist = {} }}",
            p.cache.ttl, p.cache.restore_max_age, p.cache.wait_timeout, p.cache.persist
        );
        let _ = writeln!(
            out,
            "sync = {{ probe_collection = \"{}\", collections = {:?}, batch_chunk_size = {} }}",
            p.sync.probe_collection, p.sync.collections, p.sync.batch_chunk_size
        );
    }

    out
}

/// Structured form of the config with plaintext keys masked.
fn redacted_value(cfg: &Config) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(cfg).map_err(|e| CliError::Data {
        message: e.to_string(),
    })?;
    if let Some(Value::Object(profiles)) = value.get_mut("profiles") {
        for profile in profiles.values_mut() {
            if let Some(key) = profile.get_mut("api_key").filter(|k| !k.is_null()) {
                *key = Value::String("****".into());
            }
        }
    }
    Ok(value)
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Apply one `config set` assignment to a profile.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "backend" => profile.backend = value,
        "api_key" => profile.api_key = Some(value),
        "api_key_env" => profile.api_key_env = Some(value),
        "ca_cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "device_tag" => profile.device_tag = Some(value),
        "data_dir" => profile.data_dir = Some(value.into()),
        "cache.ttl" => profile.cache.ttl = parse_value(key, &value, "a number (seconds)")?,
        "cache.restore_max_age" => {
            profile.cache.restore_max_age = parse_value(key, &value, "a number (seconds)")?;
        }
        "cache.wait_timeout" => {
            profile.cache.wait_timeout = parse_value(key, &value, "a number (seconds)")?;
        }
        "cache.persist" => profile.cache.persist = parse_value(key, &value, "'true' or 'false'")?,
        "sync.probe_collection" => profile.sync.probe_collection = value,
        "sync.collections" => profile.sync.collections = parse_list(&value),
        "sync.option_fields" => profile.sync.option_fields = parse_list(&value),
        "sync.batch_chunk_size" => {
            profile.sync.batch_chunk_size = parse_value(key, &value, "a positive number")?;
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
            });
        }
    }
    Ok(())
}

/// Offer to store the API key in the system keyring or return it for
/// plaintext config.
///
/// Returns `Some(key)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_key_storage(key: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        rollcall_config::store_api_key(profile_name, key)?;
        eprintln!("   ✓ API key stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(key.to_owned()))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_file(global);
            eprintln!("rollcall configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let backend: String = Input::new()
                .with_prompt("Backend URL (empty for offline only)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let api_key = if backend.trim().is_empty() {
                None
            } else {
                let key = Password::new()
                    .with_prompt("API key (empty for none)")
                    .allow_empty_password(true)
                    .interact()
                    .map_err(prompt_err)?;
                if key.is_empty() {
                    None
                } else {
                    prompt_key_storage(&key, &profile_name)?
                }
            };

            let device_tag: String = Input::new()
                .with_prompt("Device tag (empty to use the host name)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let profile = Profile {
                backend: backend.trim().to_owned(),
                api_key,
                device_tag: Some(device_tag.trim().to_owned()).filter(|t| !t.is_empty()),
                ..Profile::default()
            };

            let mut cfg = config::load(global)?;
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            config::save(&cfg, global)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: rollcall status");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let redacted = redacted_value(&cfg)?;
            let out = output::render_single(
                &global.output,
                &redacted,
                |_| format_config_redacted(&cfg),
                |_| config::active_profile_name(global, &cfg),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_file(global).display().to_string(), false);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_profile_value(profile, &key, value)?;
            rollcall_config::profile_to_service_config(profile)?;
            if !profile.backend.is_empty() {
                rollcall_config::profile_to_gateway_config(profile, &profile_name)?;
            }

            config::save(&cfg, global)?;
            output::success(
                &format!("Set {key} on profile '{profile_name}'"),
                &global.color,
                global.quiet,
            );
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: rollcall config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save(&cfg, global)?;
            output::success(
                &format!("Default profile set to '{name}'"),
                &global.color,
                global.quiet,
            );
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { key } => {
            let cfg = config::load(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            let key = match key {
                Some(key) => key,
                None => Password::new()
                    .with_prompt(format!("API key for '{profile_name}'"))
                    .interact()
                    .map_err(prompt_err)?,
            };
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }
            rollcall_config::store_api_key(&profile_name, &key)?;
            output::success(
                &format!("API key for '{profile_name}' stored in system keyring"),
                &global.color,
                global.quiet,
            );
            Ok(())
        }
    }
}
