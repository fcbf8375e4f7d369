//! Sync, status, and device handlers.

use serde::Serialize;
use tabled::Tabled;

use rollcall_core::{HybridDataService, SyncReport};

use crate::cli::{DeviceArgs, DeviceCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Sync ────────────────────────────────────────────────────────────

fn sync_detail(r: &SyncReport) -> String {
    output::detail_lines([
        ("result", r.message.clone()),
        ("synced", format!("{} of {}", r.synced, r.total)),
    ])
}

pub async fn sync(
    service: &HybridDataService,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = service.manual_sync().await?;
    if !report.success {
        return Err(CliError::BackendUnavailable {
            profile: resolved.profile_name.clone(),
        });
    }
    let out = output::render_single(&global.output, &report, sync_detail, |r| {
        r.synced.to_string()
    })?;
    output::print_output(&out, global.quiet);
    if report.synced < report.total {
        output::warning(
            &format!(
                "{} records are still pending; run with -v for details",
                report.total - report.synced
            ),
            &global.color,
        );
    }
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────

#[derive(Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct CollectionStatus {
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Pending")]
    pending: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView {
    profile: String,
    device_id: String,
    backend: Option<String>,
    available: bool,
    data_dir: String,
    collections: Vec<CollectionStatus>,
}

fn status_detail(s: &StatusView) -> String {
    let summary = output::detail_lines([
        ("profile", s.profile.clone()),
        ("device", s.device_id.clone()),
        (
            "backend",
            s.backend.clone().unwrap_or_else(|| "(offline only)".into()),
        ),
        (
            "reachable",
            if s.available { "yes" } else { "no" }.to_owned(),
        ),
        ("data dir", s.data_dir.clone()),
    ]);
    let table = tabled::Table::new(&s.collections)
        .with(tabled::settings::Style::rounded())
        .to_string();
    format!("{summary}\n\n{table}")
}

pub async fn status(
    service: &HybridDataService,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut collections = Vec::new();
    for collection in &service.config().sync_collections {
        let items = service.local_items(collection).await;
        collections.push(CollectionStatus {
            collection: collection.clone(),
            records: items.len(),
            pending: items.iter().filter(|r| !r.synced()).count(),
        });
    }

    let view = StatusView {
        profile: resolved.profile_name.clone(),
        device_id: service.device_id().await,
        backend: resolved.gateway.as_ref().map(|g| g.base_url.to_string()),
        available: service.is_backend_available().await,
        data_dir: resolved.data_dir.display().to_string(),
        collections,
    };
    let out = output::render_single(&global.output, &view, status_detail, |s| {
        s.device_id.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Device ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceView {
    device_id: String,
    admin_device_id: String,
    employee_id: String,
    hostname: String,
}

pub async fn device(
    service: &HybridDataService,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let identity = service.identity();
    match args.command {
        DeviceCommand::Show => {
            let view = DeviceView {
                device_id: identity.device_id().await,
                admin_device_id: identity.admin_device_id().await,
                employee_id: identity.device_employee_id().await,
                hostname: identity.hostname(),
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| {
                    output::detail_lines([
                        ("device id", v.device_id.clone()),
                        ("admin id", v.admin_device_id.clone()),
                        ("employee id", v.employee_id.clone()),
                        ("host", v.hostname.clone()),
                    ])
                },
                |v| v.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeviceCommand::Reset => {
            if !util::confirm(
                "Forget this device id? Records already saved keep the old one.",
                "device reset",
                global.yes,
            )? {
                return Ok(());
            }
            identity.clear_device_id().await?;
            output::success("Device id cleared", &global.color, global.quiet);
            Ok(())
        }
    }
}

// ── Cache ───────────────────────────────────────────────────────────

pub async fn clear_cache(service: &HybridDataService, global: &GlobalOpts) {
    service.cache().clear_all().await;
    output::success("Query cache cleared", &global.color, global.quiet);
}
