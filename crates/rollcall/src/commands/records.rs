//! Record command handlers.

use tabled::Tabled;

use rollcall_core::{HybridDataService, Record, fields};

use crate::cli::{GlobalOpts, ReadSource, RecordsArgs, RecordsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

const BOOKKEEPING: [&str; 8] = [
    fields::ID,
    fields::DEVICE_ID,
    fields::CREATED_AT,
    fields::UPDATED_AT,
    fields::SYNCED,
    fields::REMOTE_ID,
    fields::IMPORTED_FROM,
    fields::IMPORTED_AT,
];

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Synced")]
    synced: String,
    #[tabled(rename = "Fields")]
    fields: String,
}

impl From<&Record> for RecordRow {
    fn from(r: &Record) -> Self {
        let fields = r
            .as_map()
            .iter()
            .filter(|(k, _)| !BOOKKEEPING.contains(&k.as_str()))
            .map(|(k, v)| format!("{k}={}", util::preview(v, 24)))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            id: r.id().unwrap_or_default().to_owned(),
            device: r.device_id().unwrap_or_default().to_owned(),
            updated: r
                .updated_at()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            synced: if r.synced() { "yes" } else { "pending" }.into(),
            fields,
        }
    }
}

fn detail(r: &Record) -> String {
    output::detail_lines(
        r.as_map()
            .iter()
            .map(|(k, v)| (k.as_str(), util::preview(v, 80))),
    )
}

fn record_id(r: &Record) -> String {
    r.id().unwrap_or_default().to_owned()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    service: &HybridDataService,
    args: RecordsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RecordsCommand::List { collection, source } => {
            let items = match source {
                ReadSource::Auto => service.get_items(&collection).await,
                ReadSource::Cached => service.cached_items(&collection).await?.as_ref().clone(),
                ReadSource::Local => service.local_items(&collection).await,
            };
            let out = output::render_list(&global.output, &items, |r| RecordRow::from(r), record_id)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecordsCommand::Get { collection, id } => {
            let record = service
                .get_local(&collection, &id)
                .await?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "record".into(),
                    list_command: format!("records list {collection}"),
                    identifier: id,
                })?;
            let out = output::render_single(&global.output, &record, detail, record_id)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecordsCommand::Save { collection, body } => {
            let record = util::read_record(&body)?;
            let saved = service.save_data(record, &collection).await?;
            report_write(&saved, "Saved", global)
        }

        RecordsCommand::Update {
            collection,
            id,
            body,
        } => {
            let patch = util::read_record(&body)?;
            let updated = service.update_data(&collection, &id, patch).await?;
            report_write(&updated, "Updated", global)
        }

        RecordsCommand::Delete { collection, id } => {
            if !util::confirm(
                &format!("Delete {collection} record '{id}'?"),
                "records delete",
                global.yes,
            )? {
                return Ok(());
            }
            let outcome = service.delete_data(&collection, &id).await?;
            if !outcome.success {
                output::warning(
                    "Backend did not confirm the delete; removed locally only",
                    &global.color,
                );
            }
            output::success(&format!("Deleted {collection} '{id}'"), &global.color, global.quiet);
            Ok(())
        }

        RecordsCommand::Batch {
            collection,
            from_file,
        } => {
            let records = util::read_records(&from_file)?;
            let requested = records.len();
            let saved = service.batch_save_data(records, &collection).await;
            if saved.len() < requested {
                output::warning(
                    &format!(
                        "{} of {requested} records could not be stored; run with -v for details",
                        requested - saved.len()
                    ),
                    &global.color,
                );
            }
            let out = output::render_list(&global.output, &saved, |r| RecordRow::from(r), record_id)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Print the stored record and note when it is still waiting for sync.
fn report_write(record: &Record, verb: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, record, detail, record_id)?;
    output::print_output(&out, global.quiet);
    if record.synced() {
        output::success(&format!("{verb} '{}'", record_id(record)), &global.color, global.quiet);
    } else {
        output::success(
            &format!("{verb} '{}' locally; pending sync", record_id(record)),
            &global.color,
            global.quiet,
        );
    }
    Ok(())
}
