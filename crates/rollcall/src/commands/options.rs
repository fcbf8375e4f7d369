//! Option list handlers (departments, ranks, stations, ...).

use rollcall_core::HybridDataService;

use crate::cli::{GlobalOpts, OptionsArgs, OptionsCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

fn render_values(values: &[String], global: &GlobalOpts) -> Result<(), CliError> {
    // Table and plain both print one value per line; there is one column.
    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => values.join("\n"),
        _ => output::render_single(&global.output, values, |_| String::new(), |_| String::new())?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    service: &HybridDataService,
    args: OptionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        OptionsCommand::List {
            field,
            deleted,
            local,
        } => {
            let values = if deleted {
                service.deleted_options(&field).await?
            } else if local {
                service.local_options(&field).await?
            } else {
                service.get_options(&field).await?
            };
            render_values(&values, global)
        }

        OptionsCommand::Add { field, value } => {
            if service.add_option(&field, &value).await? {
                output::success(&format!("Added '{value}' to {field}"), &global.color, global.quiet);
            } else {
                output::warning(
                    &format!("'{value}' is empty or already listed in {field}"),
                    &global.color,
                );
            }
            Ok(())
        }

        OptionsCommand::Remove { field, value } => {
            if service.remove_option(&field, &value).await? {
                output::success(
                    &format!("Removed '{value}' from {field} on this device"),
                    &global.color,
                    global.quiet,
                );
            } else {
                output::warning(&format!("'{value}' was already removed"), &global.color);
            }
            Ok(())
        }

        OptionsCommand::Restore { field, value } => {
            if service.restore_option(&field, &value).await? {
                output::success(&format!("Restored '{value}' in {field}"), &global.color, global.quiet);
            } else {
                output::warning(&format!("'{value}' was not removed"), &global.color);
            }
            Ok(())
        }
    }
}
