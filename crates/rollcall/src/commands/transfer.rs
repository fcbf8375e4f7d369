//! Export and import handlers.

use rollcall_core::{DataTransfer, HybridDataService, ImportReport};

use crate::cli::{ExportArgs, GlobalOpts, ImportArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn export(
    service: &HybridDataService,
    args: ExportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let transfer = DataTransfer::new(service.clone());
    let text = if args.share {
        transfer.export_share_text(&args.collection).await?
    } else {
        transfer.export_data(&args.collection).await?
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, text)?;
            output::success(
                &format!("Exported {} to {}", args.collection, path.display()),
                &global.color,
                global.quiet,
            );
        }
        // The document is the output; --output does not reshape it.
        None => output::print_output(&text, global.quiet),
    }
    Ok(())
}

fn report_detail(r: &ImportReport) -> String {
    output::detail_lines([
        ("imported", format!("{} of {}", r.imported, r.total)),
        ("options", r.imported_options.to_string()),
    ])
}

pub async fn import(
    service: &HybridDataService,
    args: ImportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let text = util::read_input(&args.file)?;
    let report = DataTransfer::new(service.clone()).import_data(&text).await?;
    let out = output::render_single(&global.output, &report, report_detail, |r| {
        r.imported.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
