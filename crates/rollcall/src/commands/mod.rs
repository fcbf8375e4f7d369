//! Command dispatch: bridges CLI args -> data service calls -> output formatting.

pub mod config_cmd;
pub mod options;
pub mod records;
pub mod sync;
pub mod transfer;
pub mod util;

use rollcall_core::HybridDataService;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a data-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    service: &HybridDataService,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Records(args) => records::handle(service, args, global).await,
        Command::Options(args) => options::handle(service, args, global).await,
        Command::Export(args) => transfer::export(service, args, global).await,
        Command::Import(args) => transfer::import(service, args, global).await,
        Command::Sync => sync::sync(service, resolved, global).await,
        Command::Status => sync::status(service, resolved, global).await,
        Command::Device(args) => sync::device(service, args, global).await,
        Command::ClearCache => {
            sync::clear_cache(service, global).await;
            Ok(())
        }
        // Config and Completions are handled before the service opens
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not use the data service".into(),
        )),
    }
}
