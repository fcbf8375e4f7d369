//! Shared helpers for command handlers.

use std::io::{IsTerminal, Read};
use std::path::Path;

use serde_json::Value;

use rollcall_core::Record;

use crate::cli::DataArgs;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the caller must pass `--yes`.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(path)?)
}

fn parse_json(text: &str, field: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// The record body given by `--data` or `--from-file`.
pub fn read_record(body: &DataArgs) -> Result<Record, CliError> {
    let (value, field) = match (&body.data, &body.from_file) {
        (Some(inline), _) => (parse_json(inline, "data")?, "data"),
        (None, Some(path)) => (parse_json(&read_input(path)?, "from-file")?, "from-file"),
        (None, None) => {
            return Err(CliError::Validation {
                field: "data".into(),
                reason: "pass --data or --from-file".into(),
            });
        }
    };
    Record::from_value(value).ok_or_else(|| CliError::Validation {
        field: field.into(),
        reason: "expected a JSON object".into(),
    })
}

/// A JSON array of objects, for batch saves.
pub fn read_records(path: &Path) -> Result<Vec<Record>, CliError> {
    let Value::Array(items) = parse_json(&read_input(path)?, "from-file")? else {
        return Err(CliError::Validation {
            field: "from-file".into(),
            reason: "expected a JSON array of objects".into(),
        });
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            Record::from_value(item).ok_or_else(|| CliError::Validation {
                field: format!("from-file[{i}]"),
                reason: "expected a JSON object".into(),
            })
        })
        .collect()
}

/// Compact one-line preview of a JSON value for table cells.
pub fn preview(value: &Value, max: usize) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= max {
        return text;
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
