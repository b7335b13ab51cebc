use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CliError;

/// Print a command result as JSON on stdout.
pub fn render(value: &Value, pretty: bool) -> Result<(), CliError> {
    println!("{}", encode(value, pretty)?);
    Ok(())
}

/// Print a failure summary as JSON on stderr.
pub fn render_failure(error: &CliError, pretty: bool) -> Result<(), CliError> {
    eprintln!("{}", encode(&failure_summary(error), pretty)?);
    Ok(())
}

fn encode(value: &impl Serialize, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(payload)
}

pub fn failure_summary(error: &CliError) -> Value {
    match error {
        CliError::Pipeline(failure) => json!({
            "run_id": failure.run_id,
            "mode": failure.mode,
            "window": failure.window,
            "stage": failure.failed_at,
            "code": failure.code(),
            "retryable": failure.retryable(),
            "committed_dates": failure.committed_dates,
            "transitions": failure.transitions,
            "message": failure.error.to_string(),
            "exit_code": error.exit_code(),
        }),
        other => json!({
            "stage": Value::Null,
            "code": other_code(other),
            "retryable": false,
            "committed_dates": [],
            "message": other.to_string(),
            "exit_code": other.exit_code(),
        }),
    }
}

fn other_code(error: &CliError) -> &'static str {
    match error {
        CliError::Validation(_) | CliError::Config(_) => "cli.config",
        CliError::Pipeline(failure) => failure.code(),
        CliError::Warehouse(_) => "cli.warehouse",
        CliError::Serialization(_) => "cli.serialization",
        CliError::Io(_) => "cli.io",
    }
}
