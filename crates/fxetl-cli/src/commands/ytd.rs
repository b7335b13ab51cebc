use fxetl_core::{Warehouse, YtdChange};
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct YtdResponse {
    year: i32,
    count: usize,
    changes: Vec<YtdChange>,
}

pub fn run(config: &AppConfig, year: i32) -> Result<Value, CliError> {
    let warehouse = Warehouse::open(config.warehouse.clone())?;
    let changes = warehouse.ytd_changes(year)?;

    Ok(serde_json::to_value(YtdResponse {
        year,
        count: changes.len(),
        changes,
    })?)
}
