use fxetl_core::{CurrencyCode, RateRecord, Warehouse};
use serde::Serialize;
use serde_json::Value;
use time::Date;

use crate::cli::RatesArgs;
use crate::config::AppConfig;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct RatesResponse {
    exchange_date: Date,
    count: usize,
    rates: Vec<RateRecord>,
}

pub fn run(config: &AppConfig, args: &RatesArgs) -> Result<Value, CliError> {
    let base = args.base.as_deref().map(CurrencyCode::parse).transpose()?;
    let quote = args.quote.as_deref().map(CurrencyCode::parse).transpose()?;

    let warehouse = Warehouse::open(config.warehouse.clone())?;
    let rates: Vec<RateRecord> = warehouse
        .rates_for_date(args.date)?
        .into_iter()
        .filter(|row| matches_code(base.as_ref(), &row.base_currency))
        .filter(|row| matches_code(quote.as_ref(), &row.quote_currency))
        .collect();

    Ok(serde_json::to_value(RatesResponse {
        exchange_date: args.date,
        count: rates.len(),
        rates,
    })?)
}

fn matches_code(filter: Option<&CurrencyCode>, value: &str) -> bool {
    filter.map_or(true, |code| code.as_str() == value)
}
