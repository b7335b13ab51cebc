//! # fxetl warehouse
//!
//! DuckDB-backed fact store for daily exchange rates.
//!
//! ## Overview
//!
//! Rates are written one whole date at a time. [`Warehouse::replace_dates`]
//! validates every row, groups rows by date, and for each date runs `DELETE`
//! then `INSERT` inside one transaction. Re-running a load for the same dates
//! therefore converges on the same table contents.
//!
//! ```rust,no_run
//! use fxetl_warehouse::{Warehouse, WarehouseConfig};
//! use time::macros::date;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     for row in warehouse.rates_for_date(date!(2025 - 01 - 02))? {
//!         println!("{} {}/{} {}", row.exchange_date, row.base_currency, row.quote_currency, row.rate);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `fact_exchange_rates` | One row per (date, base, quote) |
//! | `load_log` | One audit row per replaced date |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_fx_latest` | Rates for the most recent loaded date |
//! | `vw_fx_ytd_change` | First, latest and percentage change per pair and year |

pub mod duckdb;
pub mod migrations;
mod record;
pub mod views;

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::duckdb::{Connection, ToSql};
use rust_decimal::Decimal;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};
pub use record::{LoadLogEntry, RateRecord, YtdChange, RATE_SCALE};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// Error message prefixes DuckDB uses for statements that will fail the same
// way on every retry.
const PERMANENT_DUCKDB_ERRORS: &[&str] = &[
    "Binder Error",
    "Catalog Error",
    "Constraint Error",
    "Conversion Error",
    "Invalid Input Error",
    "Out of Range Error",
    "Parser Error",
];

const RATE_COLUMNS: &str = "CAST(exchange_date AS VARCHAR), base_currency, quote_currency, \
     CAST(rate AS VARCHAR), CAST(rate_inverse AS VARCHAR), data_source, \
     strftime(load_timestamp, '%Y-%m-%d %H:%M:%S')";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A row failed validation before any transaction started.
    #[error("row {exchange_date} {base_currency}/{quote_currency} rejected: {reason}")]
    RowRejected {
        exchange_date: Date,
        base_currency: String,
        quote_currency: String,
        reason: String,
    },

    /// A read request was malformed.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// A stored value could not be decoded.
    #[error("stored row could not be decoded: {0}")]
    CorruptRow(String),
}

impl WarehouseError {
    /// Whether the failure comes from the data itself and would repeat on retry.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::RowRejected { .. } | Self::QueryRejected(_) | Self::CorruptRow(_) => true,
            Self::DuckDb(error) => {
                let message = error.to_string();
                PERMANENT_DUCKDB_ERRORS
                    .iter()
                    .any(|prefix| message.contains(prefix))
            }
            Self::Io(_) => false,
        }
    }
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for fxetl data.
    pub fxetl_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept per access mode.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    /// Configuration rooted at `fxetl_home`, with the database file inside it.
    #[must_use]
    pub fn at_home(fxetl_home: impl Into<PathBuf>) -> Self {
        let fxetl_home = fxetl_home.into();
        let db_path = fxetl_home.join("warehouse.duckdb");
        Self {
            fxetl_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::at_home(resolve_fxetl_home())
    }
}

/// Dates committed by a successful [`Warehouse::replace_dates`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    pub dates: Vec<Date>,
    pub rows_written: usize,
}

/// A replace that stopped early. Dates committed before the failure stay
/// committed and are listed here.
#[derive(Debug, Error)]
#[error("replace stopped after {} committed date(s): {source}", .committed_dates.len())]
pub struct ReplaceFailure {
    pub source: WarehouseError,
    pub committed_dates: Vec<Date>,
    pub rows_committed: usize,
}

impl ReplaceFailure {
    fn before_any_commit(source: WarehouseError) -> Self {
        Self {
            source,
            committed_dates: Vec::new(),
            rows_committed: 0,
        }
    }
}

/// The exchange-rate warehouse.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the database file and bring its schema up to date.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending migrations and refresh views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Replace the stored rows of every date present in `rows`.
    ///
    /// All rows are validated first; a single bad row rejects the whole call
    /// and nothing is written. Each date is then replaced in its own
    /// transaction, in ascending date order, with rows inserted in
    /// (base, quote) order. The call is atomic per date, not across dates.
    pub fn replace_dates(
        &self,
        run_id: &str,
        rows: &[RateRecord],
    ) -> Result<ReplaceReport, ReplaceFailure> {
        if rows.is_empty() {
            return Ok(ReplaceReport::default());
        }

        let batches = group_by_date(rows).map_err(ReplaceFailure::before_any_commit)?;
        let connection = self
            .manager
            .acquire(AccessMode::ReadWrite)
            .map_err(|error| ReplaceFailure::before_any_commit(error.into()))?;

        let mut report = ReplaceReport::default();
        for (date, batch) in &batches {
            match replace_one_date(&connection, run_id, *date, batch) {
                Ok(written) => {
                    tracing::debug!(exchange_date = %date, rows = written, "date replaced");
                    report.dates.push(*date);
                    report.rows_written += written;
                }
                Err(source) => {
                    tracing::warn!(
                        exchange_date = %date,
                        committed = report.dates.len(),
                        error = %source,
                        "date replace rolled back"
                    );
                    return Err(ReplaceFailure {
                        source,
                        committed_dates: report.dates,
                        rows_committed: report.rows_written,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Every stored row for `date`, ordered by (base, quote).
    pub fn rates_for_date(&self, date: Date) -> Result<Vec<RateRecord>, WarehouseError> {
        let date_text = format_date(date)?;
        let params: [&dyn ToSql; 1] = [&date_text];
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM fact_exchange_rates \
             WHERE exchange_date = CAST(? AS DATE) \
             ORDER BY base_currency, quote_currency"
        );
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        query_rates(&connection, sql.as_str(), params.as_slice())
    }

    /// Stored rows for the inclusive range, ordered by (date, base, quote).
    pub fn rates_between(&self, start: Date, end: Date) -> Result<Vec<RateRecord>, WarehouseError> {
        if start > end {
            return Err(WarehouseError::QueryRejected(format!(
                "range start {start} is after range end {end}"
            )));
        }
        let start_text = format_date(start)?;
        let end_text = format_date(end)?;
        let params: [&dyn ToSql; 2] = [&start_text, &end_text];
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM fact_exchange_rates \
             WHERE exchange_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE) \
             ORDER BY exchange_date, base_currency, quote_currency"
        );
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        query_rates(&connection, sql.as_str(), params.as_slice())
    }

    /// Distinct stored dates in ascending order.
    pub fn loaded_dates(&self) -> Result<Vec<Date>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT DISTINCT CAST(exchange_date AS VARCHAR) AS exchange_date \
             FROM fact_exchange_rates ORDER BY exchange_date",
        )?;
        let mut rows = statement.query([] as [&dyn ToSql; 0])?;
        let mut dates = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            dates.push(parse_date(&text)?);
        }
        Ok(dates)
    }

    /// Year-to-date change per pair for `year`, ordered by (base, quote).
    pub fn ytd_changes(&self, year: i32) -> Result<Vec<YtdChange>, WarehouseError> {
        let year = i64::from(year);
        let params: [&dyn ToSql; 1] = [&year];
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT CAST(year AS BIGINT), base_currency, quote_currency, \
             CAST(first_date AS VARCHAR), CAST(last_date AS VARCHAR), \
             CAST(first_rate AS VARCHAR), CAST(last_rate AS VARCHAR), \
             CAST(change_pct AS VARCHAR) \
             FROM vw_fx_ytd_change WHERE year = ? \
             ORDER BY base_currency, quote_currency",
        )?;
        let mut rows = statement.query(params.as_slice())?;
        let mut changes = Vec::new();
        while let Some(row) = rows.next()? {
            let year: i64 = row.get(0)?;
            changes.push(YtdChange {
                year: i32::try_from(year)
                    .map_err(|_| WarehouseError::CorruptRow(format!("year {year} out of range")))?,
                base_currency: row.get(1)?,
                quote_currency: row.get(2)?,
                first_date: parse_date(&row.get::<_, String>(3)?)?,
                last_date: parse_date(&row.get::<_, String>(4)?)?,
                first_rate: parse_decimal(&row.get::<_, String>(5)?)?,
                last_rate: parse_decimal(&row.get::<_, String>(6)?)?,
                change_pct: parse_decimal(&row.get::<_, String>(7)?)?,
            });
        }
        Ok(changes)
    }

    /// Audit entries recorded for `date`, oldest first.
    pub fn load_log_for_date(&self, date: Date) -> Result<Vec<LoadLogEntry>, WarehouseError> {
        let date_text = format_date(date)?;
        let params: [&dyn ToSql; 1] = [&date_text];
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT run_id, CAST(exchange_date AS VARCHAR), rows_written, data_source, \
             strftime(load_timestamp, '%Y-%m-%d %H:%M:%S') \
             FROM load_log WHERE exchange_date = CAST(? AS DATE) \
             ORDER BY logged_at, run_id",
        )?;
        let mut rows = statement.query(params.as_slice())?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let rows_written: i64 = row.get(2)?;
            entries.push(LoadLogEntry {
                run_id: row.get(0)?,
                exchange_date: parse_date(&row.get::<_, String>(1)?)?,
                rows_written: u64::try_from(rows_written).map_err(|_| {
                    WarehouseError::CorruptRow(format!("negative rows_written {rows_written}"))
                })?,
                data_source: row.get(3)?,
                load_timestamp: parse_timestamp(&row.get::<_, String>(4)?)?,
            });
        }
        Ok(entries)
    }
}

/// Validate every row and bucket them by date, each bucket sorted by (base, quote).
fn group_by_date(rows: &[RateRecord]) -> Result<BTreeMap<Date, Vec<&RateRecord>>, WarehouseError> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut batches: BTreeMap<Date, Vec<&RateRecord>> = BTreeMap::new();

    for row in rows {
        let rejected = |reason: String| WarehouseError::RowRejected {
            exchange_date: row.exchange_date,
            base_currency: row.base_currency.clone(),
            quote_currency: row.quote_currency.clone(),
            reason,
        };
        row.check_storable().map_err(rejected)?;
        if !seen.insert(row.sort_key()) {
            return Err(rejected(String::from(
                "duplicate (date, base, quote) in write batch",
            )));
        }
        batches.entry(row.exchange_date).or_default().push(row);
    }

    for batch in batches.values_mut() {
        batch.sort_by(|left, right| left.sort_key().cmp(&right.sort_key()));
    }
    Ok(batches)
}

fn replace_one_date(
    connection: &Connection,
    run_id: &str,
    date: Date,
    batch: &[&RateRecord],
) -> Result<usize, WarehouseError> {
    let date_text = format_date(date)?;
    let encoded = batch
        .iter()
        .map(|row| EncodedRow::encode(row))
        .collect::<Result<Vec<_>, _>>()?;

    connection.execute_batch("BEGIN TRANSACTION")?;
    let result = (|| -> Result<usize, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&date_text];
        connection.execute(
            "DELETE FROM fact_exchange_rates WHERE exchange_date = CAST(? AS DATE)",
            params.as_slice(),
        )?;

        let mut insert = connection.prepare(
            "INSERT INTO fact_exchange_rates \
             (exchange_date, base_currency, quote_currency, rate, rate_inverse, data_source, load_timestamp) \
             VALUES (CAST(? AS DATE), ?, ?, CAST(? AS DECIMAL(38, 18)), CAST(? AS DECIMAL(38, 18)), ?, CAST(? AS TIMESTAMP))",
        )?;
        for row in &encoded {
            let params: [&dyn ToSql; 7] = [
                &date_text,
                &row.base_currency,
                &row.quote_currency,
                &row.rate,
                &row.rate_inverse,
                &row.data_source,
                &row.load_timestamp,
            ];
            insert.execute(params.as_slice())?;
        }

        let rows_written = i64::try_from(encoded.len())
            .map_err(|_| WarehouseError::QueryRejected(String::from("batch too large")))?;
        let first = &encoded[0];
        let params: [&dyn ToSql; 5] = [
            &run_id,
            &date_text,
            &rows_written,
            &first.data_source,
            &first.load_timestamp,
        ];
        connection.execute(
            "INSERT INTO load_log (run_id, exchange_date, rows_written, data_source, load_timestamp) \
             VALUES (?, CAST(? AS DATE), ?, ?, CAST(? AS TIMESTAMP))",
            params.as_slice(),
        )?;

        Ok(encoded.len())
    })();

    finalize_transaction(connection, result)
}

/// A row with every value rendered as the text DuckDB casts from.
struct EncodedRow<'a> {
    base_currency: &'a str,
    quote_currency: &'a str,
    rate: String,
    rate_inverse: String,
    data_source: &'a str,
    load_timestamp: String,
}

impl<'a> EncodedRow<'a> {
    fn encode(row: &'a RateRecord) -> Result<Self, WarehouseError> {
        Ok(Self {
            base_currency: row.base_currency.as_str(),
            quote_currency: row.quote_currency.as_str(),
            rate: row.rate.to_string(),
            rate_inverse: row.rate_inverse.to_string(),
            data_source: row.data_source.as_str(),
            load_timestamp: format_timestamp(row.load_timestamp)?,
        })
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn query_rates(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<RateRecord>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(RateRecord {
            exchange_date: parse_date(&row.get::<_, String>(0)?)?,
            base_currency: row.get(1)?,
            quote_currency: row.get(2)?,
            rate: parse_decimal(&row.get::<_, String>(3)?)?,
            rate_inverse: parse_decimal(&row.get::<_, String>(4)?)?,
            data_source: row.get(5)?,
            load_timestamp: parse_timestamp(&row.get::<_, String>(6)?)?,
        });
    }
    Ok(records)
}

fn format_date(date: Date) -> Result<String, WarehouseError> {
    date.format(DATE_FORMAT)
        .map_err(|error| WarehouseError::QueryRejected(format!("unformattable date {date}: {error}")))
}

fn format_timestamp(value: OffsetDateTime) -> Result<String, WarehouseError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .map_err(|error| {
            WarehouseError::QueryRejected(format!("unformattable timestamp {value}: {error}"))
        })
}

fn parse_date(text: &str) -> Result<Date, WarehouseError> {
    Date::parse(text, DATE_FORMAT)
        .map_err(|error| WarehouseError::CorruptRow(format!("date '{text}': {error}")))
}

fn parse_timestamp(text: &str) -> Result<OffsetDateTime, WarehouseError> {
    PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|error| WarehouseError::CorruptRow(format!("timestamp '{text}': {error}")))
}

fn parse_decimal(text: &str) -> Result<Decimal, WarehouseError> {
    Decimal::from_str(text)
        .map_err(|error| WarehouseError::CorruptRow(format!("decimal '{text}': {error}")))
}

/// Resolve the fxetl home directory from environment or default.
fn resolve_fxetl_home() -> PathBuf {
    if let Some(path) = env::var_os("FXETL_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".fxetl");
    }

    PathBuf::from(".fxetl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;
    use time::macros::{date, datetime};

    fn open_temp() -> (tempfile::TempDir, Warehouse) {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::at_home(temp.path().join("fxetl-home")))
                .expect("warehouse open");
        (temp, warehouse)
    }

    fn row(date: Date, base: &str, quote: &str, rate: Decimal) -> RateRecord {
        RateRecord {
            exchange_date: date,
            base_currency: base.to_string(),
            quote_currency: quote.to_string(),
            rate,
            rate_inverse: (Decimal::ONE / rate).round_dp_with_strategy(
                RATE_SCALE,
                rust_decimal::RoundingStrategy::MidpointNearestEven,
            ),
            data_source: String::from("ECB"),
            load_timestamp: datetime!(2025-01-03 07:00:00 UTC),
        }
    }

    #[test]
    fn initializes_tables_and_views() {
        let (_temp, warehouse) = open_temp();
        let connection = warehouse
            .manager
            .acquire(AccessMode::ReadOnly)
            .expect("connection");

        let count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_name IN ('fact_exchange_rates', 'load_log', 'vw_fx_latest', 'vw_fx_ytd_change')",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(count, 4);
    }

    #[test]
    fn reopening_an_existing_file_keeps_rows() {
        let temp = tempdir().expect("tempdir");
        let config = WarehouseConfig::at_home(temp.path());
        {
            let warehouse = Warehouse::open(config.clone()).expect("open");
            warehouse
                .replace_dates(
                    "run-1",
                    &[row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(11.5))],
                )
                .expect("replace");
        }

        let reopened = Warehouse::open(config).expect("reopen");
        assert_eq!(reopened.loaded_dates().expect("dates"), vec![date!(2025 - 01 - 02)]);
    }

    #[test]
    fn replace_stores_hostile_strings_verbatim_through_parameters() {
        let (_temp, warehouse) = open_temp();
        let mut hostile = row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(11.5));
        hostile.data_source = String::from("ECB'); DROP TABLE fact_exchange_rates; --");

        warehouse.replace_dates("run-1", &[hostile.clone()]).expect("replace");

        let stored = warehouse
            .rates_for_date(date!(2025 - 01 - 02))
            .expect("read back");
        assert_eq!(stored, vec![hostile]);
    }

    #[test]
    fn ytd_change_spans_first_and_last_loaded_date() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .replace_dates(
                "run-1",
                &[
                    row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(11.5)),
                    row(date!(2025 - 03 - 03), "EUR", "NOK", dec!(11.0)),
                    row(date!(2025 - 06 - 02), "EUR", "NOK", dec!(12.65)),
                    row(date!(2024 - 12 - 31), "EUR", "NOK", dec!(1)),
                ],
            )
            .expect("replace");

        let changes = warehouse.ytd_changes(2025).expect("ytd");
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.first_date, date!(2025 - 01 - 02));
        assert_eq!(change.last_date, date!(2025 - 06 - 02));
        assert_eq!(change.first_rate, dec!(11.5));
        assert_eq!(change.last_rate, dec!(12.65));
        assert_eq!(change.change_pct, dec!(10));
    }

    #[test]
    fn ytd_view_computes_change_in_decimal() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .replace_dates(
                "run-1",
                &[
                    row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(11.5)),
                    row(date!(2025 - 03 - 03), "EUR", "NOK", dec!(12.65)),
                    row(date!(2025 - 01 - 02), "EUR", "SEK", dec!(11.2)),
                    row(date!(2025 - 03 - 03), "EUR", "SEK", dec!(10.64)),
                ],
            )
            .expect("replace");

        let connection = warehouse
            .manager
            .acquire(AccessMode::ReadOnly)
            .expect("connection");
        let mut statement = connection
            .prepare(
                "SELECT quote_currency, typeof(change_pct), CAST(change_pct AS VARCHAR) \
                 FROM vw_fx_ytd_change ORDER BY quote_currency",
            )
            .expect("prepare");
        let rows: Vec<(String, String, String)> = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");

        assert_eq!(
            rows,
            vec![
                (
                    String::from("NOK"),
                    String::from("DECIMAL(38,6)"),
                    String::from("10.000000")
                ),
                (
                    String::from("SEK"),
                    String::from("DECIMAL(38,6)"),
                    String::from("-5.000000")
                ),
            ]
        );
    }

    #[test]
    fn failed_date_replace_keeps_previous_rows() {
        let (_temp, warehouse) = open_temp();
        let loaded = row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(11.5));
        warehouse
            .replace_dates("run-1", &[loaded.clone()])
            .expect("first load");
        warehouse
            .manager
            .acquire(AccessMode::ReadWrite)
            .expect("connection")
            .execute_batch("DROP TABLE load_log")
            .expect("drop");

        let failure = warehouse
            .replace_dates("run-2", &[row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(12.0))])
            .expect_err("audit insert fails after the delete");

        assert!(failure.source.is_rejection());
        assert!(failure.committed_dates.is_empty());
        assert_eq!(failure.rows_committed, 0);
        assert_eq!(
            warehouse.rates_for_date(date!(2025 - 01 - 02)).expect("read"),
            vec![loaded]
        );
    }

    #[test]
    fn failure_on_a_later_date_keeps_earlier_commits_only() {
        let (_temp, warehouse) = open_temp();
        let friday = row(date!(2025 - 01 - 03), "EUR", "NOK", dec!(11.766));
        warehouse
            .replace_dates("run-1", &[friday.clone()])
            .expect("first load");
        // A second audit entry for Friday now violates the index.
        warehouse
            .manager
            .acquire(AccessMode::ReadWrite)
            .expect("connection")
            .execute_batch("CREATE UNIQUE INDEX load_log_one_per_date ON load_log (exchange_date)")
            .expect("index");

        let thursday = row(date!(2025 - 01 - 02), "EUR", "NOK", dec!(11.7895));
        let failure = warehouse
            .replace_dates(
                "run-2",
                &[row(date!(2025 - 01 - 03), "EUR", "NOK", dec!(12.0)), thursday.clone()],
            )
            .expect_err("second date fails");

        assert_eq!(failure.committed_dates, vec![date!(2025 - 01 - 02)]);
        assert_eq!(failure.rows_committed, 1);
        assert_eq!(
            warehouse.rates_for_date(date!(2025 - 01 - 02)).expect("read"),
            vec![thursday]
        );
        assert_eq!(
            warehouse.rates_for_date(date!(2025 - 01 - 03)).expect("read"),
            vec![friday]
        );
        assert_eq!(
            warehouse
                .load_log_for_date(date!(2025 - 01 - 03))
                .expect("log")
                .len(),
            1
        );

        // The connection is left usable for the next write.
        warehouse
            .replace_dates("run-3", &[row(date!(2025 - 01 - 06), "EUR", "NOK", dec!(11.7415))])
            .expect("next write");
        assert_eq!(
            warehouse.loaded_dates().expect("dates"),
            vec![date!(2025 - 01 - 02), date!(2025 - 01 - 03), date!(2025 - 01 - 06)]
        );
    }

    #[test]
    fn rates_between_rejects_reversed_range() {
        let (_temp, warehouse) = open_temp();
        let error = warehouse
            .rates_between(date!(2025 - 02 - 01), date!(2025 - 01 - 01))
            .expect_err("reversed range");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn classifies_duckdb_errors_by_permanence() {
        let (_temp, warehouse) = open_temp();
        let connection = warehouse
            .manager
            .acquire(AccessMode::ReadWrite)
            .expect("connection");

        let error: WarehouseError = connection
            .execute_batch("SELECT * FROM no_such_table")
            .expect_err("catalog error")
            .into();
        assert!(error.is_rejection());

        let io = WarehouseError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        assert!(!io.is_rejection());
    }
}
