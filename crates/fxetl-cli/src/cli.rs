//! CLI argument definitions for fxetl.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `initial-load` | Load January 1 through today |
//! | `daily-update` | Load today only |
//! | `rates` | Read stored rates for one date |
//! | `ytd` | Year-to-date change per pair |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db-path` | `$FXETL_DB_PATH` | Warehouse file |
//! | `--log-level` | `info` | Log level when `RUST_LOG` is unset |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! fxetl initial-load --today 2025-11-05
//! fxetl daily-update
//! fxetl rates --date 2025-01-02 --base NOK --pretty
//! fxetl ytd --year 2025
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use time::macros::format_description;
use time::Date;

/// Foreign exchange reference rate loader.
///
/// Fetches anchor-relative reference rates, derives every cross pair of the
/// configured currencies and replaces them per date in a local DuckDB
/// warehouse.
#[derive(Debug, Parser)]
#[command(name = "fxetl", author, version, about = "Foreign exchange rate ETL")]
pub struct Cli {
    /// Warehouse file. Overrides `FXETL_DB_PATH`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load every published date from January 1 through today.
    ///
    /// # Examples
    ///
    ///   fxetl initial-load
    ///   fxetl initial-load --today 2025-11-05
    InitialLoad(LoadArgs),

    /// Load today's rates only.
    ///
    /// Exits with code 3 on days without published rates.
    DailyUpdate(LoadArgs),

    /// Print stored rates for one date.
    Rates(RatesArgs),

    /// Print the year-to-date change per pair.
    Ytd(YtdArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Date treated as today (YYYY-MM-DD). Defaults to the current UTC date.
    #[arg(long, value_parser = parse_date)]
    pub today: Option<Date>,
}

#[derive(Debug, Args)]
pub struct RatesArgs {
    /// Exchange date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub date: Date,

    /// Only rows with this base currency.
    #[arg(long)]
    pub base: Option<String>,

    /// Only rows with this quote currency.
    #[arg(long)]
    pub quote: Option<String>,
}

#[derive(Debug, Args)]
pub struct YtdArgs {
    /// Calendar year. Defaults to the current UTC year.
    #[arg(long)]
    pub year: Option<i32>,
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected YYYY-MM-DD, got '{raw}': {error}"))
}
