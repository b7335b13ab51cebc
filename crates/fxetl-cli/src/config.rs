//! Environment-based configuration.
//!
//! Settings resolve as flag, then environment (a `.env` file is loaded first
//! when present), then default.

use std::path::{Path, PathBuf};

use fxetl_core::{CurrencyUniverse, PipelineConfig, WarehouseConfig, ECB_BASE_URL};

use crate::error::CliError;

pub const DEFAULT_CURRENCIES: &str = "NOK,EUR,SEK,PLN,RON,DKK,CZK";
pub const DEFAULT_ANCHOR: &str = "EUR";
pub const DEFAULT_SOURCE_TAG: &str = "ECB";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub universe: CurrencyUniverse,
    pub source_tag: String,
    pub warehouse: WarehouseConfig,
    pub ecb_base_url: String,
    pub http_timeout_ms: u64,
    pub http_max_retries: u32,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env(db_path: Option<&Path>) -> Result<Self, CliError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok(), db_path)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        db_path: Option<&Path>,
    ) -> Result<Self, CliError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let currencies = var("FXETL_CURRENCIES").unwrap_or_else(|| DEFAULT_CURRENCIES.to_owned());
        let anchor = var("FXETL_ANCHOR").unwrap_or_else(|| DEFAULT_ANCHOR.to_owned());
        let universe = CurrencyUniverse::parse(anchor.trim(), &currencies)?;

        let source_tag = var("FXETL_SOURCE_TAG").unwrap_or_else(|| DEFAULT_SOURCE_TAG.to_owned());

        let mut warehouse = match var("FXETL_HOME") {
            Some(home) => WarehouseConfig::at_home(home),
            None => WarehouseConfig::default(),
        };
        if let Some(path) = var("FXETL_DB_PATH") {
            warehouse.db_path = PathBuf::from(path);
        }
        if let Some(path) = db_path {
            warehouse.db_path = path.to_path_buf();
        }

        Ok(Self {
            universe,
            source_tag,
            warehouse,
            ecb_base_url: var("FXETL_ECB_BASE_URL").unwrap_or_else(|| ECB_BASE_URL.to_owned()),
            http_timeout_ms: parse_var(&var, "FXETL_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?,
            http_max_retries: parse_var(&var, "FXETL_HTTP_MAX_RETRIES", DEFAULT_HTTP_MAX_RETRIES)?,
        })
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig, CliError> {
        Ok(PipelineConfig::new(
            self.universe.clone(),
            self.source_tag.clone(),
        )?)
    }
}

/// Unset falls back to `default`; a value that does not parse is an error.
fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CliError> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CliError::Config(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}
