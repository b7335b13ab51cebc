//! # fxetl Core
//!
//! Rate sourcing, cross-pair derivation and the load pipeline for the fxetl
//! foreign exchange warehouse.
//!
//! ## Overview
//!
//! - **Domain types** for currency codes, rate observations and load windows
//! - **Rate sources** behind one async trait, with the ECB adapter and an
//!   in-memory source
//! - **Cross-pair derivation** through a single anchor currency
//! - **Pipeline runner** with two entry points, initial load and daily update
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | ECB and in-memory rate sources |
//! | [`data_source`] | Rate source trait and request/error types |
//! | [`derive`] | Cross-pair derivation |
//! | [`domain`] | Domain models |
//! | [`error`] | Validation errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`pipeline`] | Pipeline runner, run report and failures |
//! | [`planner`] | Load window planning |
//! | [`retry`] | Retrying HTTP client |
//! | [`rows`] | Warehouse row shaping |
//! | [`source`] | Source identifiers |
//! | [`writer`] | Warehouse writer trait |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI            │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ PipelineRunner  │────▶│ LoadPlanner      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ RateSource      │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (retry/reqwest)  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ CrossPairDeriver│────▶│ RowBuilder       │
//! └─────────────────┘     └────────┬─────────┘
//!                                  │
//!                                  ▼
//!                         ┌──────────────────┐
//!                         │ WarehouseWriter  │
//!                         │ (DuckDB)         │
//!                         └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxetl_core::{
//!     CurrencyUniverse, EcbAdapter, PipelineConfig, PipelineRunner, ReqwestHttpClient, Warehouse,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let universe = CurrencyUniverse::parse("EUR", "NOK,EUR,SEK")?;
//!     let source = EcbAdapter::new(universe.clone(), Arc::new(ReqwestHttpClient::new()))?;
//!     let warehouse = Warehouse::open_default()?;
//!     let runner = PipelineRunner::new(
//!         PipelineConfig::new(universe, "ECB")?,
//!         Arc::new(source),
//!         Arc::new(warehouse),
//!     )?;
//!
//!     let report = runner.run_daily_update(time::macros::date!(2025 - 01 - 02)).await?;
//!     println!("{} rows written", report.rows_written);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod data_source;
pub mod derive;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod planner;
pub mod retry;
pub mod rows;
pub mod source;
pub mod writer;

// Adapter implementations
pub use adapters::{EcbAdapter, StaticRateSource, ECB_BASE_URL};

// Rate source trait and types
pub use data_source::{FetchRequest, RateSource, SourceError, SourceErrorKind};

// Derivation
pub use derive::{CrossPairDeriver, DeriveError, RATE_SCALE};

// Domain models
pub use domain::{
    CrossPairRate, CurrencyCode, CurrencyUniverse, LoadWindow, RateObservation, RateSeries,
    UtcDateTime,
};

// Error types
pub use error::ValidationError;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Pipeline
pub use pipeline::{
    FailureClass, LoadMode, PipelineConfig, PipelineError, PipelineFailure, PipelineRunner,
    PipelineState, RunReport,
};
pub use planner::LoadPlanner;

// Retry logic
pub use retry::{Backoff, RetryConfig, RetryingHttpClient};

pub use rows::RowBuilder;
pub use source::SourceId;
pub use writer::{WarehouseWriter, WriteError, WriteErrorKind, WriteSummary};

// Warehouse (re-exported from fxetl-warehouse)
pub use fxetl_warehouse::{
    LoadLogEntry, RateRecord, Warehouse, WarehouseConfig, WarehouseError, YtdChange,
};
