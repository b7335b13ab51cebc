//! The two load entry points.

use std::sync::Arc;

use fxetl_core::{
    EcbAdapter, HttpClient, PipelineRunner, ReqwestHttpClient, RetryConfig, RetryingHttpClient,
    Warehouse,
};
use serde_json::Value;
use time::Date;

use crate::config::AppConfig;
use crate::error::CliError;

pub async fn initial(config: &AppConfig, today: Date) -> Result<Value, CliError> {
    let runner = build_runner(config)?;
    let report = runner.run_initial_load(today).await.map_err(Box::new)?;
    Ok(serde_json::to_value(report)?)
}

pub async fn daily(config: &AppConfig, today: Date) -> Result<Value, CliError> {
    let runner = build_runner(config)?;
    let report = runner.run_daily_update(today).await.map_err(Box::new)?;
    Ok(serde_json::to_value(report)?)
}

fn build_runner(config: &AppConfig) -> Result<PipelineRunner, CliError> {
    let http_client: Arc<dyn HttpClient> = Arc::new(RetryingHttpClient::new(
        ReqwestHttpClient::new(),
        RetryConfig::exponential(config.http_max_retries),
    ));
    let source = EcbAdapter::new(config.universe.clone(), http_client)?
        .with_base_url(config.ecb_base_url.clone())
        .with_timeout_ms(config.http_timeout_ms);
    let warehouse = Warehouse::open(config.warehouse.clone())?;

    Ok(PipelineRunner::new(
        config.pipeline_config()?,
        Arc::new(source),
        Arc::new(warehouse),
    )?)
}
