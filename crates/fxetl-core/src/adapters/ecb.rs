//! European Central Bank reference-rate adapter.
//!
//! Reads the ECB Data Portal SDMX-JSON API, e.g.
//! `EXR/D.NOK+SEK.EUR.SP00.A?startPeriod=2025-01-01&endPeriod=2025-01-31`.
//! Every series is one currency against the euro, and every observation is
//! keyed by an index into the `TIME_PERIOD` dimension.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::data_source::{FetchRequest, RateSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::retry::is_transient_status;
use crate::{
    CurrencyCode, CurrencyUniverse, RateObservation, RateSeries, SourceId, ValidationError,
};

pub const ECB_BASE_URL: &str = "https://data-api.ecb.europa.eu/service/data/EXR";
const ECB_ANCHOR: &str = "EUR";
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// ECB daily reference rates, always quoted against EUR.
#[derive(Clone)]
pub struct EcbAdapter {
    universe: CurrencyUniverse,
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl EcbAdapter {
    /// Build an adapter for `universe`. The universe must be anchored to EUR.
    pub fn new(
        universe: CurrencyUniverse,
        http_client: Arc<dyn HttpClient>,
    ) -> Result<Self, ValidationError> {
        let supported = CurrencyCode::parse(ECB_ANCHOR)?;
        if universe.anchor() != &supported {
            return Err(ValidationError::UnsupportedAnchor {
                adapter: "ecb",
                supported,
                requested: universe.anchor().clone(),
            });
        }
        Ok(Self {
            universe,
            http_client,
            base_url: String::from(ECB_BASE_URL),
            timeout_ms: 10_000,
        })
    }

    /// Adapter with no network access; every fetch reports no data.
    pub fn offline(universe: CurrencyUniverse) -> Result<Self, ValidationError> {
        Self::new(universe, Arc::new(NoopHttpClient))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// The URL fetched for `request`.
    pub fn request_url(&self, request: &FetchRequest) -> String {
        let currencies = self
            .universe
            .quoted()
            .map(CurrencyCode::as_str)
            .collect::<Vec<_>>()
            .join("+");
        format!(
            "{}/D.{}.{}.SP00.A?startPeriod={}&endPeriod={}",
            self.base_url,
            currencies,
            self.universe.anchor(),
            request.start_date(),
            request.end_date()
        )
    }

    async fn fetch_series(&self, request: FetchRequest) -> Result<RateSeries, SourceError> {
        let url = self.request_url(&request);
        tracing::debug!(%url, "requesting ECB reference rates");

        let http_request = HttpRequest::get(url.as_str())
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(http_request).await.map_err(|e| {
            let message = format!("ecb transport error: {}", e.message());
            if e.retryable() {
                SourceError::unavailable(message)
            } else {
                SourceError::rejected(message)
            }
        })?;

        match response.status {
            status if (200..300).contains(&status) => {}
            404 => return Err(SourceError::no_data(request.start_date(), request.end_date())),
            status if is_transient_status(status) => {
                return Err(SourceError::unavailable(format!(
                    "ecb returned status {status}"
                )))
            }
            status => {
                return Err(SourceError::rejected(format!(
                    "ecb returned status {status}: {}",
                    snippet(&response.body)
                )))
            }
        }

        let observations = parse_payload(&response.body, self.universe.anchor(), &request)?;
        if observations.is_empty() {
            return Err(SourceError::no_data(request.start_date(), request.end_date()));
        }

        let series = RateSeries::new(self.universe.anchor().clone(), observations)?;
        tracing::info!(
            observations = series.len(),
            dates = series.dates().len(),
            start = %request.start_date(),
            end = %request.end_date(),
            "fetched ECB reference rates"
        );
        Ok(series)
    }
}

impl RateSource for EcbAdapter {
    fn id(&self) -> SourceId {
        SourceId::Ecb
    }

    fn anchor(&self) -> &CurrencyCode {
        self.universe.anchor()
    }

    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RateSeries, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_series(request))
    }
}

#[derive(Debug, Deserialize)]
struct SdmxMessage {
    #[serde(rename = "dataSets", default)]
    data_sets: Vec<SdmxDataSet>,
    structure: SdmxStructure,
}

#[derive(Debug, Deserialize)]
struct SdmxDataSet {
    #[serde(default)]
    series: BTreeMap<String, SdmxSeries>,
}

#[derive(Debug, Deserialize)]
struct SdmxSeries {
    #[serde(default)]
    observations: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SdmxStructure {
    dimensions: SdmxDimensions,
}

#[derive(Debug, Deserialize)]
struct SdmxDimensions {
    #[serde(default)]
    series: Vec<SdmxDimension>,
    #[serde(default)]
    observation: Vec<SdmxDimension>,
}

#[derive(Debug, Deserialize)]
struct SdmxDimension {
    id: String,
    #[serde(default)]
    values: Vec<SdmxDimensionValue>,
}

#[derive(Debug, Deserialize)]
struct SdmxDimensionValue {
    id: String,
}

impl SdmxDimension {
    fn value_at(&self, index: usize) -> Result<&str, SourceError> {
        self.values
            .get(index)
            .map(|value| value.id.as_str())
            .ok_or_else(|| {
                SourceError::data_invalid(format!(
                    "index {index} is out of range for dimension {}",
                    self.id
                ))
            })
    }
}

fn find_dimension<'a>(
    dimensions: &'a [SdmxDimension],
    id: &str,
) -> Option<(usize, &'a SdmxDimension)> {
    dimensions
        .iter()
        .enumerate()
        .find(|(_, dimension)| dimension.id == id)
}

fn parse_payload(
    body: &str,
    anchor: &CurrencyCode,
    request: &FetchRequest,
) -> Result<Vec<RateObservation>, SourceError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let message: SdmxMessage = serde_json::from_str(body)
        .map_err(|e| SourceError::data_invalid(format!("malformed ECB payload: {e}")))?;
    let Some(data_set) = message.data_sets.first() else {
        return Ok(Vec::new());
    };

    let dimensions = &message.structure.dimensions;
    let (currency_position, currency_dimension) = find_dimension(&dimensions.series, "CURRENCY")
        .ok_or_else(|| SourceError::data_invalid("ECB payload has no CURRENCY dimension"))?;
    let denominator = find_dimension(&dimensions.series, "CURRENCY_DENOM");
    let (time_position, time_dimension) = find_dimension(&dimensions.observation, "TIME_PERIOD")
        .ok_or_else(|| SourceError::data_invalid("ECB payload has no TIME_PERIOD dimension"))?;

    let mut observations = Vec::new();
    for (series_key, series) in &data_set.series {
        let key = parse_key(series_key)?;
        let currency_id =
            currency_dimension.value_at(key_part(&key, currency_position, series_key)?)?;
        let currency = CurrencyCode::parse(currency_id)?;

        if let Some((position, dimension)) = denominator {
            let denominated = dimension.value_at(key_part(&key, position, series_key)?)?;
            if denominated != anchor.as_str() {
                return Err(SourceError::data_invalid(format!(
                    "series {series_key} is denominated in {denominated}, expected {anchor}"
                )));
            }
        }

        for (observation_key, values) in &series.observations {
            let observation_index = parse_key(observation_key)?;
            let period = time_dimension.value_at(key_part(
                &observation_index,
                time_position,
                observation_key,
            )?)?;
            let date = Date::parse(period, DATE_FORMAT).map_err(|e| {
                SourceError::data_invalid(format!("unparseable TIME_PERIOD '{period}': {e}"))
            })?;
            if !request.window().contains(date) {
                return Err(SourceError::data_invalid(format!(
                    "observation date {date} is outside the requested range"
                )));
            }

            let rate = parse_rate(values.first()).map_err(|reason| {
                SourceError::data_invalid(format!("{currency} on {date}: {reason}"))
            })?;
            observations.push(RateObservation::new(
                date,
                anchor.clone(),
                currency.clone(),
                rate,
            )?);
        }
    }

    Ok(observations)
}

fn parse_key(key: &str) -> Result<Vec<usize>, SourceError> {
    key.split(':')
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| SourceError::data_invalid(format!("malformed SDMX key '{key}'")))
        })
        .collect()
}

fn key_part(parts: &[usize], position: usize, key: &str) -> Result<usize, SourceError> {
    parts.get(position).copied().ok_or_else(|| {
        SourceError::data_invalid(format!("SDMX key '{key}' has no position {position}"))
    })
}

/// Read a rate from its JSON decimal text so no binary rounding is introduced.
fn parse_rate(value: Option<&Value>) -> Result<Decimal, String> {
    let text = match value {
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::String(text)) => text.trim().to_owned(),
        Some(Value::Null) | None => return Err(String::from("rate is null")),
        Some(other) => return Err(format!("rate is not a number: {other}")),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| format!("rate '{text}' is not a decimal number"))
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
