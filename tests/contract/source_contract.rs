//! Rate source contract: what the pipeline may assume about any source.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fxetl_core::{
    CurrencyUniverse, EcbAdapter, FetchRequest, HttpClient, HttpError, HttpRequest,
    HttpResponse, RateObservation, RateSource, RetryConfig, RetryingHttpClient, SourceErrorKind,
    SourceId, StaticRateSource,
};
use fxetl_tests::{code, ECB_DAILY};
use rust_decimal_macros::dec;
use time::macros::date;

/// Replays scripted outcomes in order and records every request it sees.
#[derive(Default)]
struct RecordingHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    fn replying(outcomes: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("requests lock").push(request);
        let outcome = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::non_retryable("script exhausted")));
        Box::pin(async move { outcome })
    }
}

fn universe() -> CurrencyUniverse {
    CurrencyUniverse::parse("EUR", "NOK,EUR,SEK").expect("universe")
}

fn january_request() -> FetchRequest {
    FetchRequest::new(date!(2025 - 01 - 01), date!(2025 - 01 - 03)).expect("request")
}

fn ecb_with(client: Arc<RecordingHttpClient>) -> EcbAdapter {
    EcbAdapter::new(universe(), client)
        .expect("adapter")
        .with_base_url("https://ecb.test/service/data/EXR")
}

/// A one-series payload with the given observation value for NOK on 2025-01-02.
fn single_observation_payload(value: &str) -> String {
    format!(
        r#"{{
            "dataSets": [{{ "series": {{ "0:0:0:0:0": {{ "observations": {{ "0": [{value}] }} }} }} }}],
            "structure": {{ "dimensions": {{
                "series": [
                    {{ "id": "FREQ", "values": [{{ "id": "D" }}] }},
                    {{ "id": "CURRENCY", "values": [{{ "id": "NOK" }}] }},
                    {{ "id": "CURRENCY_DENOM", "values": [{{ "id": "EUR" }}] }},
                    {{ "id": "EXR_TYPE", "values": [{{ "id": "SP00" }}] }},
                    {{ "id": "EXR_SUFFIX", "values": [{{ "id": "A" }}] }}
                ],
                "observation": [{{ "id": "TIME_PERIOD", "values": [{{ "id": "2025-01-02" }}] }}]
            }} }}
        }}"#
    )
}

#[tokio::test]
async fn ecb_request_names_quoted_currencies_and_asks_for_json() {
    // Given: an ECB adapter over EUR, NOK and SEK
    let client = RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(ECB_DAILY))]);
    let adapter = ecb_with(client.clone()).with_timeout_ms(2_500);

    // When: a date range is fetched
    adapter.fetch(january_request()).await.expect("fetch");

    // Then: one request selects every non-anchor currency against EUR
    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "https://ecb.test/service/data/EXR/D.NOK+SEK.EUR.SP00.A?startPeriod=2025-01-01&endPeriod=2025-01-03"
    );
    assert_eq!(
        requests[0].headers.get("accept").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(requests[0].timeout_ms, 2_500);
    assert_eq!(adapter.id(), SourceId::Ecb);
    assert_eq!(adapter.anchor(), &code("EUR"));
}

#[tokio::test]
async fn ecb_payload_becomes_ordered_anchor_relative_observations() {
    // Given: a captured SDMX-JSON payload for two days
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        ECB_DAILY,
    ))]));

    // When: the range is fetched
    let series = adapter.fetch(january_request()).await.expect("fetch");

    // Then: every observation is EUR-based, exact, and sorted by (date, quote)
    assert_eq!(series.anchor(), &code("EUR"));
    assert_eq!(series.len(), 4);
    assert_eq!(series.dates(), vec![date!(2025 - 01 - 02), date!(2025 - 01 - 03)]);

    let first = &series.observations()[0];
    assert_eq!(first.date(), date!(2025 - 01 - 02));
    assert_eq!(first.base_currency(), &code("EUR"));
    assert_eq!(first.quote_currency(), &code("NOK"));
    assert_eq!(first.rate(), dec!(11.7895));

    let by_date = series.by_date();
    assert_eq!(by_date[&date!(2025 - 01 - 03)][&code("SEK")], dec!(11.5105));
}

#[tokio::test]
async fn not_found_means_nothing_was_published() {
    // Given: the upstream answers 404 for a weekend
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(
        HttpResponse::with_status(404, "No results found."),
    )]));
    let request = FetchRequest::new(date!(2025 - 01 - 04), date!(2025 - 01 - 05)).expect("request");

    // When / Then: the fetch fails as an empty range, never as an empty series
    let error = adapter.fetch(request).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::NoDataForRange);
    assert!(!error.retryable());
}

#[tokio::test]
async fn empty_data_sets_mean_nothing_was_published() {
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        r#"{"dataSets": [], "structure": {"dimensions": {"series": [], "observation": []}}}"#,
    ))]));

    let error = adapter.fetch(january_request()).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::NoDataForRange);
}

#[tokio::test]
async fn server_errors_are_retryable_and_client_errors_are_not() {
    // Given: one adapter facing a 503 and another facing a 400
    let overloaded = ecb_with(RecordingHttpClient::replying(vec![Ok(
        HttpResponse::with_status(503, "maintenance"),
    )]));
    let refused = ecb_with(RecordingHttpClient::replying(vec![Ok(
        HttpResponse::with_status(400, "Bad query"),
    )]));

    // When: both fetch
    let transient = overloaded.fetch(january_request()).await.expect_err("503");
    let permanent = refused.fetch(january_request()).await.expect_err("400");

    // Then: both are unavailability, only the 503 may be retried
    assert_eq!(transient.kind(), SourceErrorKind::Unavailable);
    assert!(transient.retryable());
    assert_eq!(permanent.kind(), SourceErrorKind::Unavailable);
    assert!(!permanent.retryable());
    assert!(permanent.message().contains("Bad query"));
}

#[tokio::test]
async fn transport_failures_keep_their_retry_flag() {
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Err(HttpError::new(
        "connection reset",
    ))]));

    let error = adapter.fetch(january_request()).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(error.retryable());
}

#[tokio::test]
async fn retrying_client_recovers_from_a_transient_status() {
    // Given: an upstream that fails once with 503 and then answers
    let client = RecordingHttpClient::replying(vec![
        Ok(HttpResponse::with_status(503, "maintenance")),
        Ok(HttpResponse::ok_json(ECB_DAILY)),
    ]);
    let retrying = RetryingHttpClient::new(client.clone(), RetryConfig::fixed(Duration::ZERO, 2));
    let adapter = EcbAdapter::new(universe(), Arc::new(retrying)).expect("adapter");

    // When: the range is fetched
    let series = adapter.fetch(january_request()).await.expect("fetch");

    // Then: the second attempt is used
    assert_eq!(series.len(), 4);
    assert_eq!(client.requests().len(), 2);
}

#[tokio::test]
async fn statuses_the_retry_layer_skips_are_not_retryable() {
    // Given: an upstream answering 501 behind a retrying client
    let client = RecordingHttpClient::replying(vec![
        Ok(HttpResponse::with_status(501, "Not Implemented")),
        Ok(HttpResponse::ok_json(ECB_DAILY)),
    ]);
    let retrying = RetryingHttpClient::new(client.clone(), RetryConfig::fixed(Duration::ZERO, 2));
    let adapter = EcbAdapter::new(universe(), Arc::new(retrying)).expect("adapter");

    // When: the range is fetched
    let error = adapter.fetch(january_request()).await.expect_err("must fail");

    // Then: one attempt was made and the failure does not invite a retry
    assert_eq!(client.requests().len(), 1);
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(!error.retryable());
}

#[tokio::test]
async fn null_rates_are_invalid_data() {
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        single_observation_payload("null"),
    ))]));

    let error = adapter.fetch(january_request()).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::DataInvalid);
    assert!(!error.retryable());
}

#[tokio::test]
async fn non_positive_rates_are_invalid_data() {
    for value in ["0", "-11.5"] {
        let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
            single_observation_payload(value),
        ))]));

        let error = adapter.fetch(january_request()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::DataInvalid, "value {value}");
    }
}

#[tokio::test]
async fn malformed_payloads_are_invalid_data() {
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        "<html>maintenance</html>",
    ))]));

    let error = adapter.fetch(january_request()).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::DataInvalid);
}

#[tokio::test]
async fn observations_outside_the_request_are_invalid_data() {
    // Given: a payload for 2025-01-02 answering a request for 2025-01-03 only
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        single_observation_payload("11.7895"),
    ))]));
    let request = FetchRequest::new(date!(2025 - 01 - 03), date!(2025 - 01 - 03)).expect("request");

    // When / Then
    let error = adapter.fetch(request).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::DataInvalid);
}

#[tokio::test]
async fn duplicate_observations_are_invalid_data() {
    // Given: two series that both resolve to NOK
    let payload = r#"{
        "dataSets": [{ "series": {
            "0:0:0:0:0": { "observations": { "0": [11.7895] } },
            "0:1:0:0:0": { "observations": { "0": [11.7900] } }
        } }],
        "structure": { "dimensions": {
            "series": [
                { "id": "FREQ", "values": [{ "id": "D" }] },
                { "id": "CURRENCY", "values": [{ "id": "NOK" }, { "id": "NOK" }] },
                { "id": "CURRENCY_DENOM", "values": [{ "id": "EUR" }] },
                { "id": "EXR_TYPE", "values": [{ "id": "SP00" }] },
                { "id": "EXR_SUFFIX", "values": [{ "id": "A" }] }
            ],
            "observation": [{ "id": "TIME_PERIOD", "values": [{ "id": "2025-01-02" }] }]
        } }
    }"#;
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        payload,
    ))]));

    // When / Then: the fetch fails instead of picking one
    let error = adapter.fetch(january_request()).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::DataInvalid);
}

#[tokio::test]
async fn foreign_denominated_series_are_invalid_data() {
    let payload = single_observation_payload("11.7895").replace(
        r#"{ "id": "CURRENCY_DENOM", "values": [{ "id": "EUR" }] }"#,
        r#"{ "id": "CURRENCY_DENOM", "values": [{ "id": "USD" }] }"#,
    );
    let adapter = ecb_with(RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(
        payload,
    ))]));

    let error = adapter.fetch(january_request()).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::DataInvalid);
}

#[tokio::test]
async fn static_source_serves_only_the_requested_window() {
    // Given: an in-memory source with rates on two days
    let observations = vec![
        RateObservation::new(date!(2025 - 01 - 02), code("EUR"), code("NOK"), dec!(11.7895))
            .expect("observation"),
        RateObservation::new(date!(2025 - 01 - 03), code("EUR"), code("NOK"), dec!(11.766))
            .expect("observation"),
    ];
    let source = StaticRateSource::new(code("EUR"), observations);

    // When: one day is requested, then a weekend
    let series = source
        .fetch(FetchRequest::new(date!(2025 - 01 - 03), date!(2025 - 01 - 03)).expect("request"))
        .await
        .expect("fetch");
    let weekend = source
        .fetch(FetchRequest::new(date!(2025 - 01 - 04), date!(2025 - 01 - 05)).expect("request"))
        .await
        .expect_err("must fail");

    // Then: only that day is served, and the empty weekend is an error
    assert_eq!(series.len(), 1);
    assert_eq!(series.observations()[0].rate(), dec!(11.766));
    assert_eq!(weekend.kind(), SourceErrorKind::NoDataForRange);
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(source.id(), SourceId::Static);
}

#[tokio::test]
async fn inverted_range_is_refused_before_any_source_sees_it() {
    // Given: sources that would answer any request
    let client = RecordingHttpClient::replying(vec![Ok(HttpResponse::ok_json(ECB_DAILY))]);
    let observations = vec![
        RateObservation::new(date!(2025 - 01 - 03), code("EUR"), code("NOK"), dec!(11.766))
            .expect("observation"),
    ];
    let source = StaticRateSource::new(code("EUR"), observations);

    // When: a request ends before it starts
    let error = FetchRequest::new(date!(2025 - 01 - 03), date!(2025 - 01 - 02))
        .expect_err("must fail");

    // Then: it is an invalid request and nothing was fetched
    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert_eq!(error.code(), "source.invalid_request");
    assert!(!error.retryable());
    assert!(client.requests().is_empty());
    assert_eq!(source.fetch_count(), 0);

    // And: the forward range over the same days is served
    let request = FetchRequest::new(date!(2025 - 01 - 02), date!(2025 - 01 - 03)).expect("request");
    assert_eq!(request.window().day_count(), 2);
    let series = source.fetch(request).await.expect("fetch");
    assert_eq!(series.len(), 1);
}
