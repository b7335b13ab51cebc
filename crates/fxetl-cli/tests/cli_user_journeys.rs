//! User journeys through the `fxetl` binary against a stubbed ECB endpoint.

use std::path::Path;
use std::process::{Command, Output};

use mockito::{Matcher, Server, ServerGuard};
use serde_json::Value;
use tempfile::tempdir;

const ECB_DAILY: &str = include_str!("../../../tests/fixtures/ecb_exr_daily.json");

/// Runs `fxetl` with a clean environment rooted at `home`.
fn fxetl(home: &Path, ecb: &ServerGuard, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fxetl"))
        .args(args)
        .current_dir(home)
        .env_clear()
        .env("FXETL_HOME", home)
        .env("FXETL_CURRENCIES", "EUR,NOK,SEK")
        .env("FXETL_ECB_BASE_URL", ecb.url())
        .env("FXETL_HTTP_MAX_RETRIES", "0")
        .env("FXETL_HTTP_TIMEOUT_MS", "5000")
        .output()
        .expect("fxetl runs")
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json output")
}

fn ecb_path() -> Matcher {
    Matcher::Regex(String::from(r"^/D\."))
}

#[test]
fn user_runs_initial_load_then_reads_back_a_day() {
    // Given: an empty home and an ECB endpoint publishing two January days
    let home = tempdir().expect("tempdir");
    let mut ecb = Server::new();
    let published = ecb
        .mock("GET", ecb_path())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ECB_DAILY)
        .expect(1)
        .create();

    // When: the initial load runs as of Friday 2025-01-03
    let load = fxetl(home.path(), &ecb, &["initial-load", "--today", "2025-01-03"]);

    // Then: it succeeds with both days and six pairs each
    assert_eq!(load.status.code(), Some(0), "{}", String::from_utf8_lossy(&load.stderr));
    published.assert();
    let report = json(&load.stdout);
    assert_eq!(report["state"], "done");
    assert_eq!(report["rows_written"], 12);
    assert_eq!(report["dates_loaded"].as_array().map(Vec::len), Some(2));

    // And: the stored day can be read back, filtered by base currency
    let rates = fxetl(
        home.path(),
        &ecb,
        &["rates", "--date", "2025-01-03", "--base", "NOK"],
    );
    assert_eq!(rates.status.code(), Some(0));
    let rates = json(&rates.stdout);
    assert_eq!(rates["count"], 2);
    assert!(rates["rates"]
        .as_array()
        .expect("rates array")
        .iter()
        .all(|row| row["base_currency"] == "NOK" && row["data_source"] == "ECB"));
}

#[test]
fn weekend_daily_update_exits_with_no_data() {
    // Given: an ECB endpoint with nothing published for Saturday
    let home = tempdir().expect("tempdir");
    let mut ecb = Server::new();
    let _nothing = ecb
        .mock("GET", ecb_path())
        .with_status(404)
        .with_body("No results found.")
        .create();

    // When: the daily update runs on Saturday 2025-01-04
    let update = fxetl(home.path(), &ecb, &["daily-update", "--today", "2025-01-04"]);

    // Then: exit code 3, nothing on stdout, and a failure summary on stderr
    assert_eq!(update.status.code(), Some(3));
    assert!(update.stdout.is_empty());
    let summary = String::from_utf8_lossy(&update.stderr)
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<Value>(line).ok())
        .expect("failure summary on stderr");
    assert_eq!(summary["code"], "source.no_data_for_range");
    assert_eq!(summary["stage"], "fetching");
    assert_eq!(summary["retryable"], false);
    assert_eq!(summary["exit_code"], 3);
    assert_eq!(summary["committed_dates"], Value::Array(Vec::new()));
}

#[test]
fn universe_without_the_anchor_is_a_configuration_error() {
    let home = tempdir().expect("tempdir");
    let ecb = Server::new();

    let output = Command::new(env!("CARGO_BIN_EXE_fxetl"))
        .args(["daily-update", "--today", "2025-01-03"])
        .current_dir(home.path())
        .env_clear()
        .env("FXETL_HOME", home.path())
        .env("FXETL_CURRENCIES", "NOK,SEK")
        .env("FXETL_ECB_BASE_URL", ecb.url())
        .output()
        .expect("fxetl runs");

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}
