//! Analytical views over `fact_exchange_rates`.

use ::duckdb::Connection;

/// Create or refresh the analytical views.
///
/// - `vw_fx_latest`: every pair for the most recent loaded date
/// - `vw_fx_ytd_change`: first and latest rate per pair and calendar year,
///   with the percentage change between them as `DECIMAL(38, 6)`
///
/// DuckDB divides decimals in floating point, so the change is taken as
/// `(last - first) * 100 * first_inverse` and stays decimal throughout.
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_fx_latest AS
SELECT
    exchange_date,
    base_currency,
    quote_currency,
    rate,
    rate_inverse,
    data_source,
    load_timestamp
FROM fact_exchange_rates
WHERE exchange_date = (SELECT MAX(exchange_date) FROM fact_exchange_rates);

CREATE OR REPLACE VIEW vw_fx_ytd_change AS
WITH bounds AS (
    SELECT
        YEAR(exchange_date) AS year,
        base_currency,
        quote_currency,
        MIN(exchange_date) AS first_date,
        MAX(exchange_date) AS last_date
    FROM fact_exchange_rates
    GROUP BY YEAR(exchange_date), base_currency, quote_currency
)
SELECT
    b.year,
    b.base_currency,
    b.quote_currency,
    b.first_date,
    b.last_date,
    f.rate AS first_rate,
    l.rate AS last_rate,
    CAST(
        CAST((l.rate - f.rate) * 100 AS DECIMAL(38, 14))
            * CAST(f.rate_inverse AS DECIMAL(38, 14))
        AS DECIMAL(38, 6)
    ) AS change_pct
FROM bounds b
JOIN fact_exchange_rates f
    ON f.base_currency = b.base_currency
    AND f.quote_currency = b.quote_currency
    AND f.exchange_date = b.first_date
JOIN fact_exchange_rates l
    ON l.base_currency = b.base_currency
    AND l.quote_currency = b.quote_currency
    AND l.exchange_date = b.last_date;
",
    )?;

    Ok(())
}
