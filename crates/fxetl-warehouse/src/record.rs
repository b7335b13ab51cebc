use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, OffsetDateTime};

/// Fractional digits stored by the `DECIMAL(38, 18)` rate columns.
pub const RATE_SCALE: u32 = 18;

/// `DECIMAL(38, 18)` leaves 20 integer digits.
const MAX_INTEGER_DIGITS: u32 = 20;

/// One stored exchange rate: the unit written to and read from
/// `fact_exchange_rates`.
///
/// At most one record exists per (`exchange_date`, `base_currency`,
/// `quote_currency`) after a replace completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateRecord {
    pub exchange_date: Date,
    pub base_currency: String,
    pub quote_currency: String,
    /// Units of quote currency bought by one unit of base currency.
    pub rate: Decimal,
    pub rate_inverse: Decimal,
    pub data_source: String,
    /// UTC, whole seconds.
    #[serde(with = "time::serde::rfc3339")]
    pub load_timestamp: OffsetDateTime,
}

impl RateRecord {
    /// Check that the record can be stored exactly as given.
    ///
    /// Returns the rejection reason on failure.
    pub fn check_storable(&self) -> Result<(), String> {
        check_currency_code("base_currency", &self.base_currency)?;
        check_currency_code("quote_currency", &self.quote_currency)?;
        if self.base_currency == self.quote_currency {
            return Err(format!(
                "base and quote currency are both {}",
                self.base_currency
            ));
        }
        check_rate("rate", self.rate)?;
        check_rate("rate_inverse", self.rate_inverse)?;
        check_reciprocal(self.rate, self.rate_inverse)?;
        if self.data_source.trim().is_empty() {
            return Err(String::from("data_source must not be empty"));
        }
        if self.load_timestamp.offset() != time::UtcOffset::UTC {
            return Err(String::from("load_timestamp must be in UTC"));
        }
        if self.load_timestamp.nanosecond() != 0 {
            return Err(String::from(
                "load_timestamp must have whole-second precision",
            ));
        }
        Ok(())
    }

    pub(crate) fn sort_key(&self) -> (Date, &str, &str) {
        (
            self.exchange_date,
            self.base_currency.as_str(),
            self.quote_currency.as_str(),
        )
    }
}

fn check_currency_code(field: &str, value: &str) -> Result<(), String> {
    if value.len() == 3 && value.bytes().all(|byte| byte.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(format!(
            "{field} '{value}' is not a 3-letter uppercase currency code"
        ))
    }
}

/// Both sides are rounded to [`RATE_SCALE`] places, so their product may miss
/// one by at most `(rate + rate_inverse) * 10^-18`.
fn check_reciprocal(rate: Decimal, rate_inverse: Decimal) -> Result<(), String> {
    let tolerance = (rate + rate_inverse) * Decimal::new(1, RATE_SCALE);
    match rate.checked_mul(rate_inverse) {
        Some(product) if (product - Decimal::ONE).abs() <= tolerance => Ok(()),
        _ => Err(format!(
            "rate_inverse {rate_inverse} is not the reciprocal of rate {rate}"
        )),
    }
}

fn check_rate(field: &str, value: Decimal) -> Result<(), String> {
    if value <= Decimal::ZERO {
        return Err(format!("{field} must be greater than zero, got {value}"));
    }
    if value.normalize().scale() > RATE_SCALE {
        return Err(format!(
            "{field} {value} has more than {RATE_SCALE} fractional digits"
        ));
    }
    let integer_digits = value.trunc().normalize().to_string().trim_start_matches('0').len();
    if integer_digits as u32 > MAX_INTEGER_DIGITS {
        return Err(format!(
            "{field} {value} has more than {MAX_INTEGER_DIGITS} integer digits"
        ));
    }
    Ok(())
}

/// Year-to-date movement of one pair, read from `vw_fx_ytd_change`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YtdChange {
    pub year: i32,
    pub base_currency: String,
    pub quote_currency: String,
    pub first_date: Date,
    pub last_date: Date,
    pub first_rate: Decimal,
    pub last_rate: Decimal,
    /// Percentage change from `first_rate` to `last_rate`, six decimal places.
    pub change_pct: Decimal,
}

/// One row of the `load_log` audit table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadLogEntry {
    pub run_id: String,
    pub exchange_date: Date,
    pub rows_written: u64,
    pub data_source: String,
    #[serde(with = "time::serde::rfc3339")]
    pub load_timestamp: OffsetDateTime,
}
