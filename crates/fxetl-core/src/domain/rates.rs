use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{CurrencyCode, ValidationError};

/// One published rate: units of `quote_currency` per one unit of the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateObservation {
    date: Date,
    base_currency: CurrencyCode,
    quote_currency: CurrencyCode,
    rate: Decimal,
}

impl RateObservation {
    pub fn new(
        date: Date,
        base_currency: CurrencyCode,
        quote_currency: CurrencyCode,
        rate: Decimal,
    ) -> Result<Self, ValidationError> {
        if base_currency == quote_currency {
            return Err(ValidationError::SelfQuote {
                currency: base_currency,
            });
        }
        if rate <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveRate {
                date,
                base: base_currency,
                quote: quote_currency,
                value: rate.to_string(),
            });
        }
        Ok(Self {
            date,
            base_currency,
            quote_currency,
            rate,
        })
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    pub fn quote_currency(&self) -> &CurrencyCode {
        &self.quote_currency
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }
}

/// Observations from one fetch, all anchored to the same currency, ordered by
/// (date, quote) with at most one entry per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateSeries {
    anchor: CurrencyCode,
    observations: Vec<RateObservation>,
}

impl RateSeries {
    /// Sort and check a batch of observations. A repeated (date, quote) or an
    /// observation based on another currency fails instead of being merged.
    pub fn new(
        anchor: CurrencyCode,
        mut observations: Vec<RateObservation>,
    ) -> Result<Self, ValidationError> {
        observations.sort_by(|left, right| {
            (left.date, &left.quote_currency).cmp(&(right.date, &right.quote_currency))
        });

        for observation in &observations {
            if observation.base_currency != anchor {
                return Err(ValidationError::ForeignBase {
                    date: observation.date,
                    quote: observation.quote_currency.clone(),
                    expected: anchor,
                    found: observation.base_currency.clone(),
                });
            }
        }
        for pair in observations.windows(2) {
            if pair[0].date == pair[1].date && pair[0].quote_currency == pair[1].quote_currency {
                return Err(ValidationError::DuplicateObservation {
                    date: pair[1].date,
                    quote: pair[1].quote_currency.clone(),
                });
            }
        }

        Ok(Self {
            anchor,
            observations,
        })
    }

    pub fn anchor(&self) -> &CurrencyCode {
        &self.anchor
    }

    pub fn observations(&self) -> &[RateObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct dates in ascending order.
    pub fn dates(&self) -> Vec<Date> {
        let mut dates: Vec<Date> = self.observations.iter().map(RateObservation::date).collect();
        dates.dedup();
        dates
    }

    /// Anchor-relative rates grouped by date.
    pub fn by_date(&self) -> BTreeMap<Date, BTreeMap<CurrencyCode, Decimal>> {
        let mut grouped: BTreeMap<Date, BTreeMap<CurrencyCode, Decimal>> = BTreeMap::new();
        for observation in &self.observations {
            grouped
                .entry(observation.date)
                .or_default()
                .insert(observation.quote_currency.clone(), observation.rate);
        }
        grouped
    }
}

/// A derived rate for one ordered pair on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossPairRate {
    pub date: Date,
    pub base_currency: CurrencyCode,
    pub quote_currency: CurrencyCode,
    /// Units of quote per one unit of base.
    pub rate: Decimal,
    pub rate_inverse: Decimal,
}
