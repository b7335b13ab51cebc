//! Cross-pair derivation.
//!
//! Every ordered pair (A, B) of the universe is derived through the anchor:
//! `rate(A -> B) = rate(anchor -> B) / rate(anchor -> A)`, with the anchor's own
//! rate fixed at one. Rates and inverses are rounded half-to-even to
//! [`RATE_SCALE`] places so they survive the store's `DECIMAL(38, 18)` exactly.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use time::Date;

use crate::{CrossPairRate, CurrencyCode, CurrencyUniverse, RateSeries};

pub use fxetl_warehouse::RATE_SCALE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("incomplete rate set for {date}: missing {}", join_codes(.missing))]
    IncompleteRateSet {
        date: Date,
        missing: Vec<CurrencyCode>,
    },
    #[error("anchor rate for {currency} on {date} is not positive: {value}")]
    NonPositiveRate {
        date: Date,
        currency: CurrencyCode,
        value: Decimal,
    },
    #[error("rate {base}/{quote} on {date} cannot be represented at {} decimal places", RATE_SCALE)]
    Unrepresentable {
        date: Date,
        base: CurrencyCode,
        quote: CurrencyCode,
    },
}

impl DeriveError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncompleteRateSet { .. } => "derive.incomplete_rate_set",
            Self::NonPositiveRate { .. } => "derive.non_positive_rate",
            Self::Unrepresentable { .. } => "derive.unrepresentable",
        }
    }
}

fn join_codes(codes: &[CurrencyCode]) -> String {
    codes
        .iter()
        .map(CurrencyCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expands anchor-relative rates into the full cross-pair table.
#[derive(Debug, Clone)]
pub struct CrossPairDeriver {
    universe: CurrencyUniverse,
}

impl CrossPairDeriver {
    pub fn new(universe: CurrencyUniverse) -> Self {
        Self { universe }
    }

    pub fn universe(&self) -> &CurrencyUniverse {
        &self.universe
    }

    /// Derive all `n * (n - 1)` pairs for one date, ordered by (base, quote).
    ///
    /// `anchor_rates` maps quote currency to units per one anchor. Entries for
    /// currencies outside the universe, and any entry for the anchor itself,
    /// are ignored.
    pub fn derive(
        &self,
        date: Date,
        anchor_rates: &BTreeMap<CurrencyCode, Decimal>,
    ) -> Result<Vec<CrossPairRate>, DeriveError> {
        let anchor = self.universe.anchor();

        let missing: Vec<CurrencyCode> = self
            .universe
            .quoted()
            .filter(|code| !anchor_rates.contains_key(*code))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DeriveError::IncompleteRateSet { date, missing });
        }

        let mut per_anchor: BTreeMap<&CurrencyCode, Decimal> = BTreeMap::new();
        for code in self.universe.currencies() {
            let value = if code == anchor {
                Decimal::ONE
            } else {
                anchor_rates.get(code).copied().unwrap_or_default()
            };
            if value <= Decimal::ZERO {
                return Err(DeriveError::NonPositiveRate {
                    date,
                    currency: code.clone(),
                    value,
                });
            }
            per_anchor.insert(code, value);
        }

        let mut pairs = Vec::with_capacity(self.universe.pair_count());
        for (base, base_value) in &per_anchor {
            for (quote, quote_value) in &per_anchor {
                if base == quote {
                    continue;
                }
                pairs.push(cross_rate(date, base, *base_value, quote, *quote_value)?);
            }
        }
        Ok(pairs)
    }

    /// Derive every date of `series` independently, in date order.
    pub fn derive_all(&self, series: &RateSeries) -> Result<Vec<CrossPairRate>, DeriveError> {
        let mut all = Vec::with_capacity(series.dates().len() * self.universe.pair_count());
        for (date, anchor_rates) in series.by_date() {
            all.extend(self.derive(date, &anchor_rates)?);
        }
        Ok(all)
    }
}

fn cross_rate(
    date: Date,
    base: &CurrencyCode,
    base_value: Decimal,
    quote: &CurrencyCode,
    quote_value: Decimal,
) -> Result<CrossPairRate, DeriveError> {
    let unrepresentable = || DeriveError::Unrepresentable {
        date,
        base: base.clone(),
        quote: quote.clone(),
    };

    let exact = quote_value.checked_div(base_value).ok_or_else(unrepresentable)?;
    let inverse = base_value.checked_div(quote_value).ok_or_else(unrepresentable)?;
    let rate = round_rate(exact);
    let rate_inverse = round_rate(inverse);
    if rate <= Decimal::ZERO || rate_inverse <= Decimal::ZERO {
        return Err(unrepresentable());
    }

    Ok(CrossPairRate {
        date,
        base_currency: base.clone(),
        quote_currency: quote.clone(),
        rate,
        rate_inverse,
    })
}

fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointNearestEven)
}
