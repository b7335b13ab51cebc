use thiserror::Error;
use time::Date;

use crate::CurrencyCode;

/// Construction-time validation failures for domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("currency universe needs at least two currencies, got {count}")]
    UniverseTooSmall { count: usize },
    #[error("anchor currency {anchor} is not part of the currency universe")]
    AnchorNotInUniverse { anchor: CurrencyCode },
    #[error("source is anchored to {source_anchor}, configuration expects {configured}")]
    AnchorMismatch {
        configured: CurrencyCode,
        source_anchor: CurrencyCode,
    },

    #[error("rate for {base}/{quote} on {date} must be greater than zero, got {value}")]
    NonPositiveRate {
        date: Date,
        base: CurrencyCode,
        quote: CurrencyCode,
        value: String,
    },
    #[error("observation base and quote are both {currency}")]
    SelfQuote { currency: CurrencyCode },
    #[error("duplicate observation for {quote} on {date}")]
    DuplicateObservation { date: Date, quote: CurrencyCode },
    #[error("observation for {quote} on {date} is based on {found}, series anchor is {expected}")]
    ForeignBase {
        date: Date,
        quote: CurrencyCode,
        expected: CurrencyCode,
        found: CurrencyCode,
    },

    #[error("load window start {start} is after end {end}")]
    InvertedWindow { start: Date, end: Date },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("source tag must not be empty")]
    EmptySourceTag,
    #[error("invalid source '{value}', expected one of ecb, static")]
    UnknownSource { value: String },
    #[error("{adapter} only publishes rates against {supported}, not {requested}")]
    UnsupportedAnchor {
        adapter: &'static str,
        supported: CurrencyCode,
        requested: CurrencyCode,
    },
}
