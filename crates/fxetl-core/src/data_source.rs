//! Rate source trait and request/error types.
//!
//! A [`RateSource`] returns every published anchor-relative rate inside an
//! inclusive date range. Days the source does not publish are simply absent.
//!
//! | Failure | Kind | Retryable |
//! |---------|------|-----------|
//! | transport error, 408/429/500/502/503/504 | [`SourceErrorKind::Unavailable`] | yes |
//! | any other non-2xx except 404 | [`SourceErrorKind::Unavailable`] | no |
//! | malformed payload, null or non-positive rate, duplicate entry | [`SourceErrorKind::DataInvalid`] | no |
//! | nothing published in the range | [`SourceErrorKind::NoDataForRange`] | no |
//! | reversed or otherwise unusable request | [`SourceErrorKind::InvalidRequest`] | no |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use time::Date;

use crate::{CurrencyCode, LoadWindow, RateSeries, SourceId, ValidationError};

/// Inclusive date range to fetch. Only constructible with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    window: LoadWindow,
}

impl FetchRequest {
    pub fn new(start_date: Date, end_date: Date) -> Result<Self, SourceError> {
        let window = LoadWindow::new(start_date, end_date).map_err(|_| {
            SourceError::invalid_request(format!(
                "fetch start {start_date} is after end {end_date}"
            ))
        })?;
        Ok(Self { window })
    }

    pub fn start_date(&self) -> Date {
        self.window.start()
    }

    pub fn end_date(&self) -> Date {
        self.window.end()
    }

    pub fn window(&self) -> LoadWindow {
        self.window
    }
}

impl From<LoadWindow> for FetchRequest {
    fn from(window: LoadWindow) -> Self {
        Self { window }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Unavailable,
    DataInvalid,
    NoDataForRange,
    InvalidRequest,
}

/// Structured source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    /// A transient transport or upstream failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    /// An upstream refusal that will repeat on retry, such as a 400 or 403.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn data_invalid(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::DataInvalid,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn no_data(start_date: Date, end_date: Date) -> Self {
        Self {
            kind: SourceErrorKind::NoDataForRange,
            message: format!("no rates published between {start_date} and {end_date}"),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::DataInvalid => "source.data_invalid",
            SourceErrorKind::NoDataForRange => "source.no_data_for_range",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::data_invalid(error.to_string())
    }
}

/// Source adapter contract.
///
/// Implementations must be `Send + Sync`; the pipeline holds them behind an `Arc`.
pub trait RateSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// The currency every returned rate is quoted against.
    fn anchor(&self) -> &CurrencyCode;

    /// Fetch every published observation in the inclusive range.
    ///
    /// An empty result is reported as [`SourceErrorKind::NoDataForRange`],
    /// never as an empty series.
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RateSeries, SourceError>> + Send + 'a>>;
}
