use std::fmt::{Display, Formatter};

use fxetl_warehouse::{RateRecord, ReplaceFailure, Warehouse};
use serde::Serialize;
use time::Date;

/// Classification of a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteErrorKind {
    /// The rows themselves are unacceptable; retrying cannot help.
    Rejected,
    /// The store could not be reached or a transaction failed.
    StoreUnavailable,
}

/// A failed write. Dates committed before the failure stay committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteError {
    kind: WriteErrorKind,
    message: String,
    committed_dates: Vec<Date>,
}

impl WriteError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: WriteErrorKind::Rejected,
            message: message.into(),
            committed_dates: Vec::new(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: WriteErrorKind::StoreUnavailable,
            message: message.into(),
            committed_dates: Vec::new(),
        }
    }

    pub fn with_committed_dates(mut self, committed_dates: Vec<Date>) -> Self {
        self.committed_dates = committed_dates;
        self
    }

    pub const fn kind(&self) -> WriteErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn committed_dates(&self) -> &[Date] {
        &self.committed_dates
    }

    pub const fn retryable(&self) -> bool {
        matches!(self.kind, WriteErrorKind::StoreUnavailable)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            WriteErrorKind::Rejected => "write.rejected",
            WriteErrorKind::StoreUnavailable => "write.store_unavailable",
        }
    }
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for WriteError {}

impl From<ReplaceFailure> for WriteError {
    fn from(failure: ReplaceFailure) -> Self {
        let error = if failure.source.is_rejection() {
            Self::rejected(failure.source.to_string())
        } else {
            Self::store_unavailable(failure.source.to_string())
        };
        error.with_committed_dates(failure.committed_dates)
    }
}

/// Rows persisted by one successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub dates: Vec<Date>,
    pub rows_written: usize,
}

/// Persists whole dates of rows with replace semantics.
///
/// For every date present in `rows`, the stored rows of that date are
/// replaced by exactly the given set. Writing the same rows twice leaves the
/// same final state as writing them once.
pub trait WarehouseWriter: Send + Sync {
    fn write(&self, run_id: &str, rows: &[RateRecord]) -> Result<WriteSummary, WriteError>;
}

impl WarehouseWriter for Warehouse {
    fn write(&self, run_id: &str, rows: &[RateRecord]) -> Result<WriteSummary, WriteError> {
        let report = self.replace_dates(run_id, rows)?;
        Ok(WriteSummary {
            dates: report.dates,
            rows_written: report.rows_written,
        })
    }
}
