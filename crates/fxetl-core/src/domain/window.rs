use std::fmt::{Display, Formatter};

use serde::Serialize;
use time::{Date, Duration};

use crate::ValidationError;

/// Inclusive date range processed by one pipeline run. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadWindow {
    start: Date,
    end: Date,
}

impl LoadWindow {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(date: Date) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Window from January 1 of `end`'s year through `end`.
    pub fn year_to_date(end: Date) -> Self {
        let start = end - Duration::days(i64::from(end.ordinal()) - 1);
        Self { start, end }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).whole_days() + 1
    }
}

impl Display for LoadWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
