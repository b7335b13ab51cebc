use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// ISO 4217 alphabetic currency code, always three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalize a code to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.bytes().all(|byte| byte.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency {
                value: input.to_owned(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// The configured set of currencies, including the anchor every source rate
/// is quoted against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyUniverse {
    anchor: CurrencyCode,
    currencies: BTreeSet<CurrencyCode>,
}

impl CurrencyUniverse {
    /// Build a universe. The anchor must be listed among `currencies`, and at
    /// least two distinct currencies are required. Duplicates collapse.
    pub fn new(
        anchor: CurrencyCode,
        currencies: impl IntoIterator<Item = CurrencyCode>,
    ) -> Result<Self, ValidationError> {
        let currencies: BTreeSet<CurrencyCode> = currencies.into_iter().collect();
        if !currencies.contains(&anchor) {
            return Err(ValidationError::AnchorNotInUniverse { anchor });
        }
        if currencies.len() < 2 {
            return Err(ValidationError::UniverseTooSmall {
                count: currencies.len(),
            });
        }
        Ok(Self { anchor, currencies })
    }

    /// Parse a comma-separated list such as `"NOK,EUR,SEK"`.
    pub fn parse(anchor: &str, currencies: &str) -> Result<Self, ValidationError> {
        let anchor = CurrencyCode::parse(anchor)?;
        let currencies = currencies
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(CurrencyCode::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(anchor, currencies)
    }

    pub fn anchor(&self) -> &CurrencyCode {
        &self.anchor
    }

    /// All currencies in code order, anchor included.
    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.currencies.iter()
    }

    /// Currencies the source must quote against the anchor.
    pub fn quoted(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.currencies.iter().filter(move |code| **code != self.anchor)
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains(code)
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Number of ordered pairs derived per date: `n * (n - 1)`.
    pub fn pair_count(&self) -> usize {
        self.len() * (self.len() - 1)
    }
}
