//! # Domain Models
//!
//! Validated value types shared by the source adapters, the deriver and the
//! pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CurrencyCode`] | Validated ISO 4217 code |
//! | [`CurrencyUniverse`] | Configured currencies plus the anchor |
//! | [`RateObservation`] | One anchor-relative rate as published |
//! | [`RateSeries`] | Ordered, duplicate-free observations from one fetch |
//! | [`CrossPairRate`] | Derived rate for one ordered pair |
//! | [`LoadWindow`] | Inclusive date range for one run |
//! | [`UtcDateTime`] | Second-precision UTC timestamp |

mod currency;
mod rates;
mod timestamp;
mod window;

pub use currency::{CurrencyCode, CurrencyUniverse};
pub use rates::{CrossPairRate, RateObservation, RateSeries};
pub use timestamp::UtcDateTime;
pub use window::LoadWindow;
