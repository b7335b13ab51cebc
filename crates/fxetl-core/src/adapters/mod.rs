//! Rate source adapters.

pub mod ecb;
pub mod static_source;

pub use ecb::{EcbAdapter, ECB_BASE_URL};
pub use static_source::StaticRateSource;
