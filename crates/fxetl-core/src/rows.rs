use fxetl_warehouse::RateRecord;

use crate::{CrossPairRate, UtcDateTime};

/// Shape one derived pair into a warehouse row.
pub fn build(pair: &CrossPairRate, load_timestamp: UtcDateTime, source_tag: &str) -> RateRecord {
    RateRecord {
        exchange_date: pair.date,
        base_currency: pair.base_currency.to_string(),
        quote_currency: pair.quote_currency.to_string(),
        rate: pair.rate,
        rate_inverse: pair.rate_inverse,
        data_source: source_tag.to_owned(),
        load_timestamp: load_timestamp.into_inner(),
    }
}

/// Stamps every row of one run with the same source tag and load timestamp.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    source_tag: String,
    load_timestamp: UtcDateTime,
}

impl RowBuilder {
    pub fn new(source_tag: impl Into<String>, load_timestamp: UtcDateTime) -> Self {
        Self {
            source_tag: source_tag.into(),
            load_timestamp,
        }
    }

    pub fn load_timestamp(&self) -> UtcDateTime {
        self.load_timestamp
    }

    pub fn build(&self, pair: &CrossPairRate) -> RateRecord {
        build(pair, self.load_timestamp, &self.source_tag)
    }

    pub fn build_all(&self, pairs: &[CrossPairRate]) -> Vec<RateRecord> {
        pairs.iter().map(|pair| self.build(pair)).collect()
    }
}
