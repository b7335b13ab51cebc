use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data_source::{FetchRequest, RateSource, SourceError};
use crate::{CurrencyCode, RateObservation, RateSeries, SourceId};

/// Serves a fixed set of observations from memory.
///
/// Used for offline runs and replaying captured rates. Duplicate observations
/// are kept as given and surface as invalid data on fetch, the same way a
/// misbehaving upstream would.
#[derive(Debug)]
pub struct StaticRateSource {
    anchor: CurrencyCode,
    observations: Vec<RateObservation>,
    failure: Option<SourceError>,
    fetches: AtomicUsize,
}

impl StaticRateSource {
    pub fn new(anchor: CurrencyCode, observations: Vec<RateObservation>) -> Self {
        Self {
            anchor,
            observations,
            failure: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails with `error`.
    pub fn failing(anchor: CurrencyCode, error: SourceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(anchor, Vec::new())
        }
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn serve(&self, request: FetchRequest) -> Result<RateSeries, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let window = request.window();
        let selected: Vec<RateObservation> = self
            .observations
            .iter()
            .filter(|observation| window.contains(observation.date()))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(SourceError::no_data(request.start_date(), request.end_date()));
        }

        Ok(RateSeries::new(self.anchor.clone(), selected)?)
    }
}

impl RateSource for StaticRateSource {
    fn id(&self) -> SourceId {
        SourceId::Static
    }

    fn anchor(&self) -> &CurrencyCode {
        &self.anchor
    }

    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RateSeries, SourceError>> + Send + 'a>> {
        let result = self.serve(request);
        Box::pin(async move { result })
    }
}
