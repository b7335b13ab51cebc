//! Load pipeline.
//!
//! One run walks `Idle → Fetching → Deriving → Writing → Done`. Any failure
//! moves the run to `Failed` and stops it; nothing is retried here and no
//! write happens beyond what the writer already committed.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::data_source::{FetchRequest, RateSource, SourceError, SourceErrorKind};
use crate::derive::{CrossPairDeriver, DeriveError};
use crate::planner::LoadPlanner;
use crate::rows::RowBuilder;
use crate::writer::{WarehouseWriter, WriteError, WriteErrorKind};
use crate::{CurrencyUniverse, LoadWindow, UtcDateTime, ValidationError};

/// Everything the pipeline needs to know about the deployment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    universe: CurrencyUniverse,
    source_tag: String,
}

impl PipelineConfig {
    pub fn new(
        universe: CurrencyUniverse,
        source_tag: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let source_tag = source_tag.into();
        if source_tag.trim().is_empty() {
            return Err(ValidationError::EmptySourceTag);
        }
        Ok(Self {
            universe,
            source_tag,
        })
    }

    pub fn universe(&self) -> &CurrencyUniverse {
        &self.universe
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }
}

/// Which entry point started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    Initial,
    Daily,
}

impl LoadMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Daily => "daily",
        }
    }
}

impl Display for LoadMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Fetching,
    Deriving,
    Writing,
    Done,
    Failed,
}

impl PipelineState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Deriving => "deriving",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Idle, Self::Fetching)
            | (Self::Fetching, Self::Deriving)
            | (Self::Deriving, Self::Writing)
            | (Self::Writing, Self::Done) => true,
            (current, Self::Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classes used to pick the CLI exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    NoDataForRange,
    DataQuality,
    SourceUnavailable,
    InvalidRequest,
    WriteRejected,
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Source(error) => error.code(),
            Self::Derive(error) => error.code(),
            Self::Write(error) => error.code(),
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            Self::Source(error) => error.retryable(),
            Self::Derive(_) => false,
            Self::Write(error) => error.retryable(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            Self::Source(error) => match error.kind() {
                SourceErrorKind::Unavailable => FailureClass::SourceUnavailable,
                SourceErrorKind::DataInvalid => FailureClass::DataQuality,
                SourceErrorKind::NoDataForRange => FailureClass::NoDataForRange,
                SourceErrorKind::InvalidRequest => FailureClass::InvalidRequest,
            },
            Self::Derive(_) => FailureClass::DataQuality,
            Self::Write(error) => match error.kind() {
                WriteErrorKind::Rejected => FailureClass::WriteRejected,
                WriteErrorKind::StoreUnavailable => FailureClass::StoreUnavailable,
            },
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: LoadMode,
    pub window: LoadWindow,
    pub observations: usize,
    pub dates_loaded: Vec<Date>,
    pub rows_written: usize,
    pub load_timestamp: UtcDateTime,
    pub state: PipelineState,
    pub transitions: Vec<PipelineState>,
    pub elapsed_ms: u64,
}

/// Outcome of a failed run.
#[derive(Debug, Clone, Error)]
#[error("{mode} run {run_id} failed while {failed_at}: {error}")]
pub struct PipelineFailure {
    pub run_id: String,
    pub mode: LoadMode,
    pub window: LoadWindow,
    /// The stage that was active when the run failed.
    pub failed_at: PipelineState,
    #[source]
    pub error: PipelineError,
    /// Dates the writer committed before failing. Empty unless the write stage failed.
    pub committed_dates: Vec<Date>,
    pub transitions: Vec<PipelineState>,
}

impl PipelineFailure {
    pub fn code(&self) -> &'static str {
        self.error.code()
    }

    pub fn retryable(&self) -> bool {
        self.error.retryable()
    }
}

struct StateTracker<'a> {
    run_id: &'a str,
    current: PipelineState,
    transitions: Vec<PipelineState>,
}

impl<'a> StateTracker<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            current: PipelineState::Idle,
            transitions: vec![PipelineState::Idle],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            self.current,
            next
        );
        tracing::info!(run_id = self.run_id, from = %self.current, to = %next, "pipeline stage");
        self.current = next;
        self.transitions.push(next);
    }
}

/// Runs fetch, derive and write for one invocation.
pub struct PipelineRunner {
    config: PipelineConfig,
    source: Arc<dyn RateSource>,
    writer: Arc<dyn WarehouseWriter>,
    planner: LoadPlanner,
    deriver: CrossPairDeriver,
}

impl PipelineRunner {
    /// Fails when the source is anchored to a different currency than the
    /// configured universe.
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn RateSource>,
        writer: Arc<dyn WarehouseWriter>,
    ) -> Result<Self, ValidationError> {
        if source.anchor() != config.universe().anchor() {
            return Err(ValidationError::AnchorMismatch {
                configured: config.universe().anchor().clone(),
                source_anchor: source.anchor().clone(),
            });
        }
        let deriver = CrossPairDeriver::new(config.universe().clone());
        Ok(Self {
            config,
            source,
            writer,
            planner: LoadPlanner,
            deriver,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load January 1 of `today`'s year through `today`.
    pub async fn run_initial_load(&self, today: Date) -> Result<RunReport, PipelineFailure> {
        let window = self.planner.plan_initial(today);
        self.run(LoadMode::Initial, window).await
    }

    /// Load `today` only.
    pub async fn run_daily_update(&self, today: Date) -> Result<RunReport, PipelineFailure> {
        let window = self.planner.plan_incremental(today);
        self.run(LoadMode::Daily, window).await
    }

    async fn run(&self, mode: LoadMode, window: LoadWindow) -> Result<RunReport, PipelineFailure> {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut tracker = StateTracker::new(&run_id);
        tracing::info!(
            run_id = %run_id,
            %mode,
            %window,
            source = %self.source.id(),
            "pipeline run started"
        );

        tracker.advance(PipelineState::Fetching);
        let series = match self.source.fetch(FetchRequest::from(window)).await {
            Ok(series) if series.anchor() != self.config.universe().anchor() => {
                let error = SourceError::data_invalid(format!(
                    "source returned rates against {}, expected {}",
                    series.anchor(),
                    self.config.universe().anchor()
                ));
                return Err(fail_run(tracker, mode, window, error.into(), Vec::new()));
            }
            Ok(series) => series,
            Err(error) => return Err(fail_run(tracker, mode, window, error.into(), Vec::new())),
        };
        let observations = series.len();

        tracker.advance(PipelineState::Deriving);
        let pairs = match self.deriver.derive_all(&series) {
            Ok(pairs) => pairs,
            Err(error) => return Err(fail_run(tracker, mode, window, error.into(), Vec::new())),
        };
        tracing::debug!(
            run_id = %run_id,
            dates = series.dates().len(),
            pairs = pairs.len(),
            "cross pairs derived"
        );

        tracker.advance(PipelineState::Writing);
        let load_timestamp = UtcDateTime::now();
        let rows = RowBuilder::new(self.config.source_tag(), load_timestamp).build_all(&pairs);
        let summary = match self.writer.write(&run_id, &rows) {
            Ok(summary) => summary,
            Err(error) => {
                let committed = error.committed_dates().to_vec();
                return Err(fail_run(tracker, mode, window, error.into(), committed));
            }
        };

        tracker.advance(PipelineState::Done);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            run_id = %run_id,
            %mode,
            dates = summary.dates.len(),
            rows = summary.rows_written,
            elapsed_ms,
            "pipeline run finished"
        );

        let StateTracker {
            current,
            transitions,
            ..
        } = tracker;
        Ok(RunReport {
            run_id,
            mode,
            window,
            observations,
            dates_loaded: summary.dates,
            rows_written: summary.rows_written,
            load_timestamp,
            state: current,
            transitions,
            elapsed_ms,
        })
    }
}

fn fail_run(
    mut tracker: StateTracker<'_>,
    mode: LoadMode,
    window: LoadWindow,
    error: PipelineError,
    committed_dates: Vec<Date>,
) -> PipelineFailure {
    let failed_at = tracker.current;
    tracing::error!(
        run_id = tracker.run_id,
        stage = %failed_at,
        code = error.code(),
        retryable = error.retryable(),
        committed = committed_dates.len(),
        %error,
        "pipeline run failed"
    );
    tracker.advance(PipelineState::Failed);
    PipelineFailure {
        run_id: tracker.run_id.to_owned(),
        mode,
        window,
        failed_at,
        error,
        committed_dates,
        transitions: tracker.transitions,
    }
}
