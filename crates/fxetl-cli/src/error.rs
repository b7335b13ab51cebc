use fxetl_core::{FailureClass, PipelineFailure, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] fxetl_core::ValidationError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Pipeline(#[from] Box<PipelineFailure>),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Pipeline(failure) => match failure.error.class() {
                FailureClass::InvalidRequest => 2,
                FailureClass::NoDataForRange => 3,
                FailureClass::DataQuality => 4,
                FailureClass::WriteRejected => 5,
                FailureClass::StoreUnavailable => 6,
                FailureClass::SourceUnavailable => 7,
            },
            Self::Warehouse(error) if error.is_rejection() => 2,
            Self::Warehouse(_) => 6,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
