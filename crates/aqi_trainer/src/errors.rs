use aqi_core::{ArtifactError, DatasetError, ModelError};
use thiserror::Error;

/// Errors returned by the offline trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("no trainable rows: {0}")]
    InsufficientData(String),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}
