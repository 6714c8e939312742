//! Error types for the AQI core

use std::path::PathBuf;
use thiserror::Error;

use crate::serde_canon::CanonicalError;

/// Errors raised while loading the historical dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The file could not be opened or read
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column the dashboard depends on is absent from the header
    #[error("dataset is missing required column `{0}`")]
    MissingColumn(&'static str),

    /// A date cell could not be parsed
    #[error("line {line}: invalid date `{value}`")]
    InvalidDate { line: u64, value: String },

    /// A row has no city name
    #[error("line {line}: empty city name")]
    EmptyCity { line: u64 },

    /// A column that must be numeric holds text
    #[error("column `{0}` is not numeric")]
    NonNumericColumn(String),

    /// A record's values do not line up with the numeric columns
    #[error("record {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while building a model input for a city
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// No historical rows exist for the requested city
    #[error("no data available for city `{city}`")]
    NoDataForCity { city: String },

    /// The city was never seen by the trained encoder
    #[error("city `{city}` is not known to the trained model")]
    UnknownCity { city: String },

    /// A feature column has no usable value and no training median
    #[error("feature `{column}` has no value for city `{city}`")]
    MissingFeature { city: String, column: String },
}

/// Errors raised by the trained model itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("model has no trees")]
    Empty,

    #[error("model produced a non-finite prediction")]
    NonFinite,

    #[error("model validation failed: {0}")]
    ValidationFailed(String),
}

/// Failure of a single prediction request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised while persisting or loading the artifact bundle.
///
/// Any of these at startup means the service cannot serve.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact file {path} is missing")]
    Missing { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid artifact bundle: {0}")]
    Invalid(String),
}

impl From<ModelError> for ArtifactError {
    fn from(err: ModelError) -> Self {
        ArtifactError::Invalid(err.to_string())
    }
}
