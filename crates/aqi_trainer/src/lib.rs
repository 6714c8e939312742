//! Smart AQI trainer - offline random-forest training
//!
//! Turns the historical CSV into a checksummed artifact bundle: cleaning,
//! median imputation, city encoding, a seeded train/test split, randomized
//! hyperparameter search with k-fold cross-validation, a final refit and a
//! held-out evaluation. Every random choice is seeded, so the same input and
//! configuration always produce the same bundle contents.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod pipeline;
pub mod search;

use aqi_core::HistoricalData;
use std::path::Path;

pub use cart::{CartBuilder, MaxFeatures, TreeConfig};
pub use dataset::{train_test_split, TrainingFrame};
pub use deterministic::{mix_seed, LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use forest::{ForestParams, ForestTrainer};
pub use pipeline::{TrainingConfig, TrainingOutcome, TrainingPipeline};
pub use search::{KFold, ParamGrid, RandomizedSearch, SearchOutcome};

/// Train a bundle directly from a CSV file using the provided configuration.
pub fn train_bundle_from_csv(path: &Path, config: TrainingConfig) -> Result<TrainingOutcome, TrainerError> {
    let data = HistoricalData::from_csv_path(path)?;
    TrainingPipeline::new(config).run(&data)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
