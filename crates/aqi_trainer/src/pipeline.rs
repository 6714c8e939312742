//! End-to-end training run: prepare, split, search, refit, evaluate, bundle

use aqi_core::bundle::{ArtifactBundle, ModelMetrics, TrainingSummary};
use aqi_core::metrics::{r2_score, rmse};
use aqi_core::HistoricalData;

use crate::dataset::{train_test_split, TrainingFrame};
use crate::errors::TrainerError;
use crate::forest::ForestTrainer;
use crate::search::{select, ParamGrid, RandomizedSearch, SearchOutcome};

#[derive(Clone, Debug)]
pub struct TrainingConfig {
    pub seed: u64,
    pub n_iter: usize,
    pub cv: usize,
    pub test_size: f64,
    /// Cap on trees per forest, for quick runs
    pub max_trees: Option<usize>,
    pub grid: ParamGrid,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_iter: 10,
            cv: 3,
            test_size: 0.2,
            max_trees: None,
            grid: ParamGrid::default(),
        }
    }
}

#[derive(Debug)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    pub search: SearchOutcome,
}

pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn run(&self, data: &HistoricalData) -> Result<TrainingOutcome, TrainerError> {
        let config = &self.config;
        let frame = TrainingFrame::prepare(data)?;
        tracing::info!(
            rows = frame.len(),
            features = frame.feature_columns.len(),
            cities = frame.encoder.len(),
            "training frame prepared"
        );

        let (train_idx, test_idx) = train_test_split(frame.len(), config.test_size, config.seed)?;
        let (train_x, train_y) = select(&frame.features, &frame.targets, &train_idx);
        let (test_x, test_y) = select(&frame.features, &frame.targets, &test_idx);
        tracing::info!(train = train_x.len(), test = test_x.len(), "split dataset");

        let search = RandomizedSearch::new(config.grid.clone(), config.n_iter, config.cv, config.seed)
            .with_max_trees(config.max_trees)
            .run(&train_x, &train_y)?;
        tracing::info!(
            cv_mse = search.best_mse,
            params = ?search.best.to_map(),
            "best configuration selected"
        );

        let model = ForestTrainer::new(search.best.clone(), config.seed).fit(&train_x, &train_y)?;
        let predicted = model.predict_batch(&test_x)?;
        let metrics = ModelMetrics {
            rmse: rmse(&test_y, &predicted).unwrap_or(0.0),
            r2: r2_score(&test_y, &predicted).unwrap_or(0.0),
        };
        tracing::info!(rmse = metrics.rmse, r2 = metrics.r2, "held-out evaluation");

        let training = TrainingSummary {
            train_rows: train_x.len(),
            test_rows: test_x.len(),
            cv_mse: search.best_mse,
            seed: config.seed,
            hyperparameters: search.best.to_map(),
        };

        let bundle = ArtifactBundle::new(
            frame.feature_columns,
            frame.encoder,
            model,
            metrics,
            frame.medians,
            training,
        );
        bundle.validate()?;

        Ok(TrainingOutcome { bundle, search })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::MaxFeatures;

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            n_iter: 2,
            max_trees: Some(4),
            grid: ParamGrid {
                n_estimators: vec![10],
                max_depth: vec![None, Some(5)],
                min_samples_split: vec![2],
                min_samples_leaf: vec![1],
                max_features: vec![MaxFeatures::Sqrt],
            },
            ..TrainingConfig::default()
        }
    }

    fn synthetic_csv() -> String {
        let mut csv = String::from("City,Date,PM2.5,NO2,AQI,AQI_Bucket\n");
        for (c, city) in ["Delhi", "Mumbai", "Chennai"].iter().enumerate() {
            for day in 1..=20 {
                let pm = (day * (c + 2)) as f64;
                let no2 = ((day * 7 + c) % 11) as f64;
                let aqi = 2.0 * pm + 30.0;
                csv.push_str(&format!("{city},2020-01-{day:02},{pm},{no2},{aqi},X\n"));
            }
        }
        csv
    }

    #[test]
    fn test_run_produces_valid_bundle() {
        let data = HistoricalData::from_reader(synthetic_csv().as_bytes()).unwrap();
        let outcome = TrainingPipeline::new(quick_config()).run(&data).unwrap();
        let bundle = &outcome.bundle;

        assert!(bundle.validate().is_ok());
        assert_eq!(bundle.feature_columns, vec!["City", "PM2.5", "NO2"]);
        assert_eq!(bundle.training.train_rows, 48);
        assert_eq!(bundle.training.test_rows, 12);
        assert_eq!(bundle.model.num_trees(), 4);
        assert!(bundle.metrics.rmse >= 0.0);
        assert!(bundle.metrics.r2 <= 1.0);
        assert_eq!(outcome.search.candidates.len(), 2);
    }

    #[test]
    fn test_run_is_reproducible() {
        let data = HistoricalData::from_reader(synthetic_csv().as_bytes()).unwrap();
        let a = TrainingPipeline::new(quick_config()).run(&data).unwrap();
        let b = TrainingPipeline::new(quick_config()).run(&data).unwrap();

        assert_eq!(a.bundle.model, b.bundle.model);
        assert_eq!(a.bundle.metrics, b.bundle.metrics);
        assert_eq!(a.search.best, b.search.best);
    }
}
