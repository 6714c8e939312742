//! Randomized hyperparameter search with k-fold cross-validation

use aqi_core::metrics::mean_squared_error;
use serde::Serialize;

use crate::cart::MaxFeatures;
use crate::deterministic::LcgRng;
use crate::errors::TrainerError;
use crate::forest::{ForestParams, ForestTrainer};

/// Discrete search space. Every combination is one configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub max_features: Vec<MaxFeatures>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![None, Some(10), Some(20), Some(30)],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::Log2],
        }
    }
}

impl ParamGrid {
    /// Number of configurations
    pub fn len(&self) -> usize {
        self.n_estimators.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.min_samples_leaf.len()
            * self.max_features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configuration `index` in mixed-radix order, last axis fastest
    pub fn get(&self, index: usize) -> Option<ForestParams> {
        if index >= self.len() {
            return None;
        }

        let mut rest = index;
        let mut pick = |len: usize| {
            let i = rest % len;
            rest /= len;
            i
        };
        let max_features = self.max_features[pick(self.max_features.len())];
        let min_samples_leaf = self.min_samples_leaf[pick(self.min_samples_leaf.len())];
        let min_samples_split = self.min_samples_split[pick(self.min_samples_split.len())];
        let max_depth = self.max_depth[pick(self.max_depth.len())];
        let n_estimators = self.n_estimators[pick(self.n_estimators.len())];

        Some(ForestParams {
            n_estimators,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_features,
            bootstrap: true,
        })
    }

    /// Draw up to `n_iter` distinct configurations
    pub fn sample(&self, n_iter: usize, rng: &mut LcgRng) -> Vec<ForestParams> {
        rng.sample_indices(self.len(), n_iter)
            .into_iter()
            .filter_map(|i| self.get(i))
            .collect()
    }
}

/// Contiguous k-fold partitioning; the first `n % k` folds get one extra row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KFold {
    pub n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// `(train, validation)` index pairs over `0..n`
    pub fn splits(&self, n: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, TrainerError> {
        let k = self.n_splits;
        if k < 2 {
            return Err(TrainerError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {k}"
            )));
        }
        if k > n {
            return Err(TrainerError::InsufficientData(format!(
                "{n} rows cannot be split into {k} folds"
            )));
        }

        let base = n / k;
        let extra = n % k;
        let mut start = 0;
        let mut folds = Vec::with_capacity(k);
        for fold in 0..k {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let validation: Vec<usize> = (start..end).collect();
            let train: Vec<usize> = (0..start).chain(end..n).collect();
            folds.push((train, validation));
            start = end;
        }
        Ok(folds)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub fold_mse: Vec<f64>,
    pub mean_mse: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchOutcome {
    pub best: ForestParams,
    pub best_mse: f64,
    /// All evaluated configurations in draw order
    pub candidates: Vec<CandidateScore>,
}

#[derive(Clone, Debug)]
pub struct RandomizedSearch {
    pub grid: ParamGrid,
    pub n_iter: usize,
    pub folds: KFold,
    pub seed: u64,
    pub max_trees: Option<usize>,
}

impl RandomizedSearch {
    pub fn new(grid: ParamGrid, n_iter: usize, cv: usize, seed: u64) -> Self {
        Self {
            grid,
            n_iter,
            folds: KFold::new(cv),
            seed,
            max_trees: None,
        }
    }

    pub fn with_max_trees(mut self, max_trees: Option<usize>) -> Self {
        self.max_trees = max_trees;
        self
    }

    /// Score each sampled configuration by mean validation MSE.
    ///
    /// The lowest mean wins; on ties the configuration drawn first is kept.
    pub fn run(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<SearchOutcome, TrainerError> {
        if self.n_iter == 0 || self.grid.is_empty() {
            return Err(TrainerError::InvalidConfig(
                "randomized search needs at least one configuration".to_string(),
            ));
        }
        let folds = self.folds.splits(features.len())?;

        let mut rng = LcgRng::new(self.seed);
        let configurations = self.grid.sample(self.n_iter, &mut rng);

        let mut candidates = Vec::with_capacity(configurations.len());
        for (i, params) in configurations.into_iter().enumerate() {
            let params = params.capped(self.max_trees);
            let mut fold_mse = Vec::with_capacity(folds.len());

            for (train, validation) in &folds {
                let (train_x, train_y) = select(features, targets, train);
                let (val_x, val_y) = select(features, targets, validation);

                let model = ForestTrainer::new(params.clone(), self.seed).fit(&train_x, &train_y)?;
                let predicted = model.predict_batch(&val_x)?;
                let mse = mean_squared_error(&val_y, &predicted).ok_or_else(|| {
                    TrainerError::InsufficientData("empty validation fold".to_string())
                })?;
                fold_mse.push(mse);
            }

            let mean_mse = fold_mse.iter().sum::<f64>() / fold_mse.len() as f64;
            tracing::info!(
                candidate = i + 1,
                of = self.n_iter.min(self.grid.len()),
                mean_mse,
                params = ?params.to_map(),
                "evaluated configuration"
            );
            candidates.push(CandidateScore {
                params,
                fold_mse,
                mean_mse,
            });
        }

        let (best, best_mse) = candidates
            .iter()
            .fold(None::<&CandidateScore>, |best, c| match best {
                Some(b) if b.mean_mse <= c.mean_mse => Some(b),
                _ => Some(c),
            })
            .map(|b| (b.params.clone(), b.mean_mse))
            .ok_or_else(|| TrainerError::InvalidConfig("no configuration evaluated".to_string()))?;

        Ok(SearchOutcome {
            best,
            best_mse,
            candidates,
        })
    }
}

/// Gather the rows at `indices`
pub fn select(features: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices
        .iter()
        .map(|&i| (features[i].clone(), targets[i]))
        .unzip()
}
