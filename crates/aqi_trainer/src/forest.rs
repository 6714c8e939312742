//! Random-forest regressor fitting
//!
//! Each tree is grown on a bootstrap sample with its own RNG stream derived
//! from the forest seed and the tree index. Trees are built in parallel with
//! rayon and collected in index order, so the fitted model does not depend
//! on thread scheduling.

use std::collections::BTreeMap;

use aqi_core::{ForestModel, Tree};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cart::{CartBuilder, FittedTree, MaxFeatures, TreeConfig};
use crate::deterministic::{mix_seed, LcgRng};
use crate::errors::TrainerError;

/// Forest hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }

    /// Copy with the tree count capped at `max_trees`
    pub fn capped(&self, max_trees: Option<usize>) -> Self {
        let mut params = self.clone();
        if let Some(cap) = max_trees {
            params.n_estimators = params.n_estimators.min(cap.max(1));
        }
        params
    }

    /// String form recorded in the bundle's training summary
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("n_estimators".to_string(), self.n_estimators.to_string()),
            (
                "max_depth".to_string(),
                self.max_depth
                    .map_or_else(|| "None".to_string(), |d| d.to_string()),
            ),
            (
                "min_samples_split".to_string(),
                self.min_samples_split.to_string(),
            ),
            (
                "min_samples_leaf".to_string(),
                self.min_samples_leaf.to_string(),
            ),
            ("max_features".to_string(), self.max_features.to_string()),
            ("bootstrap".to_string(), self.bootstrap.to_string()),
        ])
    }

    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.n_estimators == 0 {
            return Err(TrainerError::InvalidConfig(
                "n_estimators must be positive".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::InvalidConfig(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ForestTrainer {
    params: ForestParams,
    seed: u64,
}

impl ForestTrainer {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self { params, seed }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fit a forest on row-major `features` and `targets`
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<ForestModel, TrainerError> {
        self.params.validate()?;
        if features.is_empty() || features.len() != targets.len() {
            return Err(TrainerError::InsufficientData(format!(
                "{} feature rows for {} targets",
                features.len(),
                targets.len()
            )));
        }

        let feature_count = features[0].len();
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(TrainerError::InvalidConfig(
                "feature rows have differing widths".to_string(),
            ));
        }

        let builder = CartBuilder::new(features, targets, self.params.tree_config());
        let n = features.len();

        let fitted: Vec<FittedTree> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = LcgRng::new(mix_seed(self.seed, tree_idx as u64));
                let indices = if self.params.bootstrap {
                    rng.bootstrap(n)
                } else {
                    (0..n).collect()
                };
                builder.build(&indices, &mut rng)
            })
            .collect();

        let importances = average_importances(&fitted, feature_count);
        let trees: Vec<Tree> = fitted.into_iter().map(|f| f.tree).collect();

        tracing::debug!(
            trees = self.params.n_estimators,
            rows = n,
            features = feature_count,
            deepest = trees.iter().map(Tree::depth).max().unwrap_or(0),
            "forest fitted"
        );

        let model = ForestModel::new(feature_count, trees, importances);
        model.validate()?;
        Ok(model)
    }
}

/// Per-tree normalized impurity decrease, averaged and renormalized
fn average_importances(fitted: &[FittedTree], feature_count: usize) -> Vec<f64> {
    let mut totals = vec![0.0; feature_count];
    for tree in fitted {
        let sum: f64 = tree.importances.iter().sum();
        if sum > 0.0 {
            for (total, value) in totals.iter_mut().zip(&tree.importances) {
                *total += value / sum;
            }
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}
