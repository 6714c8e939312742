//! Random-forest regression model
//!
//! Prediction is the mean of the tree outputs. The model also carries the
//! impurity-based feature importances computed at fit time, which the
//! dashboard shows as pollutant contributions.

use serde::{Deserialize, Serialize};

use super::tree::Tree;
use crate::errors::ModelError;
use crate::prediction::Regressor;

/// Current serialized model format
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestModel {
    pub version: u32,
    pub feature_count: usize,
    pub trees: Vec<Tree>,
    /// One non-negative weight per feature
    pub feature_importances: Vec<f64>,
}

impl ForestModel {
    pub fn new(feature_count: usize, trees: Vec<Tree>, feature_importances: Vec<f64>) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            feature_count,
            trees,
            feature_importances,
        }
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "unsupported model version {}",
                self.version
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Empty);
        }
        if self.feature_importances.len() != self.feature_count {
            return Err(ModelError::ValidationFailed(format!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.feature_count
            )));
        }
        if self
            .feature_importances
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(ModelError::ValidationFailed(
                "feature importances must be finite and non-negative".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                ModelError::ValidationFailed(format!("tree {i} validation failed: {e}"))
            })?;
        }

        Ok(())
    }

    /// Mean prediction over all trees
    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.feature_count {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.feature_count,
                actual: features.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(ModelError::Empty);
        }

        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree.evaluate(features).ok_or_else(|| {
                ModelError::ValidationFailed(format!("tree {i} could not be evaluated"))
            })?;
        }

        let mean = sum / self.trees.len() as f64;
        if mean.is_finite() {
            Ok(mean)
        } else {
            Err(ModelError::NonFinite)
        }
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

impl Regressor for ForestModel {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        ForestModel::predict(self, features)
    }

    fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
