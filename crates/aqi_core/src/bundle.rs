//! Checksummed artifact bundle
//!
//! The trainer emits a single canonical JSON document holding the model, the
//! feature column order, the city encoder, the held-out metrics and the
//! training medians. Its BLAKE3 digest is written next to it. The service
//! refuses to start on a missing, tampered or inconsistent bundle.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::{HistoricalData, CITY_COLUMN};
use crate::encoding::CityEncoder;
use crate::errors::{ArtifactError, PredictionError};
use crate::features::FeatureAssembler;
use crate::forest::ForestModel;
use crate::prediction::{predict_with, Prediction};
use crate::serde_canon::{hash_bytes_hex, hash_canonical_hex, to_canonical_json};

pub const BUNDLE_FILE: &str = "bundle.json";
pub const CHECKSUM_FILE: &str = "bundle.hash";
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Held-out evaluation of the persisted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub r2: f64,
}

/// Provenance of a training run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Mean validation MSE of the selected configuration
    pub cv_mse: f64,
    pub seed: u64,
    pub hyperparameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub feature_columns: Vec<String>,
    pub city_encoder: CityEncoder,
    pub model: ForestModel,
    pub metrics: ModelMetrics,
    pub feature_medians: BTreeMap<String, f64>,
    pub training: TrainingSummary,
}

impl ArtifactBundle {
    pub fn new(
        feature_columns: Vec<String>,
        city_encoder: CityEncoder,
        model: ForestModel,
        metrics: ModelMetrics,
        feature_medians: BTreeMap<String, f64>,
        training: TrainingSummary,
    ) -> Self {
        Self {
            version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            feature_columns,
            city_encoder,
            model,
            metrics,
            feature_medians,
            training,
        }
    }

    /// Check that the artifacts agree with each other
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != BUNDLE_FORMAT_VERSION {
            return Err(ArtifactError::Invalid(format!(
                "unsupported bundle version {}",
                self.version
            )));
        }

        self.model.validate()?;

        if self.feature_columns.len() != self.model.feature_count {
            return Err(ArtifactError::Invalid(format!(
                "{} feature columns for a model expecting {}",
                self.feature_columns.len(),
                self.model.feature_count
            )));
        }
        let distinct: BTreeSet<&str> = self.feature_columns.iter().map(String::as_str).collect();
        if distinct.len() != self.feature_columns.len() {
            return Err(ArtifactError::Invalid(
                "duplicate feature column".to_string(),
            ));
        }

        self.city_encoder.validate().map_err(ArtifactError::Invalid)?;
        if distinct.contains(CITY_COLUMN) && self.city_encoder.is_empty() {
            return Err(ArtifactError::Invalid(
                "model uses the city column but the encoder is empty".to_string(),
            ));
        }

        let ModelMetrics { rmse, r2 } = self.metrics;
        if !rmse.is_finite() || rmse < 0.0 || !r2.is_finite() || r2 > 1.0 {
            return Err(ArtifactError::Invalid(format!(
                "implausible metrics rmse={rmse} r2={r2}"
            )));
        }

        if let Some((column, _)) = self.feature_medians.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ArtifactError::Invalid(format!(
                "median of `{column}` is not finite"
            )));
        }

        Ok(())
    }

    /// BLAKE3 hex digest of the canonical form
    pub fn checksum(&self) -> Result<String, ArtifactError> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Every feature column other than `City` must be a numeric column of `data`
    pub fn check_dataset(&self, data: &HistoricalData) -> Result<(), ArtifactError> {
        let missing: Vec<&str> = self
            .feature_columns
            .iter()
            .filter(|c| *c != CITY_COLUMN && data.column_index(c).is_none())
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ArtifactError::Invalid(format!(
                "dataset lacks feature columns the model was trained on: {}",
                missing.join(", ")
            )))
        }
    }

    /// Write `bundle.json` and `bundle.hash` into `dir`, returning the digest
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<String, ArtifactError> {
        let dir = dir.as_ref();
        self.validate()?;

        fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let json = to_canonical_json(self)?;
        let checksum = hash_bytes_hex(json.as_bytes());

        write_atomic(&dir.join(BUNDLE_FILE), json.as_bytes())?;
        write_atomic(&dir.join(CHECKSUM_FILE), checksum.as_bytes())?;

        tracing::info!(
            dir = %dir.display(),
            checksum = %checksum,
            trees = self.model.num_trees(),
            "artifact bundle saved"
        );
        Ok(checksum)
    }

    /// Load and verify a bundle, returning it with its digest
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<(Self, String), ArtifactError> {
        let dir = dir.as_ref();
        let bundle_path = dir.join(BUNDLE_FILE);
        let hash_path = dir.join(CHECKSUM_FILE);

        let bytes = read_artifact(&bundle_path)?;
        let expected = String::from_utf8_lossy(&read_artifact(&hash_path)?)
            .trim()
            .to_ascii_lowercase();

        let actual = hash_bytes_hex(&bytes);
        if actual != expected {
            return Err(ArtifactError::ChecksumMismatch { expected, actual });
        }

        let bundle: ArtifactBundle = serde_json::from_slice(&bytes)?;
        bundle.validate()?;

        tracing::info!(
            path = %bundle_path.display(),
            checksum = %actual,
            features = bundle.feature_columns.len(),
            cities = bundle.city_encoder.len(),
            "artifact bundle loaded"
        );
        Ok((bundle, actual))
    }

    /// Assembler bound to this bundle's column order, encoder and medians
    pub fn assembler(&self) -> FeatureAssembler<'_> {
        FeatureAssembler::new(&self.feature_columns, &self.city_encoder)
            .with_medians(&self.feature_medians)
    }

    pub fn predict(&self, city: &str, data: &HistoricalData) -> Result<Prediction, PredictionError> {
        predict_with(&self.assembler(), city, data, &self.model)
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let temp: PathBuf = path.with_extension("tmp");
    fs::write(&temp, bytes).map_err(|source| ArtifactError::Io {
        path: temp.clone(),
        source,
    })?;
    fs::rename(&temp, path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{Node, Tree};
    use tempfile::tempdir;

    fn sample_bundle() -> ArtifactBundle {
        let tree = Tree::new(vec![
            Node::internal(0, 1, 100.0, 1, 2),
            Node::leaf(1, 80.0),
            Node::leaf(2, 220.0),
        ]);
        let model = ForestModel::new(2, vec![tree], vec![0.0, 1.0]);
        ArtifactBundle::new(
            vec!["City".to_string(), "PM2.5".to_string()],
            CityEncoder::fit(["Delhi", "Mumbai"]),
            model,
            ModelMetrics {
                rmse: 31.5,
                r2: 0.87,
            },
            BTreeMap::from([("PM2.5".to_string(), 58.2)]),
            TrainingSummary {
                train_rows: 8,
                test_rows: 2,
                cv_mse: 990.0,
                seed: 42,
                hyperparameters: BTreeMap::from([("n_estimators".to_string(), "1".to_string())]),
            },
        )
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let bundle = sample_bundle();

        let checksum = bundle.save(dir.path()).unwrap();
        let (loaded, loaded_checksum) = ArtifactBundle::load(dir.path()).unwrap();

        assert_eq!(loaded, bundle);
        assert_eq!(loaded_checksum, checksum);
        assert_eq!(bundle.checksum().unwrap(), checksum);
        assert!(!dir.path().join("bundle.tmp").exists());
    }

    #[test]
    fn test_tampering_detected() {
        let dir = tempdir().unwrap();
        sample_bundle().save(dir.path()).unwrap();

        let path = dir.path().join(BUNDLE_FILE);
        let json = fs::read_to_string(&path).unwrap();
        fs::write(&path, json.replace("220.0", "221.0")).unwrap();

        assert!(matches!(
            ArtifactBundle::load(dir.path()),
            Err(ArtifactError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_bundle() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ArtifactBundle::load(dir.path()),
            Err(ArtifactError::Missing { .. })
        ));
    }

    #[test]
    fn test_column_count_must_match_model() {
        let mut bundle = sample_bundle();
        bundle.feature_columns.push("PM10".to_string());
        assert!(matches!(bundle.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn test_implausible_metrics_rejected() {
        let mut bundle = sample_bundle();
        bundle.metrics.r2 = 1.5;
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn test_predict_through_bundle() {
        let csv = "City,Date,PM2.5,AQI\nDelhi,2020-01-01,150,300\nMumbai,2020-01-01,,90\n";
        let data = HistoricalData::from_reader(csv.as_bytes()).unwrap();
        let bundle = sample_bundle();

        assert_eq!(bundle.predict("Delhi", &data).unwrap().aqi, 220);
        // Missing PM2.5 falls back to the training median 58.2
        let mumbai = bundle.predict("Mumbai", &data).unwrap();
        assert_eq!(mumbai.features, vec![1.0, 58.2]);
        assert_eq!(mumbai.aqi, 80);
    }

    #[test]
    fn test_dataset_must_carry_feature_columns() {
        let bundle = sample_bundle();
        let good = HistoricalData::from_reader("City,Date,PM2.5,AQI\nDelhi,2020-01-01,1,2\n".as_bytes()).unwrap();
        assert!(bundle.check_dataset(&good).is_ok());

        let without = HistoricalData::from_reader("City,Date,PM10,AQI\nDelhi,2020-01-01,1,2\n".as_bytes()).unwrap();
        match bundle.check_dataset(&without) {
            Err(ArtifactError::Invalid(msg)) => assert!(msg.contains("PM2.5")),
            other => panic!("expected invalid, got {other:?}"),
        }
    }
}
