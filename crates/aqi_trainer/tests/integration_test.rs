//! Integration tests for the offline trainer
//!
//! Ensures identical bundles are produced across runs and that the saved
//! artifacts serve predictions.

use anyhow::Result;
use aqi_core::{build_report, ArtifactBundle, HistoricalData};
use aqi_trainer::{train_bundle_from_csv, MaxFeatures, ParamGrid, TrainingConfig};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

/// Synthetic dataset where AQI tracks PM2.5 with some city offset
fn create_synthetic_dataset() -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "City,Date,PM2.5,PM10,CO,AQI,AQI_Bucket")?;

    let cities = [("Ahmedabad", 40.0), ("Bengaluru", 0.0), ("Delhi", 80.0), ("Lucknow", 60.0)];
    for (c, (city, offset)) in cities.iter().enumerate() {
        for day in 1..=25u32 {
            let pm25 = f64::from((day * 13 + c as u32 * 7) % 90 + 10);
            let pm10 = pm25 * 1.7;
            let aqi = 1.5 * pm25 + offset;
            // A few gaps for the imputer and one row without a target
            let pm10_cell = if day % 9 == 0 { String::new() } else { pm10.to_string() };
            let aqi_cell = if day == 25 && c == 0 { String::new() } else { aqi.to_string() };
            writeln!(
                file,
                "{city},2021-03-{day:02},{pm25},{pm10_cell},0.8,{aqi_cell},Moderate"
            )?;
        }
    }

    file.flush()?;
    Ok(file)
}

fn quick_config() -> TrainingConfig {
    TrainingConfig {
        n_iter: 3,
        max_trees: Some(8),
        grid: ParamGrid {
            n_estimators: vec![100],
            max_depth: vec![None, Some(10)],
            min_samples_split: vec![2, 5],
            min_samples_leaf: vec![1],
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::Log2],
        },
        ..TrainingConfig::default()
    }
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let file = create_synthetic_dataset()?;

    let first = train_bundle_from_csv(file.path(), quick_config())?;
    let second = train_bundle_from_csv(file.path(), quick_config())?;

    assert_eq!(first.bundle.model, second.bundle.model, "Models should be identical");
    assert_eq!(first.bundle.metrics, second.bundle.metrics, "Metrics should be identical");
    assert_eq!(first.bundle.feature_medians, second.bundle.feature_medians);
    assert_eq!(first.search.best, second.search.best);
    Ok(())
}

#[test]
fn test_bundle_round_trip_and_serving() -> Result<()> {
    let file = create_synthetic_dataset()?;
    let outcome = train_bundle_from_csv(file.path(), quick_config())?;

    assert_eq!(outcome.bundle.training.train_rows + outcome.bundle.training.test_rows, 99);
    assert_eq!(outcome.bundle.city_encoder.classes().len(), 4);
    assert_eq!(
        outcome.bundle.feature_columns,
        vec!["City", "PM2.5", "PM10", "CO"]
    );

    let dir = tempdir()?;
    let checksum = outcome.bundle.save(dir.path())?;
    let (loaded, loaded_checksum) = ArtifactBundle::load(dir.path())?;
    assert_eq!(checksum, loaded_checksum);
    assert_eq!(loaded, outcome.bundle);

    let data = HistoricalData::from_csv_path(file.path())?;
    for city in loaded.city_encoder.classes() {
        let report = build_report(&loaded, &data, city, None, 30)?;
        let direct = loaded.predict(city, &data)?;
        assert_eq!(report.predicted_aqi, direct.aqi);
        assert_eq!(report.trend.len(), 25);
    }
    Ok(())
}

#[test]
fn test_model_beats_constant_baseline() -> Result<()> {
    let file = create_synthetic_dataset()?;
    let outcome = train_bundle_from_csv(file.path(), quick_config())?;
    assert!(outcome.bundle.metrics.r2 > 0.5, "r2 = {}", outcome.bundle.metrics.r2);
    Ok(())
}
