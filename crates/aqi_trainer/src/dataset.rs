//! Training matrix preparation
//!
//! Rows without a target are dropped, remaining gaps are filled with the
//! per-column median, and the city is label-encoded. Column order is the
//! dataset header order with the date, target and bucket columns removed.

use std::collections::BTreeMap;

use aqi_core::dataset::{BUCKET_COLUMN, CITY_COLUMN, DATE_COLUMN, TARGET_COLUMN};
use aqi_core::{CityEncoder, HistoricalData};

use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Cleaned, imputed and encoded training data
#[derive(Clone, Debug)]
pub struct TrainingFrame {
    pub feature_columns: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    /// Median used to impute each numeric feature column
    pub medians: BTreeMap<String, f64>,
    pub encoder: CityEncoder,
    pub dropped_rows: usize,
}

impl TrainingFrame {
    pub fn prepare(data: &HistoricalData) -> Result<Self, TrainerError> {
        let rows: Vec<_> = data
            .records()
            .iter()
            .filter_map(|r| data.aqi(r).map(|aqi| (r, aqi)))
            .collect();
        let dropped_rows = data.len() - rows.len();
        if dropped_rows > 0 {
            tracing::info!(dropped_rows, "dropped rows without an AQI value");
        }
        if rows.is_empty() {
            return Err(TrainerError::InsufficientData(
                "every row is missing its AQI value".to_string(),
            ));
        }

        let feature_columns = feature_columns(data);
        let encoder = CityEncoder::fit(rows.iter().map(|(r, _)| r.city.as_str()));

        let mut medians = BTreeMap::new();
        for column in feature_columns.iter().filter(|c| *c != CITY_COLUMN) {
            let mut values: Vec<f64> = rows
                .iter()
                .filter_map(|(r, _)| data.value(r, column))
                .collect();
            let value = median(&mut values).unwrap_or_else(|| {
                tracing::warn!(column = %column, "column has no values, imputing 0.0");
                0.0
            });
            medians.insert(column.clone(), value);
        }

        let mut features = Vec::with_capacity(rows.len());
        for (record, _) in &rows {
            let row = feature_columns
                .iter()
                .map(|column| {
                    if column == CITY_COLUMN {
                        return encoder.transform(&record.city).map(|code| code as f64);
                    }
                    Ok(data
                        .value(record, column)
                        .or_else(|| medians.get(column).copied())
                        .unwrap_or(0.0))
                })
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| TrainerError::InsufficientData(e.to_string()))?;
            features.push(row);
        }
        let targets = rows.iter().map(|(_, aqi)| *aqi).collect();

        Ok(Self {
            feature_columns,
            features,
            targets,
            medians,
            encoder,
            dropped_rows,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// City plus numeric columns in header order, minus date/target/bucket
pub fn feature_columns(data: &HistoricalData) -> Vec<String> {
    data.header()
        .iter()
        .filter(|h| !matches!(h.as_str(), DATE_COLUMN | TARGET_COLUMN | BUCKET_COLUMN))
        .filter(|h| {
            let keep = h.as_str() == CITY_COLUMN || data.column_index(h).is_some();
            if !keep {
                tracing::warn!(column = %h, "skipping non-numeric column");
            }
            keep
        })
        .cloned()
        .collect()
}

/// Median with the even-count midpoint rule; `None` for no values
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Seeded shuffle split: `ceil(test_size * n)` rows go to the test set.
///
/// Returns `(train, test)` index lists.
pub fn train_test_split(
    n: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), TrainerError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainerError::InvalidConfig(format!(
            "test size must be in (0, 1), got {test_size}"
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TrainerError::InsufficientData(format!(
            "{n} rows cannot be split with test size {test_size}"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    LcgRng::new(seed).shuffle(&mut order);
    let train = order.split_off(n_test);
    Ok((train, order))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
City,Date,PM2.5,CO,Notes,AQI,AQI_Bucket
Delhi,2020-01-01,100,1.0,x,200,Poor
Delhi,2020-01-02,,3.0,y,300,Very Poor
Agra,2020-01-01,50,,z,,
Agra,2020-01-02,70,2.0,w,150,Moderate
";

    #[test]
    fn test_prepare_drops_imputes_and_encodes() {
        let data = HistoricalData::from_reader(CSV.as_bytes()).unwrap();
        let frame = TrainingFrame::prepare(&data).unwrap();

        assert_eq!(frame.feature_columns, vec!["City", "PM2.5", "CO"]);
        assert_eq!(frame.dropped_rows, 1);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.encoder.classes(), &["Agra", "Delhi"]);

        // PM2.5 median over {100, 70} is 85
        assert_eq!(frame.medians["PM2.5"], 85.0);
        assert_eq!(frame.medians["CO"], 2.0);
        assert_eq!(frame.features[1], vec![1.0, 85.0, 3.0]);
        assert_eq!(frame.features[2], vec![0.0, 70.0, 2.0]);
        assert_eq!(frame.targets, vec![200.0, 300.0, 150.0]);
    }

    #[test]
    fn test_all_missing_targets() {
        let csv = "City,Date,PM10,AQI\nDelhi,2020-01-01,1,\n";
        let data = HistoricalData::from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            TrainingFrame::prepare(&data),
            Err(TrainerError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_empty_column_imputes_zero() {
        let csv = "City,Date,PM10,AQI\nDelhi,2020-01-01,,10\nDelhi,2020-01-02,,20\n";
        let data = HistoricalData::from_reader(csv.as_bytes()).unwrap();
        let frame = TrainingFrame::prepare(&data).unwrap();
        assert_eq!(frame.medians["PM10"], 0.0);
        assert_eq!(frame.features[0], vec![0.0, 0.0]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let (train, test) = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());

        assert_eq!(train_test_split(11, 0.2, 42).unwrap(), (train, test));
    }

    #[test]
    fn test_split_rejects_degenerate_input() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(10, 0.0, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
    }
}
