//! Feature assembly for the serving path
//!
//! The model is positional: the vector handed to it must follow the column
//! order fixed at training time, one entry per column, nothing reordered.

use std::collections::BTreeMap;

use crate::dataset::{HistoricalData, CITY_COLUMN};
use crate::encoding::CityEncoder;
use crate::errors::AssemblyError;

/// Model input, aligned with the persisted column order
pub type FeatureVector = Vec<f64>;

/// Builds model inputs from the latest record of a city
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'a> {
    column_order: &'a [String],
    encoder: &'a CityEncoder,
    medians: Option<&'a BTreeMap<String, f64>>,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(column_order: &'a [String], encoder: &'a CityEncoder) -> Self {
        Self {
            column_order,
            encoder,
            medians: None,
        }
    }

    /// Fill missing cells with the medians the trainer imputed with.
    ///
    /// Only empty cells are filled; a column absent from the dataset is
    /// still `MissingFeature`.
    pub fn with_medians(mut self, medians: &'a BTreeMap<String, f64>) -> Self {
        self.medians = Some(medians);
        self
    }

    /// Assemble the feature vector for `city`.
    ///
    /// Fails with `NoDataForCity` before consulting the encoder, so a city
    /// without rows reports the data problem rather than the encoding one.
    pub fn assemble(&self, city: &str, data: &HistoricalData) -> Result<FeatureVector, AssemblyError> {
        let latest = data
            .latest_for_city(city)
            .ok_or_else(|| AssemblyError::NoDataForCity {
                city: city.to_string(),
            })?;

        self.column_order
            .iter()
            .map(|column| {
                if column == CITY_COLUMN {
                    return self.encoder.transform(city).map(|code| code as f64);
                }

                let missing = || AssemblyError::MissingFeature {
                    city: city.to_string(),
                    column: column.clone(),
                };
                let idx = data.column_index(column).ok_or_else(missing)?;
                latest
                    .values
                    .get(idx)
                    .copied()
                    .flatten()
                    .or_else(|| self.medians.and_then(|m| m.get(column).copied()))
                    .ok_or_else(missing)
            })
            .collect()
    }
}

/// Assemble a feature vector without median fallback
pub fn assemble(
    city: &str,
    column_order: &[String],
    data: &HistoricalData,
    encoder: &CityEncoder,
) -> Result<FeatureVector, AssemblyError> {
    FeatureAssembler::new(column_order, encoder).assemble(city, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
City,Date,PM2.5,PM10,AQI
Delhi,2020-01-01,100,200,250
Delhi,2020-01-05,150,,300
Mumbai,2020-01-04,50,80,90
";

    fn fixture() -> (HistoricalData, CityEncoder, Vec<String>) {
        let data = HistoricalData::from_reader(CSV.as_bytes()).unwrap();
        let encoder = CityEncoder::fit(data.cities());
        let columns = vec!["City".to_string(), "PM2.5".to_string()];
        (data, encoder, columns)
    }

    #[test]
    fn test_vector_follows_column_order() {
        let (data, encoder, _) = fixture();
        let order = vec!["PM2.5".to_string(), "City".to_string()];
        let features = assemble("Mumbai", &order, &data, &encoder).unwrap();
        assert_eq!(features, vec![50.0, 1.0]);
    }

    #[test]
    fn test_uses_latest_record() {
        let (data, encoder, columns) = fixture();
        let features = assemble("Delhi", &columns, &data, &encoder).unwrap();
        assert_eq!(features, vec![0.0, 150.0]);
    }

    #[test]
    fn test_no_data_for_city() {
        let (data, encoder, columns) = fixture();
        let err = assemble("Atlantis", &columns, &data, &encoder).unwrap_err();
        assert_eq!(
            err,
            AssemblyError::NoDataForCity {
                city: "Atlantis".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_city() {
        let (data, _, columns) = fixture();
        let encoder = CityEncoder::fit(["Mumbai"]);
        let err = assemble("Delhi", &columns, &data, &encoder).unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownCity { .. }));
    }

    #[test]
    fn test_missing_value_uses_median() {
        let (data, encoder, _) = fixture();
        let order = vec!["PM10".to_string()];

        let err = assemble("Delhi", &order, &data, &encoder).unwrap_err();
        assert!(matches!(err, AssemblyError::MissingFeature { .. }));

        let medians = BTreeMap::from([("PM10".to_string(), 140.0)]);
        let features = FeatureAssembler::new(&order, &encoder)
            .with_medians(&medians)
            .assemble("Delhi", &data)
            .unwrap();
        assert_eq!(features, vec![140.0]);
    }

    #[test]
    fn test_absent_column_ignores_median() {
        let csv = "City,Date,PM10,AQI\nDelhi,2020-01-01,80,40\n";
        let data = HistoricalData::from_reader(csv.as_bytes()).unwrap();
        let encoder = CityEncoder::fit(["Delhi"]);
        let order = vec!["City".to_string(), "PM2.5".to_string()];
        let medians = BTreeMap::from([("PM2.5".to_string(), 58.0)]);

        let err = FeatureAssembler::new(&order, &encoder)
            .with_medians(&medians)
            .assemble("Delhi", &data)
            .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::MissingFeature {
                city: "Delhi".to_string(),
                column: "PM2.5".to_string()
            }
        );
    }

    #[test]
    fn test_junk_cell_elsewhere_keeps_real_reading() {
        let csv = "City,Date,PM2.5,AQI\nAgra,2020-01-01,-,40\nDelhi,2020-01-01,300,250\nDelhi,2020-01-02,310,260\n";
        let data = HistoricalData::from_reader(csv.as_bytes()).unwrap();
        let encoder = CityEncoder::fit(data.cities());
        let order = vec!["City".to_string(), "PM2.5".to_string()];
        let medians = BTreeMap::from([("PM2.5".to_string(), 58.0)]);
        let assembler = FeatureAssembler::new(&order, &encoder).with_medians(&medians);

        assert_eq!(assembler.assemble("Delhi", &data).unwrap(), vec![1.0, 310.0]);
        assert_eq!(assembler.assemble("Agra", &data).unwrap(), vec![0.0, 58.0]);
    }
}
