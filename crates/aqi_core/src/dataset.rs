//! Historical air-quality dataset
//!
//! Loads the `City, Date, <pollutants...>, AQI` CSV once at startup. Empty
//! cells (and the usual NA spellings) are missing values. A column is numeric
//! when most of its non-missing cells parse as numbers; stray junk cells in
//! such a column are read as missing. Text columns such as `AQI_Bucket` are
//! dropped at load time.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::DatasetError;

pub const CITY_COLUMN: &str = "City";
pub const DATE_COLUMN: &str = "Date";
pub const TARGET_COLUMN: &str = "AQI";
pub const BUCKET_COLUMN: &str = "AQI_Bucket";

const MISSING_TOKENS: [&str; 7] = ["", "NA", "N/A", "NaN", "nan", "null", "None"];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// One row of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub city: String,
    pub date: NaiveDate,
    /// Values aligned with [`HistoricalData::columns`]
    pub values: Vec<Option<f64>>,
}

/// A (date, AQI) point of the trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub aqi: Option<f64>,
}

/// Immutable in-memory dataset
#[derive(Debug, Clone)]
pub struct HistoricalData {
    header: Vec<String>,
    columns: Vec<String>,
    target_pos: usize,
    records: Vec<HistoricalRecord>,
}

impl HistoricalData {
    /// Build a dataset from already-parsed parts.
    ///
    /// `header` is the full CSV header in file order; `columns` the numeric
    /// subset the record values are aligned with.
    pub fn new(
        header: Vec<String>,
        columns: Vec<String>,
        records: Vec<HistoricalRecord>,
    ) -> Result<Self, DatasetError> {
        let target_pos = columns
            .iter()
            .position(|c| c == TARGET_COLUMN)
            .ok_or(DatasetError::MissingColumn(TARGET_COLUMN))?;

        if let Some((row, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != columns.len())
        {
            return Err(DatasetError::RowWidth {
                row,
                expected: columns.len(),
                actual: record.values.len(),
            });
        }

        Ok(Self {
            header,
            columns,
            target_pos,
            records,
        })
    }

    /// Load the dataset from a CSV file
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rows = data.len(),
            cities = data.cities().len(),
            "loaded historical dataset"
        );
        Ok(data)
    }

    /// Load the dataset from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let find = |name: &'static str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))
        };
        let city_idx = find(CITY_COLUMN)?;
        let date_idx = find(DATE_COLUMN)?;
        let target_idx = find(TARGET_COLUMN)?;

        let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;

        let mut numeric = Vec::new();
        for idx in (0..header.len()).filter(|&idx| idx != city_idx && idx != date_idx) {
            let (parsed, junk) = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|cell| !is_missing_token(cell))
                .fold((0usize, 0usize), |(parsed, junk), cell| {
                    if cell.parse::<f64>().is_ok() {
                        (parsed + 1, junk)
                    } else {
                        (parsed, junk + 1)
                    }
                });
            if junk > parsed {
                continue;
            }
            if junk > 0 {
                tracing::warn!(column = %header[idx], cells = junk, "non-numeric cells read as missing");
            }
            numeric.push(idx);
        }

        if !numeric.contains(&target_idx) {
            return Err(DatasetError::NonNumericColumn(TARGET_COLUMN.to_string()));
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let city = row.get(city_idx).unwrap_or_default().to_string();
            if city.is_empty() {
                return Err(DatasetError::EmptyCity { line });
            }

            let raw_date = row.get(date_idx).unwrap_or_default();
            let date = parse_date(raw_date).ok_or_else(|| DatasetError::InvalidDate {
                line,
                value: raw_date.to_string(),
            })?;

            let values = numeric
                .iter()
                .map(|&idx| row.get(idx).and_then(parse_cell))
                .collect();

            records.push(HistoricalRecord { city, date, values });
        }

        let columns = numeric.iter().map(|&idx| header[idx].clone()).collect();
        Self::new(header, columns, records)
    }

    /// Full CSV header in file order
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Numeric columns in header order (includes the target)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of `column` in `record`; `None` when the column is unknown or the cell is missing
    pub fn value(&self, record: &HistoricalRecord, column: &str) -> Option<f64> {
        self.column_index(column)
            .and_then(|idx| record.values.get(idx).copied().flatten())
    }

    /// Target AQI of a record
    pub fn aqi(&self, record: &HistoricalRecord) -> Option<f64> {
        record.values.get(self.target_pos).copied().flatten()
    }

    /// Sorted distinct city names
    pub fn cities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.city.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn records_for_city<'a, 'b>(
        &'a self,
        city: &'b str,
    ) -> impl Iterator<Item = &'a HistoricalRecord> + 'b
    where
        'a: 'b,
    {
        self.records.iter().filter(move |r| r.city == city)
    }

    /// Most recent record of a city.
    ///
    /// Among records sharing the latest date the last one in file order wins.
    pub fn latest_for_city(&self, city: &str) -> Option<&HistoricalRecord> {
        self.records_for_city(city).max_by_key(|r| r.date)
    }

    /// The last `window` records of a city, oldest first
    pub fn trend(&self, city: &str, window: usize) -> Vec<TrendPoint> {
        let mut rows: Vec<&HistoricalRecord> = self.records_for_city(city).collect();
        rows.sort_by_key(|r| r.date);
        let skip = rows.len().saturating_sub(window);

        rows.into_iter()
            .skip(skip)
            .map(|r| TrendPoint {
                date: r.date,
                aqi: self.aqi(r),
            })
            .collect()
    }
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell)
}

fn parse_cell(cell: &str) -> Option<f64> {
    if is_missing_token(cell) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
