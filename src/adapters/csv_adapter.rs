//! CSV file data adapter.
//!
//! Candlesticks are read from a file with an `ot,ct,o,h,l,c` header. Features
//! are read from a headerless file with one row of model outputs per line.

use crate::domain::candlestick::Candlestick;
use crate::domain::error::PlutusError;
use crate::ports::data_port::{DataPort, FeatureFrame};
use std::path::PathBuf;

pub struct CsvAdapter {
    candlesticks_path: PathBuf,
    features_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(candlesticks_path: PathBuf, features_path: PathBuf) -> Self {
        Self {
            candlesticks_path,
            features_path,
        }
    }
}

fn data_error(reason: String) -> PlutusError {
    PlutusError::Data { reason }
}

fn field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    i: usize,
    name: &str,
    line: u64,
) -> Result<T, PlutusError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(i)
        .ok_or_else(|| data_error(format!("line {line}: missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| data_error(format!("line {line}: invalid {name} value: {e}")))
}

impl DataPort for CsvAdapter {
    fn fetch_candlesticks(&self) -> Result<Vec<Candlestick>, PlutusError> {
        let path = &self.candlesticks_path;
        let mut rdr = csv::Reader::from_path(path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;
        let mut candlesticks = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map_or(0, |p| p.line());

            candlesticks.push(Candlestick {
                open_time: field(&record, 0, "ot", line)?,
                close_time: field(&record, 1, "ct", line)?,
                open: field(&record, 2, "o", line)?,
                high: field(&record, 3, "h", line)?,
                low: field(&record, 4, "l", line)?,
                close: field(&record, 5, "c", line)?,
            });
        }

        candlesticks.sort_by_key(|c| c.open_time);
        Ok(candlesticks)
    }

    fn fetch_features(&self) -> Result<FeatureFrame, PlutusError> {
        let path = &self.features_path;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;
        let mut features = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map_or(0, |p| p.line());
            let row = (0..record.len())
                .map(|i| field::<f64>(&record, i, "feature", line))
                .collect::<Result<Vec<_>, _>>()?;
            features.push(row);
        }

        Ok(FeatureFrame::new(features))
    }
}
