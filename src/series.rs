//! Daily sales series: CSV loading, calendar regularization, gap filling.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::{Result, SarimaError};
use crate::report;

pub const DATE_COLUMN: &str = "date";
pub const VALUE_COLUMN: &str = "sales";

/// A gap-free daily series: `values[i]` belongs to `start + i` days.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailySeries {
    pub fn new(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(SarimaError::InvalidInput("series is empty".into()));
        }
        Ok(Self { start, values })
    }

    /// Build from dated observations in any order. `None` marks a missing value.
    ///
    /// Missing calendar days are inserted, interior gaps filled by linear
    /// interpolation, trailing gaps by the last observation, and every value
    /// rounded half-to-even.
    pub fn from_observations(mut observations: Vec<(NaiveDate, Option<f64>)>) -> Result<Self> {
        observations.sort_by_key(|(date, _)| *date);
        if let Some(w) = observations.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(SarimaError::DuplicateDate(w[0].0));
        }
        let (Some(&(first, _)), Some(&(last, _))) = (observations.first(), observations.last()) else {
            return Err(SarimaError::InvalidInput("series is empty".into()));
        };

        let span = (last - first).num_days() as usize + 1;
        let mut dense: Vec<Option<f64>> = vec![None; span];
        for (date, value) in observations {
            dense[(date - first).num_days() as usize] = value;
        }

        let values = fill_gaps(&dense, first)?
            .into_iter()
            .map(f64::round_ties_even)
            .collect();
        Self::new(first, values)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.start + Days::new(index as u64)
    }

    pub fn last_date(&self) -> NaiveDate {
        self.date_at(self.values.len() - 1)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.values.len()).map(|i| self.date_at(i))
    }

    /// Write as a `date,sales` CSV. Values are whole numbers by construction.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct Row {
            date: NaiveDate,
            sales: i64,
        }

        report::write_atomically(path, |file| {
            let mut writer = csv::Writer::from_writer(file);
            for (date, &value) in self.dates().zip(&self.values) {
                writer.serialize(Row {
                    date,
                    sales: value.round() as i64,
                })?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}

/// Linear interpolation between observed neighbours; trailing gaps repeat the
/// last observation. A leading gap cannot be filled.
fn fill_gaps(dense: &[Option<f64>], start: NaiveDate) -> Result<Vec<f64>> {
    let Some(first_known) = dense.iter().position(Option::is_some) else {
        return Err(SarimaError::InvalidInput("series has no observed values".into()));
    };
    if first_known > 0 {
        return Err(SarimaError::InvalidInput(format!(
            "no observed value on or before {start}; leading gaps cannot be interpolated"
        )));
    }

    let mut out = Vec::with_capacity(dense.len());
    let mut prev: (usize, f64) = (0, 0.0);
    for (i, value) in dense.iter().enumerate() {
        match value {
            Some(v) => {
                out.push(*v);
                prev = (i, *v);
            }
            None => {
                let next = dense[i..]
                    .iter()
                    .enumerate()
                    .find_map(|(k, v)| v.map(|v| (i + k, v)));
                let filled = match next {
                    Some((j, next_v)) => {
                        let (i0, v0) = prev;
                        v0 + (next_v - v0) * (i - i0) as f64 / (j - i0) as f64
                    }
                    None => prev.1,
                };
                out.push(filled);
            }
        }
    }
    Ok(out)
}

/// Accepts `YYYY-MM-DD` or any string starting with it (e.g. a timestamp).
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()))
}

/// Read a `date,sales` table from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<DailySeries> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SarimaError::MissingColumn(name.to_string()))
    };
    let date_idx = column(DATE_COLUMN)?;
    let value_idx = column(VALUE_COLUMN)?;

    let mut observations = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| SarimaError::Parse {
            row,
            message: format!("invalid date '{raw_date}'"),
        })?;

        let raw_value = record.get(value_idx).unwrap_or("").trim();
        let value = if raw_value.is_empty() {
            None
        } else {
            let v: f64 = raw_value.parse().map_err(|_| SarimaError::Parse {
                row,
                message: format!("invalid {VALUE_COLUMN} value '{raw_value}'"),
            })?;
            if v.is_nan() { None } else { Some(v) }
        };
        observations.push((date, value));
    }

    DailySeries::from_observations(observations)
}

/// Load a `date,sales` CSV file.
pub fn load_csv(path: &Path) -> Result<DailySeries> {
    let file = File::open(path)?;
    let series = read_csv(BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        n_obs = series.len(),
        start = %series.start(),
        end = %series.last_date(),
        "loaded series"
    );
    Ok(series)
}
