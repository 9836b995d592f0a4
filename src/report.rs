//! Output tables: forecast CSV, metrics JSON, residual CSV.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::types::ModelSpec;

pub const FORECAST_FILE: &str = "forecast.csv";
pub const METRICS_FILE: &str = "metrics.json";
pub const RESIDUALS_FILE: &str = "residuals.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualRow {
    pub date: NaiveDate,
    pub residual: f64,
}

/// Validation accuracy and the selected orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub rmse: f64,
    pub mape: f64,
    pub arima_order: [usize; 3],
    pub seasonal_order: Option<[usize; 4]>,
    /// AIC of the selected spec from the grid search on the training slice.
    pub aic: f64,
}

impl MetricsRecord {
    pub fn new(spec: &ModelSpec, rmse: f64, mape: f64, aic: f64) -> Self {
        let (p, d, q) = spec.order;
        Self {
            rmse,
            mape,
            arima_order: [p, d, q],
            seasonal_order: spec.seasonal_order.map(|(pp, dd, qq, s)| [pp, dd, qq, s]),
            aic,
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `<path>.tmp` in full and return its path. `path` itself is untouched.
fn stage<F>(path: &Path, write: F) -> Result<PathBuf>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    let result: Result<()> = (|| {
        let mut out = BufWriter::new(File::create(&tmp)?);
        write(&mut out)?;
        out.flush()?;
        out.get_ref().sync_all()?;
        Ok(())
    })();
    match result {
        Ok(()) => Ok(tmp),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Write through `<path>.tmp` and rename into place, so a failed write never
/// leaves a truncated file at `path`.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = stage(path, write)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_rows<T: Serialize>(out: &mut BufWriter<File>, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(out: &mut BufWriter<File>, metrics: &MetricsRecord) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, metrics)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// `date,forecast,lower,upper`.
pub fn write_forecast_csv(path: &Path, rows: &[ForecastRow]) -> Result<()> {
    write_atomically(path, |out| write_rows(out, rows))
}

/// `date,residual`.
pub fn write_residuals_csv(path: &Path, rows: &[ResidualRow]) -> Result<()> {
    write_atomically(path, |out| write_rows(out, rows))
}

/// Pretty-printed JSON object.
pub fn write_metrics_json(path: &Path, metrics: &MetricsRecord) -> Result<()> {
    write_atomically(path, |out| write_json(out, metrics))
}

/// Write `forecast.csv`, `metrics.json` and `residuals.csv` under `outdir` as
/// a set: all three are staged before any is renamed into place, and a failed
/// stage removes the others.
pub fn write_outputs(
    outdir: &Path,
    forecast: &[ForecastRow],
    metrics: &MetricsRecord,
    residuals: &[ResidualRow],
) -> Result<()> {
    let targets = [
        outdir.join(FORECAST_FILE),
        outdir.join(METRICS_FILE),
        outdir.join(RESIDUALS_FILE),
    ];
    let staged: Result<Vec<PathBuf>> = (|| {
        let mut staged = Vec::with_capacity(targets.len());
        let stages: [&dyn Fn(&mut BufWriter<File>) -> Result<()>; 3] = [
            &|out| write_rows(out, forecast),
            &|out| write_json(out, metrics),
            &|out| write_rows(out, residuals),
        ];
        for (target, write) in targets.iter().zip(stages) {
            match stage(target, write) {
                Ok(tmp) => staged.push(tmp),
                Err(e) => {
                    for tmp in &staged {
                        let _ = fs::remove_file(tmp);
                    }
                    return Err(e);
                }
            }
        }
        Ok(staged)
    })();

    for (tmp, target) in staged?.iter().zip(&targets) {
        fs::rename(tmp, target)?;
    }
    Ok(())
}
