//! End-to-end driver: split, select, refit, validate, forecast.
//!
//! Validation is hindsight-biased: the selected spec is refit on the whole
//! series, validation window included, and the validation predictions come
//! from that refit. The reported RMSE/MAPE therefore measure in-sample
//! one-step-ahead accuracy over the last `val_days` days.

use std::path::Path;

use chrono::Days;
use serde::Serialize;

use crate::error::{Result, SarimaError};
use crate::metrics::{mape, rmse};
use crate::model::{self, FittedModel};
use crate::optimizer::FitOptions;
use crate::report::{self, ForecastRow, MetricsRecord, ResidualRow};
use crate::selection::{self, GridSearchOutcome};
use crate::series::DailySeries;

pub const DEFAULT_HORIZON: usize = 90;
pub const DEFAULT_VAL_DAYS: usize = 60;
pub const DEFAULT_SEASONAL_PERIOD: usize = 7;
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Days to forecast past the last observation.
    pub horizon: usize,
    /// Trailing days held out of the grid search.
    pub val_days: usize,
    /// `None` searches non-seasonal orders only.
    pub seasonal_period: Option<usize>,
    pub orders: Vec<(usize, usize, usize)>,
    /// Interval significance level; 0.05 gives 95% bounds.
    pub alpha: f64,
    pub fit: FitOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            val_days: DEFAULT_VAL_DAYS,
            seasonal_period: Some(DEFAULT_SEASONAL_PERIOD),
            orders: selection::default_orders(),
            alpha: DEFAULT_ALPHA,
            fit: FitOptions::default(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(SarimaError::InvalidConfig("horizon must be at least 1".into()));
        }
        if self.val_days == 0 {
            return Err(SarimaError::InvalidConfig("val_days must be at least 1".into()));
        }
        if self.seasonal_period.is_some_and(|s| s < 2) {
            return Err(SarimaError::InvalidConfig(
                "seasonal period must be at least 2".into(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SarimaError::InvalidConfig(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Everything one run produces. Nothing touches the filesystem until
/// [`PipelineOutput::write`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub selection: GridSearchOutcome,
    pub model: FittedModel,
    pub forecast: Vec<ForecastRow>,
    pub metrics: MetricsRecord,
    pub residuals: Vec<ResidualRow>,
}

impl PipelineOutput {
    /// Write `forecast.csv`, `metrics.json` and `residuals.csv` under `outdir`;
    /// either all three are replaced or none is.
    pub fn write(&self, outdir: &Path) -> Result<()> {
        report::write_outputs(outdir, &self.forecast, &self.metrics, &self.residuals)?;
        tracing::info!(outdir = %outdir.display(), "outputs written");
        Ok(())
    }
}

pub fn run(series: &DailySeries, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    if let Ok(json) = serde_json::to_string(config) {
        tracing::debug!(config = %json, "pipeline config");
    }
    let n = series.len();
    if n <= config.val_days {
        return Err(SarimaError::InsufficientData {
            len: n,
            val_days: config.val_days,
        });
    }

    let split = n - config.val_days;
    let (train, val) = series.values().split_at(split);
    tracing::info!(train = train.len(), val = val.len(), "split series");

    let selection =
        selection::grid_search_aic(train, &config.orders, config.seasonal_period, &config.fit)?;
    let spec = selection.best.spec;

    let model = model::fit(series.values(), &spec, &config.fit)?;
    tracing::info!(%spec, aic = model.aic(), n_obs = n, "refit on full series");

    let pred = model.predict(split, n - 1)?;
    let val_rmse = rmse(val, &pred.mean)?;
    let val_mape = mape(val, &pred.mean)?;
    tracing::info!(rmse = val_rmse, mape = val_mape, "validation");

    let fc = model.forecast(config.horizon, config.alpha)?;
    let last = series.last_date();
    let forecast = (0..config.horizon)
        .map(|h| ForecastRow {
            date: last + Days::new(h as u64 + 1),
            forecast: fc.mean[h],
            lower: fc.ci_lower[h],
            upper: fc.ci_upper[h],
        })
        .collect();
    tracing::info!(horizon = config.horizon, from = %(last + Days::new(1)), "forecast");

    let offset = model.residual_offset();
    let residuals = model
        .residuals()
        .iter()
        .enumerate()
        .map(|(i, &residual)| ResidualRow {
            date: series.date_at(offset + i),
            residual,
        })
        .collect();

    let metrics = MetricsRecord::new(&spec, val_rmse, val_mape, selection.best.aic);

    Ok(PipelineOutput {
        selection,
        model,
        forecast,
        metrics,
        residuals,
    })
}
