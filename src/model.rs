//! Fitted seasonal ARIMA model: one fit per `ModelSpec`, read-only afterwards.

use crate::error::{Result, SarimaError};
use crate::forecast::{self, ForecastResult, Prediction};
use crate::initialization::KalmanInit;
use crate::kalman::{kalman_filter, KalmanFilterOutput};
use crate::optimizer::{self, FitOptions};
use crate::params::SarimaParams;
use crate::state_space::StateSpace;
use crate::types::{FitResult, ModelSpec, SarimaConfig};

#[derive(Debug, Clone)]
pub struct FittedModel {
    spec: ModelSpec,
    config: SarimaConfig,
    params: SarimaParams,
    result: FitResult,
    state_space: StateSpace,
    filter: KalmanFilterOutput,
}

/// Fit `spec` to `series` by maximum likelihood.
///
/// Every failure, including an optimizer that stops short of convergence,
/// comes back as `SarimaError::FitFailure` naming the `ModelSpec`.
pub fn fit(series: &[f64], spec: &ModelSpec, options: &FitOptions) -> Result<FittedModel> {
    FittedModel::fit(series, spec, options).map_err(|e| match e {
        SarimaError::FitFailure { .. } => e,
        other => SarimaError::FitFailure {
            spec: *spec,
            reason: other.to_string(),
        },
    })
}

impl FittedModel {
    fn fit(series: &[f64], spec: &ModelSpec, options: &FitOptions) -> Result<Self> {
        let config = options.config_for(spec.sarima_order());
        let result = optimizer::fit(series, &config, options)?;
        if !result.converged {
            return Err(SarimaError::FitFailure {
                spec: *spec,
                reason: format!(
                    "{} did not converge within {} iterations",
                    result.method, options.maxiter
                ),
            });
        }

        let mut params = SarimaParams::from_flat(&result.params, &config.order)?;
        params.sigma2 = Some(result.scale);
        let state_space = StateSpace::new(&config, &params)?;
        let init = KalmanInit::for_state_space(&state_space);
        let filter = kalman_filter(series, &state_space, &init)?;

        tracing::trace!(%spec, loglike = result.loglike, n_iter = result.n_iter, method = %result.method, "fitted");

        Ok(Self {
            spec: *spec,
            config,
            params,
            result,
            state_space,
            filter,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn config(&self) -> &SarimaConfig {
        &self.config
    }

    /// Estimated coefficients; `sigma2` holds the concentrated scale.
    pub fn params(&self) -> &SarimaParams {
        &self.params
    }

    pub fn fit_result(&self) -> &FitResult {
        &self.result
    }

    pub fn filter_output(&self) -> &KalmanFilterOutput {
        &self.filter
    }

    pub fn loglike(&self) -> f64 {
        self.result.loglike
    }

    /// `2k - 2 loglike`, k = p + q + P + Q + 1.
    pub fn aic(&self) -> f64 {
        self.result.aic
    }

    pub fn bic(&self) -> f64 {
        self.result.bic
    }

    pub fn n_obs(&self) -> usize {
        self.filter.innovations.len()
    }

    /// Observations consumed by differencing, `d + s*D`.
    pub fn residual_offset(&self) -> usize {
        self.config.order.k_states_diff()
    }

    /// One-step-ahead prediction errors from `residual_offset()` on.
    pub fn residuals(&self) -> &[f64] {
        let offset = self.residual_offset().min(self.filter.innovations.len());
        &self.filter.innovations[offset..]
    }

    /// Fixed-origin one-step-ahead predictions for indices `start..=end`.
    pub fn predict(&self, start: usize, end: usize) -> Result<Prediction> {
        let first_available = self.residual_offset();
        if start < first_available {
            return Err(SarimaError::PredictionUnavailable {
                index: start,
                first_available,
            });
        }
        let n = self.n_obs();
        if start > end || end >= n {
            return Err(SarimaError::InvalidInput(format!(
                "prediction range {start}..={end} outside 0..{n} or reversed"
            )));
        }
        Ok(forecast::one_step_predictions(&self.filter, start, end))
    }

    /// Out-of-sample forecast `horizon` steps past the last observation.
    pub fn forecast(&self, horizon: usize, alpha: f64) -> Result<ForecastResult> {
        forecast::forecast(&self.state_space, &self.filter, horizon, alpha)
    }
}
