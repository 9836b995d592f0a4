use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{Result, SarimaError};
use crate::kalman::KalmanFilterOutput;
use crate::state_space::StateSpace;

/// H-step ahead forecast result.
#[derive(Debug, Clone)]
pub struct ForecastResult {
    /// Forecast means E[y_{n+h}] for h = 1..steps.
    pub mean: Vec<f64>,
    /// Forecast variances Var[y_{n+h}].
    pub variance: Vec<f64>,
    pub ci_lower: Vec<f64>,
    pub ci_upper: Vec<f64>,
}

/// One-step-ahead in-sample predictions over an index range.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// First observation index covered.
    pub start: usize,
    pub mean: Vec<f64>,
    pub std_err: Vec<f64>,
}

impl Prediction {
    /// `mean -/+ z(1 - alpha/2) * std_err`.
    pub fn conf_int(&self, alpha: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let z = z_critical(alpha)?;
        Ok(self
            .mean
            .iter()
            .zip(&self.std_err)
            .map(|(m, se)| (m - z * se, m + z * se))
            .unzip())
    }
}

/// Two-sided standard normal critical value z(1 - alpha/2).
pub fn z_critical(alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(SarimaError::InvalidInput(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| SarimaError::InvalidInput(e.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// Forecast `steps` periods past the end of the filtered sample.
///
/// Starts from a_{n+1|n}, P_{n+1|n} and propagates without observations:
///   y_hat_h = Z' a_h
///   F_h     = Z' P_h Z * scale
///   a_{h+1} = T a_h
///   P_{h+1} = T P_h T' + R Q R'
pub fn forecast(
    ss: &StateSpace,
    filter_output: &KalmanFilterOutput,
    steps: usize,
    alpha: f64,
) -> Result<ForecastResult> {
    let z_alpha = z_critical(alpha)?;

    let z = &ss.design;
    let t_mat = &ss.transition;
    let t_tr = t_mat.transpose();
    let rqr = ss.state_noise_cov();
    let scale = filter_output.scale;

    let mut a = filter_output.predicted_state.clone();
    let mut p = filter_output.predicted_cov.clone();

    let mut mean = Vec::with_capacity(steps);
    let mut variance = Vec::with_capacity(steps);
    let mut ci_lower = Vec::with_capacity(steps);
    let mut ci_upper = Vec::with_capacity(steps);

    for _ in 0..steps {
        let y_hat = z.dot(&a);
        let f_h = (z.dot(&(&p * z)) * scale).max(0.0);
        let se = f_h.sqrt();

        mean.push(y_hat);
        variance.push(f_h);
        ci_lower.push(y_hat - z_alpha * se);
        ci_upper.push(y_hat + z_alpha * se);

        a = t_mat * &a;
        p = t_mat * &p * &t_tr + &rqr;
    }

    Ok(ForecastResult {
        mean,
        variance,
        ci_lower,
        ci_upper,
    })
}

/// One-step-ahead predictions for observations `start..=end`, with standard
/// errors sqrt(F_t * scale). Bounds are checked by the caller.
pub fn one_step_predictions(filter_output: &KalmanFilterOutput, start: usize, end: usize) -> Prediction {
    let scale = filter_output.scale;
    let range = start..=end;
    Prediction {
        start,
        mean: filter_output.predictions[range.clone()].to_vec(),
        std_err: filter_output.innovation_vars[range]
            .iter()
            .map(|f| (f * scale).max(0.0).sqrt())
            .collect(),
    }
}
