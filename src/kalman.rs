use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SarimaError};
use crate::initialization::KalmanInit;
use crate::state_space::StateSpace;

/// Largest element change in P_{t+1|t} below which the gain is frozen.
const STEADY_STATE_TOL: f64 = 1e-9;

/// Everything the filter produces for one pass over the data.
#[derive(Debug, Clone)]
pub struct KalmanFilterOutput {
    /// Concentrated log-likelihood.
    pub loglike: f64,
    /// Concentrated scale sigma2_hat.
    pub scale: f64,
    /// One-step-ahead prediction errors v_t.
    pub innovations: Vec<f64>,
    /// Unscaled innovation variances F_t; multiply by `scale` for Var(v_t).
    pub innovation_vars: Vec<f64>,
    /// One-step-ahead predictions Z' a_{t|t-1}.
    pub predictions: Vec<f64>,
    /// a_{n+1|n}: the state prediction after the last observation.
    pub predicted_state: DVector<f64>,
    /// P_{n+1|n}, unscaled.
    pub predicted_cov: DMatrix<f64>,
    /// n - burn.
    pub n_obs_effective: usize,
    /// First time index that reused a frozen steady-state gain, if any.
    pub steady_state_from: Option<usize>,
}

/// Log-likelihood summary without the per-observation series.
#[derive(Debug, Clone, Copy)]
pub struct KalmanOutput {
    pub loglike: f64,
    pub scale: f64,
    pub n_obs_effective: usize,
}

/// Run the Kalman filter and compute the concentrated log-likelihood.
///
/// Harvey-form recursion, univariate observation, no measurement error:
///   v_t = y_t - Z' a_{t|t-1},  F_t = Z' P_{t|t-1} Z,  K_t = P_{t|t-1} Z / F_t
///   a_{t+1|t} = T (a_{t|t-1} + K_t v_t)
///   P_{t+1|t} = T (P_{t|t-1} - K_t K_t' F_t) T' + R Q R'
///
/// Once P_{t+1|t} stops moving the gain is frozen and only the state is
/// propagated. With the scale concentrated out:
///   sigma2_hat = (1/n_eff) sum v_t^2 / F_t
///   loglike    = -n_eff/2 (ln 2pi + ln sigma2_hat + 1) - 1/2 sum ln F_t
pub fn kalman_filter(
    endog: &[f64],
    ss: &StateSpace,
    init: &KalmanInit,
) -> Result<KalmanFilterOutput> {
    run_filter(endog, ss, init, STEADY_STATE_TOL)
}

/// Concentrated log-likelihood only.
pub fn kalman_loglike(endog: &[f64], ss: &StateSpace, init: &KalmanInit) -> Result<KalmanOutput> {
    let out = kalman_filter(endog, ss, init)?;
    Ok(KalmanOutput {
        loglike: out.loglike,
        scale: out.scale,
        n_obs_effective: out.n_obs_effective,
    })
}

fn run_filter(
    endog: &[f64],
    ss: &StateSpace,
    init: &KalmanInit,
    steady_tol: f64,
) -> Result<KalmanFilterOutput> {
    let n = endog.len();
    let burn = init.loglikelihood_burn;
    if n <= burn {
        return Err(SarimaError::DataError(format!(
            "not enough observations: n={n} <= burn={burn}"
        )));
    }
    let n_eff = n - burn;

    let t_mat = &ss.transition;
    let t_tr = t_mat.transpose();
    let z = &ss.design;
    let rqr = ss.state_noise_cov();

    let mut a = init.initial_state.clone();
    let mut p = init.initial_state_cov.clone();
    let mut frozen: Option<(f64, DVector<f64>)> = None;
    let mut steady_state_from = None;

    let mut sum_log_f = 0.0;
    let mut sum_v2_f = 0.0;
    let mut innovations = Vec::with_capacity(n);
    let mut innovation_vars = Vec::with_capacity(n);
    let mut predictions = Vec::with_capacity(n);

    for (t, &y) in endog.iter().enumerate() {
        let (f_t, gain) = match frozen.take() {
            Some(cached) => cached,
            None => {
                let p_z = &p * z;
                let f_t = z.dot(&p_z);
                if !f_t.is_finite() || f_t <= 0.0 {
                    return Err(SarimaError::DataError(format!(
                        "innovation variance {f_t} at t={t} is not positive"
                    )));
                }
                (f_t, p_z / f_t)
            }
        };

        let y_hat = z.dot(&a);
        let v_t = y - y_hat;
        predictions.push(y_hat);
        innovations.push(v_t);
        innovation_vars.push(f_t);

        if t >= burn {
            sum_log_f += f_t.ln();
            sum_v2_f += v_t * v_t / f_t;
        }

        a = t_mat * (&a + &gain * v_t);

        if steady_state_from.is_none() {
            let p_upd = &p - (&gain * gain.transpose()) * f_t;
            let raw = t_mat * p_upd * &t_tr + &rqr;
            let p_next = (&raw + raw.transpose()) * 0.5;
            let delta = (&p_next - &p).amax();
            p = p_next;
            if delta < steady_tol {
                steady_state_from = Some(t + 1);
            }
        }
        if steady_state_from.is_some() {
            frozen = Some((f_t, gain));
        }
    }

    let n_eff_f = n_eff as f64;
    let scale = sum_v2_f / n_eff_f;
    let loglike = -0.5 * n_eff_f * (2.0 * std::f64::consts::PI).ln()
        - 0.5 * n_eff_f * scale.max(1e-300).ln()
        - 0.5 * n_eff_f
        - 0.5 * sum_log_f;

    Ok(KalmanFilterOutput {
        loglike,
        scale,
        innovations,
        innovation_vars,
        predictions,
        predicted_state: a,
        predicted_cov: p,
        n_obs_effective: n_eff,
        steady_state_from,
    })
}
