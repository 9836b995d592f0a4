//! Starting values for the likelihood optimizer.
//!
//! The series is differenced (regular then seasonal), AR terms come from
//! Burg's method with a Yule-Walker fallback, MA terms from the innovations
//! algorithm on the AR residuals. Seasonal terms repeat the same steps on
//! autocovariances taken at multiples of the period. Anything that cannot be
//! estimated starts at zero.

use crate::error::{Result, SarimaError};
use crate::types::SarimaConfig;

const TINY: f64 = 1e-15;

/// Apply regular differencing d times.
pub(crate) fn difference(y: &[f64], d: usize) -> Vec<f64> {
    let mut out = y.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Apply seasonal differencing D times with period s.
pub(crate) fn seasonal_difference(y: &[f64], dd: usize, s: usize) -> Vec<f64> {
    if s == 0 {
        return y.to_vec();
    }
    let mut out = y.to_vec();
    for _ in 0..dd {
        if out.len() <= s {
            return vec![];
        }
        out = (s..out.len()).map(|i| out[i] - out[i - s]).collect();
    }
    out
}

/// Sample autocovariance at lag k (biased, divides by n).
fn autocovariance(y: &[f64], k: usize) -> f64 {
    let n = y.len();
    if k >= n {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / n as f64;
    let sum: f64 = y
        .iter()
        .zip(&y[k..])
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum();
    sum / n as f64
}

/// Autocovariances at lags 0, step, 2*step, ..., m*step.
fn autocovariances(y: &[f64], m: usize, step: usize) -> Vec<f64> {
    (0..=m).map(|k| autocovariance(y, k * step)).collect()
}

/// AR coefficients by Burg's method. `None` when the recursion degenerates.
fn burg_ar(y: &[f64], p: usize) -> Option<Vec<f64>> {
    if p == 0 {
        return Some(vec![]);
    }
    let n = y.len();
    if n <= p {
        return None;
    }

    let mean = y.iter().sum::<f64>() / n as f64;
    let mut ef: Vec<f64> = y.iter().map(|&v| v - mean).collect();
    let mut eb = ef.clone();
    let mut a = vec![0.0; p];

    for k in 0..p {
        let (num, den) = ((k + 1)..n).fold((0.0, 0.0), |(num, den), t| {
            (
                num + ef[t] * eb[t - 1],
                den + ef[t] * ef[t] + eb[t - 1] * eb[t - 1],
            )
        });
        if den.abs() < TINY {
            return None;
        }
        let refl = 2.0 * num / den;
        if refl.abs() >= 1.0 {
            return None;
        }

        let prev = a[..k].to_vec();
        a[k] = refl;
        for j in 0..k {
            a[j] = prev[j] - refl * prev[k - 1 - j];
        }

        // walk backwards so eb[t-1] is still the old value when read
        for t in ((k + 1)..n).rev() {
            let ef_t = ef[t];
            ef[t] = ef_t - refl * eb[t - 1];
            eb[t] = eb[t - 1] - refl * ef_t;
        }
    }

    Some(a)
}

/// Levinson-Durbin solve of the Yule-Walker system for `gammas[0..=p]`.
fn yule_walker_from_acov(gammas: &[f64], p: usize) -> Option<Vec<f64>> {
    if p == 0 {
        return Some(vec![]);
    }
    if gammas.len() <= p || gammas[0].abs() < TINY {
        return None;
    }

    let mut phi = vec![0.0; p];
    let mut var = gammas[0];
    for k in 0..p {
        if var.abs() < TINY {
            return None;
        }
        let num = gammas[k + 1] - (0..k).map(|j| phi[j] * gammas[k - j]).sum::<f64>();
        let lambda = num / var;

        let prev = phi.clone();
        phi[k] = lambda;
        for j in 0..k {
            phi[j] = prev[j] - lambda * prev[k - 1 - j];
        }
        var *= 1.0 - lambda * lambda;
    }
    Some(phi)
}

fn yule_walker(y: &[f64], p: usize) -> Option<Vec<f64>> {
    if y.len() <= p {
        return None;
    }
    yule_walker_from_acov(&autocovariances(y, p, 1), p)
}

/// MA coefficients from autocovariances by the innovations algorithm
/// (Brockwell and Davis, section 5.2). Clamped into (-0.99, 0.99).
fn innovations_ma(gammas: &[f64], q: usize) -> Vec<f64> {
    if q == 0 || gammas.len() <= q || gammas[0].abs() < TINY {
        return vec![0.0; q];
    }

    let mut theta = vec![vec![0.0; q]; q + 1];
    let mut v = vec![0.0; q + 1];
    v[0] = gammas[0];

    for i in 1..=q {
        for k in 0..i {
            let mut sum = gammas[i - k];
            for j in 0..k {
                sum -= theta[k][k - 1 - j] * theta[i][i - 1 - j] * v[j];
            }
            theta[i][i - 1 - k] = if v[k].abs() > TINY { sum / v[k] } else { 0.0 };
        }
        let explained: f64 = (0..i).map(|j| theta[i][i - 1 - j].powi(2) * v[j]).sum();
        v[i] = (gammas[0] - explained).max(TINY);
    }

    theta[q].iter().map(|c| c.clamp(-0.99, 0.99)).collect()
}

/// Residuals of `y_t - sum_j c_j y_{t-(j+1)*step}`.
fn ar_residuals(y: &[f64], coeffs: &[f64], step: usize) -> Vec<f64> {
    if coeffs.is_empty() || step == 0 {
        return y.to_vec();
    }
    let start = coeffs.len() * step;
    if y.len() <= start {
        return vec![];
    }
    (start..y.len())
        .map(|t| {
            let pred: f64 = coeffs
                .iter()
                .enumerate()
                .map(|(j, c)| c * y[t - (j + 1) * step])
                .sum();
            y[t] - pred
        })
        .collect()
}

/// Starting parameters in the flat layout `[ar(p) | ma(q) | sar(P) | sma(Q)]`.
pub fn compute_start_params(endog: &[f64], config: &SarimaConfig) -> Result<Vec<f64>> {
    let order = &config.order;
    let (p, q, pp, qq, s) = (order.p, order.q, order.pp, order.qq, order.s);
    let n_params = order.k_params();

    let diffed = seasonal_difference(&difference(endog, order.d), order.dd, s);
    if diffed.len() < 3 {
        return Ok(vec![0.0; n_params]);
    }

    let ar = burg_ar(&diffed, p)
        .or_else(|| yule_walker(&diffed, p))
        .unwrap_or_else(|| vec![0.0; p]);
    let residuals = ar_residuals(&diffed, &ar, 1);
    let ma = innovations_ma(&autocovariances(&residuals, q, 1), q);

    let sar = if pp > 0 && s > 0 && diffed.len() > pp * s {
        yule_walker_from_acov(&autocovariances(&diffed, pp, s), pp).unwrap_or_else(|| vec![0.0; pp])
    } else {
        vec![0.0; pp]
    };

    let sma = if qq > 0 && s > 0 {
        let seasonal_resid = if pp > 0 {
            ar_residuals(&diffed, &sar, s)
        } else {
            residuals
        };
        if seasonal_resid.len() > qq * s {
            innovations_ma(&autocovariances(&seasonal_resid, qq, s), qq)
        } else {
            vec![0.0; qq]
        }
    } else {
        vec![0.0; qq]
    };

    let params = [ar, ma, sar, sma].concat();
    if params.len() != n_params {
        return Err(SarimaError::DataError(format!(
            "start params: expected length {n_params}, got {}",
            params.len()
        )));
    }
    if let Some(bad) = params.iter().find(|x| !x.is_finite()) {
        return Err(SarimaError::DataError(format!(
            "start params contain non-finite value {bad}"
        )));
    }
    Ok(params)
}
