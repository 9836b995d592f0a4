//! Lag polynomials in ascending powers of L, leading coefficient 1.

use crate::params::SarimaParams;
use crate::types::SarimaOrder;

/// Polynomial product (discrete convolution of coefficient vectors).
pub fn polymul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// `1 + sign*c_1 L^step + sign*c_2 L^(2 step) + ...`
///
/// AR polynomials use `sign = -1`, MA polynomials `sign = +1`; seasonal ones
/// use `step = s`.
pub fn lag_polynomial(coeffs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coeffs.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coeffs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// Full AR polynomial `phi(L) * Phi(L^s)`.
pub fn reduced_ar(params: &SarimaParams, order: &SarimaOrder) -> Vec<f64> {
    polymul(
        &lag_polynomial(&params.ar, 1, -1.0),
        &lag_polynomial(&params.sar, order.s, -1.0),
    )
}

/// Full MA polynomial `theta(L) * Theta(L^s)`.
pub fn reduced_ma(params: &SarimaParams, order: &SarimaOrder) -> Vec<f64> {
    polymul(
        &lag_polynomial(&params.ma, 1, 1.0),
        &lag_polynomial(&params.sma, order.s, 1.0),
    )
}
