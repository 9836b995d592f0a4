use crate::error::{Result, SarimaError};
use crate::types::SarimaOrder;

/// Structured SARIMA coefficients.
///
/// Flat layout: `[ar(p) | ma(q) | sar(P) | sma(Q)]`. The noise variance is
/// concentrated out of the likelihood and only filled in after a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct SarimaParams {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sar: Vec<f64>,
    pub sma: Vec<f64>,
    pub sigma2: Option<f64>,
}

impl SarimaParams {
    pub fn from_flat(flat: &[f64], order: &SarimaOrder) -> Result<Self> {
        let expected = order.k_params();
        if flat.len() != expected {
            return Err(SarimaError::ParamLengthMismatch {
                expected,
                got: flat.len(),
            });
        }

        let (ar, rest) = flat.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (sar, sma) = rest.split_at(order.pp);

        Ok(Self {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sar: sar.to_vec(),
            sma: sma.to_vec(),
            sigma2: None,
        })
    }

    pub fn to_flat(&self) -> Vec<f64> {
        [&self.ar[..], &self.ma, &self.sar, &self.sma].concat()
    }

    /// Parameter count for information criteria; sigma2 is always counted.
    pub fn n_estimated_params(order: &SarimaOrder) -> usize {
        order.k_params() + 1
    }
}

// Monahan (1984) / Jones (1980) reparameterization: any real vector maps to a
// lag polynomial with all roots outside the unit circle.

/// Unconstrained reals -> stationary AR coefficients.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    if n == 0 {
        return vec![];
    }

    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|&x| x / (1.0 + x * x).sqrt())
        .collect();

    // Levinson-Durbin on the partial autocorrelations
    let mut y = vec![vec![0.0; n]; n];
    for k in 0..n {
        for i in 0..k {
            y[k][i] = y[k - 1][i] + pacf[k] * y[k - 1][k - i - 1];
        }
        y[k][k] = pacf[k];
    }

    y[n - 1].iter().map(|&v| -v).collect()
}

/// Stationary AR coefficients -> unconstrained reals.
pub fn unconstrain_stationary(constrained: &[f64]) -> Vec<f64> {
    let n = constrained.len();
    if n == 0 {
        return vec![];
    }

    let mut y = vec![vec![0.0; n]; n];
    for (dst, &c) in y[n - 1].iter_mut().zip(constrained) {
        *dst = -c;
    }

    for k in (1..n).rev() {
        let rk = y[k][k];
        let denom = (1.0 - rk * rk).max(1e-15);
        for i in 0..k {
            y[k - 1][i] = (y[k][i] - rk * y[k][k - i - 1]) / denom;
        }
    }

    (0..n)
        .map(|k| {
            let r = y[k][k];
            r / (1.0 - r * r).max(1e-15).sqrt()
        })
        .collect()
}

/// Unconstrained reals -> invertible MA coefficients.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|x| -x)
        .collect()
}

/// Invertible MA coefficients -> unconstrained reals.
pub fn unconstrain_invertible(constrained: &[f64]) -> Vec<f64> {
    let negated: Vec<f64> = constrained.iter().map(|&x| -x).collect();
    unconstrain_stationary(&negated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_to_flat_roundtrip() {
        let order = SarimaOrder::new(2, 0, 1, 1, 0, 1, 7);
        let flat = vec![0.5, -0.3, 0.2, 0.4, -0.1];
        let params = SarimaParams::from_flat(&flat, &order).unwrap();
        assert_eq!(params.ar, vec![0.5, -0.3]);
        assert_eq!(params.ma, vec![0.2]);
        assert_eq!(params.sar, vec![0.4]);
        assert_eq!(params.sma, vec![-0.1]);
        assert!(params.sigma2.is_none());
        assert_eq!(params.to_flat(), flat);
    }

    #[test]
    fn test_from_flat_length_mismatch() {
        let order = SarimaOrder::new(1, 0, 0, 0, 0, 0, 0);
        let err = SarimaParams::from_flat(&[0.5, 0.3], &order).unwrap_err();
        assert!(matches!(
            err,
            SarimaError::ParamLengthMismatch { expected: 1, got: 2 }
        ));
    }

    #[test]
    fn test_n_estimated_params_counts_sigma2() {
        let order = SarimaOrder::new(1, 1, 1, 1, 1, 1, 7);
        assert_eq!(SarimaParams::n_estimated_params(&order), 5);
        let white_noise = SarimaOrder::new(0, 1, 0, 0, 1, 0, 7);
        assert_eq!(SarimaParams::n_estimated_params(&white_noise), 1);
    }

    #[test]
    fn test_monahan_roundtrip_ar2() {
        let original = vec![0.5, -0.3];
        let recovered = unconstrain_stationary(&constrain_stationary(&original));
        for (a, b) in original.iter().zip(&recovered) {
            assert!((a - b).abs() < 1e-10, "roundtrip failed: {a} vs {b}");
        }
    }

    #[test]
    fn test_constrained_ar1_inside_unit_interval() {
        for x in [-50.0, -1.0, 0.0, 2.0, 1e3] {
            let phi = constrain_stationary(&[x])[0];
            assert!(phi.abs() < 1.0, "phi={phi} for x={x}");
        }
    }

    #[test]
    fn test_constrain_stationary_empty() {
        assert!(constrain_stationary(&[]).is_empty());
        assert!(unconstrain_stationary(&[]).is_empty());
    }

    #[test]
    fn test_invertible_roundtrip() {
        let original = vec![0.4, -0.2];
        let recovered = unconstrain_invertible(&constrain_invertible(&original));
        for (a, b) in original.iter().zip(&recovered) {
            assert!((a - b).abs() < 1e-10);
        }
    }
}
