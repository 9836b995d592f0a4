use std::fmt;

use serde::Serialize;

/// Engine-level SARIMA order with the seasonal components flattened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SarimaOrder {
    pub p: usize,  // AR order
    pub d: usize,  // differencing order
    pub q: usize,  // MA order
    pub pp: usize, // seasonal AR order (P)
    pub dd: usize, // seasonal differencing order (D)
    pub qq: usize, // seasonal MA order (Q)
    pub s: usize,  // seasonal period
}

impl SarimaOrder {
    pub fn new(p: usize, d: usize, q: usize, pp: usize, dd: usize, qq: usize, s: usize) -> Self {
        Self { p, d, q, pp, dd, qq, s }
    }

    /// Extended AR order: p + s*P
    pub fn k_ar(&self) -> usize {
        self.p + self.s * self.pp
    }

    /// Extended MA order: q + s*Q
    pub fn k_ma(&self) -> usize {
        self.q + self.s * self.qq
    }

    /// State space ARMA dimension: max(k_ar, k_ma + 1)
    pub fn k_order(&self) -> usize {
        std::cmp::max(self.k_ar(), self.k_ma() + 1)
    }

    /// Differencing state dimension: d + s*D
    pub fn k_states_diff(&self) -> usize {
        self.d + self.s * self.dd
    }

    /// Total state dimension
    pub fn k_states(&self) -> usize {
        self.k_order() + self.k_states_diff()
    }

    /// Number of free ARMA coefficients: p + q + P + Q.
    pub fn k_params(&self) -> usize {
        self.p + self.q + self.pp + self.qq
    }
}

/// A candidate model: non-seasonal `(p, d, q)` plus optional `(P, D, Q, s)`.
///
/// Serializes as `{"order": [p, d, q], "seasonal_order": [P, D, Q, s] | null}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelSpec {
    pub order: (usize, usize, usize),
    pub seasonal_order: Option<(usize, usize, usize, usize)>,
}

impl ModelSpec {
    pub fn new(
        order: (usize, usize, usize),
        seasonal_order: Option<(usize, usize, usize, usize)>,
    ) -> Self {
        Self { order, seasonal_order }
    }

    /// Non-seasonal ARIMA(p, d, q).
    pub fn arima(p: usize, d: usize, q: usize) -> Self {
        Self::new((p, d, q), None)
    }

    /// SARIMA(p, d, q)(P, D, Q, s).
    pub fn sarima(order: (usize, usize, usize), seasonal: (usize, usize, usize, usize)) -> Self {
        Self::new(order, Some(seasonal))
    }

    pub fn sarima_order(&self) -> SarimaOrder {
        let (p, d, q) = self.order;
        let (pp, dd, qq, s) = self.seasonal_order.unwrap_or((0, 0, 0, 0));
        SarimaOrder::new(p, d, q, pp, dd, qq, s)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (p, d, q) = self.order;
        match self.seasonal_order {
            Some((pp, dd, qq, s)) => write!(f, "SARIMA({p},{d},{q})({pp},{dd},{qq},{s})"),
            None => write!(f, "ARIMA({p},{d},{q})"),
        }
    }
}

impl From<&ModelSpec> for SarimaOrder {
    fn from(spec: &ModelSpec) -> Self {
        spec.sarima_order()
    }
}

/// Model configuration.
///
/// The noise variance is always concentrated out of the likelihood.
#[derive(Debug, Clone)]
pub struct SarimaConfig {
    pub order: SarimaOrder,
    pub enforce_stationarity: bool,
    pub enforce_invertibility: bool,
}

impl SarimaConfig {
    pub fn new(order: SarimaOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            order: SarimaOrder::new(1, 0, 0, 0, 0, 0, 0),
            enforce_stationarity: false,
            enforce_invertibility: false,
        }
    }
}

/// Fit result returned by the optimizer.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Constrained parameters, layout `[ar(p) | ma(q) | sar(P) | sma(Q)]`.
    pub params: Vec<f64>,
    pub loglike: f64,
    pub scale: f64,
    pub n_obs: usize,
    pub n_params: usize,
    pub n_iter: u64,
    pub converged: bool,
    pub method: String,
    pub aic: f64,
    pub bic: f64,
}

impl FitResult {
    /// Fill in AIC = 2k - 2ll and BIC = k ln(n) - 2ll.
    pub fn with_information_criteria(mut self) -> Self {
        let k = self.n_params as f64;
        self.aic = 2.0 * k - 2.0 * self.loglike;
        self.bic = k * (self.n_obs as f64).ln() - 2.0 * self.loglike;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sarima_111_111_7_k_states() {
        // SARIMA(1,1,1)(1,1,1,7)
        // k_ar = 1 + 7 = 8, k_ma = 1 + 7 = 8
        // k_order = max(8, 9) = 9, k_states_diff = 1 + 7 = 8
        let order = SarimaOrder::new(1, 1, 1, 1, 1, 1, 7);
        assert_eq!(order.k_ar(), 8);
        assert_eq!(order.k_ma(), 8);
        assert_eq!(order.k_order(), 9);
        assert_eq!(order.k_states_diff(), 8);
        assert_eq!(order.k_states(), 17);
    }

    #[test]
    fn test_arima_110_k_states() {
        let order = SarimaOrder::new(1, 1, 0, 0, 0, 0, 0);
        assert_eq!(order.k_order(), 1);
        assert_eq!(order.k_states_diff(), 1);
        assert_eq!(order.k_states(), 2);
    }

    #[test]
    fn test_seasonal_zero_terms_keep_dimension() {
        // (0,0,0,7) seasonal order adds nothing to the state
        let spec = ModelSpec::sarima((2, 0, 1), (0, 0, 0, 7));
        let order = spec.sarima_order();
        assert_eq!(order.k_states(), ModelSpec::arima(2, 0, 1).sarima_order().k_states());
    }

    #[test]
    fn test_spec_display() {
        assert_eq!(ModelSpec::arima(1, 0, 2).to_string(), "ARIMA(1,0,2)");
        assert_eq!(
            ModelSpec::sarima((1, 1, 1), (0, 1, 1, 7)).to_string(),
            "SARIMA(1,1,1)(0,1,1,7)"
        );
    }

    #[test]
    fn test_spec_serializes_as_arrays() {
        let spec = ModelSpec::sarima((1, 1, 1), (0, 1, 1, 7));
        let json = serde_json::to_value(spec).unwrap();
        assert_eq!(json["order"], serde_json::json!([1, 1, 1]));
        assert_eq!(json["seasonal_order"], serde_json::json!([0, 1, 1, 7]));

        let json = serde_json::to_value(ModelSpec::arima(2, 0, 0)).unwrap();
        assert!(json["seasonal_order"].is_null());
    }

    #[test]
    fn test_information_criteria() {
        let r = FitResult {
            params: vec![0.5],
            loglike: -100.0,
            scale: 1.0,
            n_obs: 100,
            n_params: 2,
            n_iter: 10,
            converged: true,
            method: "lbfgs".into(),
            aic: 0.0,
            bic: 0.0,
        }
        .with_information_criteria();
        assert!((r.aic - 204.0).abs() < 1e-12);
        assert!((r.bic - (2.0 * 100f64.ln() + 200.0)).abs() < 1e-12);
    }

    #[test]
    fn test_default_config() {
        let config = SarimaConfig::default();
        assert_eq!(config.order.p, 1);
        assert!(!config.enforce_stationarity);
        assert!(!config.enforce_invertibility);
    }
}
