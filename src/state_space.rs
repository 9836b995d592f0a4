use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SarimaError};
use crate::params::SarimaParams;
use crate::polynomial::{reduced_ar, reduced_ma};
use crate::types::SarimaConfig;

/// Harvey-representation state space for SARIMA.
///
/// State equation:  alpha_{t+1} = T * alpha_t + R * eta_t,  eta_t ~ N(0, Q)
/// Observation:     y_t         = Z' * alpha_t
///
/// Differencing lives inside the state: the first `d + s*D` states carry the
/// integrated levels, the remaining `k_order` states the ARMA companion block.
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub k_states: usize,
    pub k_states_diff: usize,
    pub transition: DMatrix<f64>, // T: k_states x k_states
    pub design: DVector<f64>,     // Z: k_states
    pub selection: DMatrix<f64>,  // R: k_states x 1
    pub state_cov: DMatrix<f64>,  // Q: 1 x 1, unit because the scale is concentrated
}

impl StateSpace {
    /// Build the representation for SARIMA(p,d,q)(P,D,Q,s) with D <= 1.
    pub fn new(config: &SarimaConfig, params: &SarimaParams) -> Result<Self> {
        let order = &config.order;

        if order.dd > 1 {
            return Err(SarimaError::StateSpaceError(
                "seasonal differencing D > 1 is not supported".into(),
            ));
        }

        let seasonal_terms = order.pp + order.dd + order.qq;
        if seasonal_terms > 0 && order.s < 2 {
            return Err(SarimaError::StateSpaceError(format!(
                "seasonal terms require a seasonal period s >= 2, got s={}",
                order.s
            )));
        }

        if params.ar.len() != order.p
            || params.ma.len() != order.q
            || params.sar.len() != order.pp
            || params.sma.len() != order.qq
        {
            return Err(SarimaError::ParamLengthMismatch {
                expected: order.k_params(),
                got: params.to_flat().len(),
            });
        }

        Ok(Self {
            k_states: order.k_states(),
            k_states_diff: order.k_states_diff(),
            transition: Self::build_transition(config, params),
            design: Self::build_design(config),
            selection: Self::build_selection(config, params),
            state_cov: DMatrix::from_element(1, 1, 1.0),
        })
    }

    /// Transition matrix T, assembled block by block:
    /// 1. regular differencing: upper-triangular ones over `0..d`
    /// 2. seasonal differencing: one s x s cyclic shift per layer
    /// 3. regular differencing states pick up the last seasonal state
    /// 4. differencing states pick up the first ARMA state
    /// 5. ARMA companion block
    fn build_transition(config: &SarimaConfig, params: &SarimaParams) -> DMatrix<f64> {
        let order = &config.order;
        let (d, dd, s) = (order.d, order.dd, order.s);
        let sd = order.k_states_diff();
        let ko = order.k_order();

        let mut t = DMatrix::<f64>::zeros(order.k_states(), order.k_states());

        for i in 0..d {
            for j in i..d {
                t[(i, j)] = 1.0;
            }
        }

        for layer in 0..dd {
            let base = d + layer * s;
            t[(base, base + s - 1)] = 1.0;
            for i in 0..(s - 1) {
                t[(base + i + 1, base + i)] = 1.0;
            }
        }

        if dd > 0 {
            let last_seasonal = d + s * dd - 1;
            for i in 0..d {
                t[(i, last_seasonal)] = 1.0;
            }
        }

        for i in 0..d {
            t[(i, sd)] = 1.0;
        }
        for layer in 0..dd {
            t[(d + layer * s, sd)] = 1.0;
        }

        let red_ar = reduced_ar(params, order);
        for (i, &coef) in red_ar.iter().skip(1).take(ko).enumerate() {
            t[(sd + i, sd)] = -coef;
        }
        for i in 0..ko.saturating_sub(1) {
            t[(sd + i, sd + i + 1)] = 1.0;
        }

        t
    }

    /// Design vector Z: ones on the regular differencing states, on the last
    /// state of each seasonal layer, and on the first ARMA state.
    fn build_design(config: &SarimaConfig) -> DVector<f64> {
        let order = &config.order;
        let (d, dd, s) = (order.d, order.dd, order.s);
        let sd = order.k_states_diff();

        let mut z = DVector::<f64>::zeros(order.k_states());
        for i in 0..d {
            z[i] = 1.0;
        }
        for layer in 0..dd {
            z[d + (layer + 1) * s - 1] = 1.0;
        }
        z[sd] = 1.0;
        z
    }

    /// Selection R: the reduced MA polynomial laid down the ARMA block.
    fn build_selection(config: &SarimaConfig, params: &SarimaParams) -> DMatrix<f64> {
        let order = &config.order;
        let sd = order.k_states_diff();
        let ko = order.k_order();

        let mut r = DMatrix::<f64>::zeros(order.k_states(), 1);
        let red_ma = reduced_ma(params, order);
        r[(sd, 0)] = 1.0;
        for (i, &coef) in red_ma.iter().enumerate().take(ko).skip(1) {
            r[(sd + i, 0)] = coef;
        }
        r
    }

    /// R * Q * R' (time-invariant).
    pub fn state_noise_cov(&self) -> DMatrix<f64> {
        &self.selection * &self.state_cov * self.selection.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SarimaOrder;

    fn config(p: usize, d: usize, q: usize, pp: usize, dd: usize, qq: usize, s: usize) -> SarimaConfig {
        SarimaConfig::new(SarimaOrder::new(p, d, q, pp, dd, qq, s))
    }

    fn params(ar: &[f64], ma: &[f64], sar: &[f64], sma: &[f64]) -> SarimaParams {
        SarimaParams {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sar: sar.to_vec(),
            sma: sma.to_vec(),
            sigma2: None,
        }
    }

    #[test]
    fn test_ar1_matrices() {
        let ss = StateSpace::new(&config(1, 0, 0, 0, 0, 0, 0), &params(&[0.65], &[], &[], &[])).unwrap();
        assert_eq!(ss.k_states, 1);
        assert!((ss.transition[(0, 0)] - 0.65).abs() < 1e-12);
        assert_eq!(ss.design[0], 1.0);
        assert_eq!(ss.selection[(0, 0)], 1.0);
        assert_eq!(ss.state_cov[(0, 0)], 1.0);
    }

    #[test]
    fn test_arma11_matrices() {
        // T = [[phi, 1], [0, 0]], R = [1, theta], Z = [1, 0]
        let ss = StateSpace::new(&config(1, 0, 1, 0, 0, 0, 0), &params(&[0.41], &[0.33], &[], &[])).unwrap();
        assert_eq!(ss.k_states, 2);
        assert!((ss.transition[(0, 0)] - 0.41).abs() < 1e-12);
        assert_eq!(ss.transition[(0, 1)], 1.0);
        assert_eq!(ss.transition[(1, 0)], 0.0);
        assert_eq!(ss.transition[(1, 1)], 0.0);
        assert!((ss.selection[(1, 0)] - 0.33).abs() < 1e-12);
        assert_eq!(ss.design.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn test_arima111_matrices() {
        // T = [[1, 1, 0], [0, phi, 1], [0, 0, 0]], Z = [1, 1, 0], R = [0, 1, theta]
        let ss = StateSpace::new(&config(1, 1, 1, 0, 0, 0, 0), &params(&[-0.64], &[0.7], &[], &[])).unwrap();
        assert_eq!(ss.k_states, 3);
        assert_eq!(ss.k_states_diff, 1);
        let expected = [[1.0, 1.0, 0.0], [0.0, -0.64, 1.0], [0.0, 0.0, 0.0]];
        for (i, row) in expected.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert!((ss.transition[(i, j)] - v).abs() < 1e-12, "T[{i},{j}]");
            }
        }
        assert_eq!(ss.design.as_slice(), &[1.0, 1.0, 0.0]);
        assert_eq!(ss.selection[(0, 0)], 0.0);
        assert_eq!(ss.selection[(1, 0)], 1.0);
        assert!((ss.selection[(2, 0)] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_ar2_companion() {
        // T = [[0.5, 1], [-0.3, 0]]
        let ss = StateSpace::new(&config(2, 0, 0, 0, 0, 0, 0), &params(&[0.5, -0.3], &[], &[], &[])).unwrap();
        assert!((ss.transition[(0, 0)] - 0.5).abs() < 1e-12);
        assert_eq!(ss.transition[(0, 1)], 1.0);
        assert!((ss.transition[(1, 0)] + 0.3).abs() < 1e-12);
        assert_eq!(ss.transition[(1, 1)], 0.0);
    }

    #[test]
    fn test_weekly_sarima_layout() {
        // SARIMA(1,1,1)(1,1,1,7): 8 differencing states + 9 ARMA states
        let ss = StateSpace::new(
            &config(1, 1, 1, 1, 1, 1, 7),
            &params(&[0.5], &[0.2], &[0.3], &[-0.6]),
        )
        .unwrap();
        assert_eq!(ss.k_states, 17);
        assert_eq!(ss.k_states_diff, 8);

        // regular diff feeds from itself, the last seasonal state and the ARMA block
        assert_eq!(ss.transition[(0, 0)], 1.0);
        assert_eq!(ss.transition[(0, 7)], 1.0);
        assert_eq!(ss.transition[(0, 8)], 1.0);
        // seasonal cyclic shift
        assert_eq!(ss.transition[(1, 7)], 1.0);
        for i in 1..7 {
            assert_eq!(ss.transition[(i + 1, i)], 1.0, "shift T[{}, {}]", i + 1, i);
        }
        assert_eq!(ss.transition[(1, 8)], 1.0);

        // companion first column: 0.5, 0 x5, 0.3, -0.15
        assert!((ss.transition[(8, 8)] - 0.5).abs() < 1e-12);
        assert!((ss.transition[(14, 8)] - 0.3).abs() < 1e-12);
        assert!((ss.transition[(15, 8)] + 0.15).abs() < 1e-12);
        assert_eq!(ss.transition[(16, 8)], 0.0);

        // design picks regular diff, last seasonal state, first ARMA state
        let ones: Vec<usize> = (0..17).filter(|&i| ss.design[i] == 1.0).collect();
        assert_eq!(ones, vec![0, 7, 8]);

        // selection: 1, theta, 0 x5, Theta, theta*Theta
        assert_eq!(ss.selection[(8, 0)], 1.0);
        assert!((ss.selection[(9, 0)] - 0.2).abs() < 1e-12);
        assert!((ss.selection[(15, 0)] + 0.6).abs() < 1e-12);
        assert!((ss.selection[(16, 0)] + 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_seasonal_d2_rejected() {
        let result = StateSpace::new(&config(1, 0, 0, 0, 2, 0, 7), &params(&[0.5], &[], &[], &[]));
        assert!(matches!(result, Err(SarimaError::StateSpaceError(_))));
    }

    #[test]
    fn test_seasonal_terms_need_period() {
        let result = StateSpace::new(&config(0, 0, 0, 1, 0, 0, 0), &params(&[], &[], &[0.5], &[]));
        assert!(matches!(result, Err(SarimaError::StateSpaceError(_))));
    }

    #[test]
    fn test_params_must_match_order() {
        let result = StateSpace::new(&config(2, 0, 0, 0, 0, 0, 0), &params(&[0.5], &[], &[], &[]));
        assert!(matches!(result, Err(SarimaError::ParamLengthMismatch { .. })));
    }
}
