use nalgebra::{DMatrix, DVector};

use crate::state_space::StateSpace;

/// Kalman filter initial state and covariance.
#[derive(Debug, Clone)]
pub struct KalmanInit {
    /// Initial state a_0 (zeros).
    pub initial_state: DVector<f64>,
    /// Initial state covariance P_0 (kappa * I).
    pub initial_state_cov: DMatrix<f64>,
    /// Observations excluded from the log-likelihood while the diffuse prior washes out.
    pub loglikelihood_burn: usize,
}

impl KalmanInit {
    /// Approximate diffuse initialization: a_0 = 0, P_0 = kappa * I, burn = k_states.
    pub fn approximate_diffuse(k_states: usize, kappa: f64) -> Self {
        Self {
            initial_state: DVector::zeros(k_states),
            initial_state_cov: DMatrix::identity(k_states, k_states) * kappa,
            loglikelihood_burn: k_states,
        }
    }

    /// Initialization used for every fit of a built state space.
    pub fn for_state_space(ss: &StateSpace) -> Self {
        Self::approximate_diffuse(ss.k_states, Self::default_kappa())
    }

    pub fn default_kappa() -> f64 {
        1e6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_diffuse_basic() {
        let init = KalmanInit::approximate_diffuse(2, 1e6);
        assert_eq!(init.initial_state.as_slice(), &[0.0, 0.0]);
        assert_eq!(init.initial_state_cov[(0, 0)], 1e6);
        assert_eq!(init.initial_state_cov[(0, 1)], 0.0);
        assert_eq!(init.initial_state_cov[(1, 1)], 1e6);
        assert_eq!(init.loglikelihood_burn, 2);
    }
}
