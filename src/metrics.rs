//! Accuracy metrics for validation forecasts.

use crate::error::{Result, SarimaError};

/// Denominator floor for MAPE so zero actuals stay finite.
pub const MAPE_EPSILON: f64 = 1e-9;

fn check_inputs(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(SarimaError::ShapeMismatch {
            expected: y_true.len(),
            got: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(SarimaError::EmptyInput);
    }
    Ok(())
}

/// Root mean squared error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64;
    Ok(mse.sqrt())
}

/// Mean absolute percentage error, in percent: `100 * mean |(t - p) / max(eps, |t|)|`.
pub fn mape(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| ((t - p) / t.abs().max(MAPE_EPSILON)).abs())
        .sum();
    Ok(total / y_true.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rmse_known_value() {
        // errors 1, -1, 2 -> sqrt(6/3)
        let r = rmse(&[1.0, 2.0, 3.0], &[0.0, 3.0, 1.0]).unwrap();
        assert_relative_eq!(r, 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_prediction() {
        let y = [10.0, 20.0, 30.0];
        assert_eq!(rmse(&y, &y).unwrap(), 0.0);
        assert_eq!(mape(&y, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_mape_known_value() {
        // 10% and 50%
        let m = mape(&[100.0, 4.0], &[110.0, 2.0]).unwrap();
        assert_relative_eq!(m, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mape_zero_actual_is_floored() {
        let m = mape(&[0.0], &[1e-9]).unwrap();
        assert_relative_eq!(m, 100.0, epsilon = 1e-6);
        assert!(mape(&[0.0, 5.0], &[3.0, 5.0]).unwrap().is_finite());
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(matches!(
            rmse(&[1.0, 2.0], &[1.0]),
            Err(SarimaError::ShapeMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            mape(&[1.0], &[1.0, 2.0]),
            Err(SarimaError::ShapeMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(rmse(&[], &[]), Err(SarimaError::EmptyInput)));
        assert!(matches!(mape(&[], &[]), Err(SarimaError::EmptyInput)));
    }
}
