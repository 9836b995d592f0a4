//! Synthetic daily sales: trend, weekly and annual cycles, Gaussian noise.

use std::f64::consts::PI;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, SarimaError};
use crate::series::DailySeries;

pub const BASE_LEVEL: f64 = 50.0;
pub const TREND_PER_DAY: f64 = 0.02;
pub const WEEKLY_AMPLITUDE: f64 = 3.0;
pub const ANNUAL_AMPLITUDE: f64 = 5.0;
pub const NOISE_SD: f64 = 2.0;

/// Deterministic component for day `t`.
fn signal(t: usize) -> f64 {
    let tf = t as f64;
    let weekly = WEEKLY_AMPLITUDE * (2.0 * PI * (t % 7) as f64 / 7.0).sin();
    let annual = ANNUAL_AMPLITUDE * (2.0 * PI * tf / 365.25).sin();
    BASE_LEVEL + TREND_PER_DAY * tf + weekly + annual
}

/// One value per day from `start` to `end` inclusive, rounded half-to-even and
/// clipped at zero. The same seed always yields the same series.
pub fn generate(start: NaiveDate, end: NaiveDate, seed: u64) -> Result<DailySeries> {
    if end < start {
        return Err(SarimaError::InvalidInput(format!(
            "end date {end} is before start date {start}"
        )));
    }
    let n = (end - start).num_days() as usize + 1;

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, NOISE_SD).map_err(|e| SarimaError::InvalidInput(e.to_string()))?;

    let values = (0..n)
        .map(|t| (signal(t) + noise.sample(&mut rng)).round_ties_even().max(0.0))
        .collect();

    let series = DailySeries::new(start, values)?;
    tracing::info!(%start, %end, seed, n_obs = series.len(), "generated synthetic series");
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_length_and_calendar() {
        let s = generate(date("2021-01-01"), date("2021-12-31"), 42).unwrap();
        assert_eq!(s.len(), 365);
        assert_eq!(s.start(), date("2021-01-01"));
        assert_eq!(s.last_date(), date("2021-12-31"));
    }

    #[test]
    fn test_same_seed_same_series() {
        let a = generate(date("2021-01-01"), date("2021-03-01"), 7).unwrap();
        let b = generate(date("2021-01-01"), date("2021-03-01"), 7).unwrap();
        let c = generate(date("2021-01-01"), date("2021-03-01"), 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_values_are_non_negative_integers_near_signal() {
        let s = generate(date("2020-01-01"), date("2022-12-31"), 42).unwrap();
        for (t, &v) in s.values().iter().enumerate() {
            assert!(v >= 0.0 && v.fract() == 0.0);
            // 6 sd plus rounding
            assert!((v - signal(t)).abs() < 6.0 * NOISE_SD + 0.5, "t={t} v={v}");
        }
    }

    #[test]
    fn test_single_day() {
        let d = date("2024-02-29");
        assert_eq!(generate(d, d, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(matches!(
            generate(date("2021-02-01"), date("2021-01-01"), 42),
            Err(SarimaError::InvalidInput(_))
        ));
    }
}
