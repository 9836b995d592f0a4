//! Deterministic series for unit tests.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Zero-mean ARMA(p, q) with unit Gaussian innovations and a 100-step burn-in.
pub fn simulate_arma(ar: &[f64], ma: &[f64], n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let burn = 100;
    let total = n + burn;

    let eps: Vec<f64> = (0..total).map(|_| normal.sample(&mut rng)).collect();
    let mut y = vec![0.0; total];
    for t in 0..total {
        let mut v = eps[t];
        for (j, phi) in ar.iter().enumerate() {
            if t > j {
                v += phi * y[t - j - 1];
            }
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                v += theta * eps[t - j - 1];
            }
        }
        y[t] = v;
    }
    y.split_off(burn)
}

/// Trend plus a weekly cycle plus Gaussian noise, sd 2.
pub fn weekly_series(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 2.0).unwrap();
    (0..n)
        .map(|t| {
            let weekly = 3.0 * (2.0 * std::f64::consts::PI * (t % 7) as f64 / 7.0).sin();
            50.0 + 0.02 * t as f64 + weekly + normal.sample(&mut rng)
        })
        .collect()
}

/// SARIMA(1,1,1)(0,1,1,7) with phi=0.3, theta=-0.4, Theta=-0.5, offset 50.
pub fn weekly_sarima(n: usize, seed: u64) -> Vec<f64> {
    // (1 - 0.4L)(1 - 0.5L^7) = 1 - 0.4L - 0.5L^7 + 0.2L^8
    let ma = [-0.4, 0.0, 0.0, 0.0, 0.0, 0.0, -0.5, 0.2];
    let w = simulate_arma(&[0.3], &ma, n, seed);

    let mut seasonal = vec![0.0; n];
    for t in 0..n {
        seasonal[t] = w[t] + if t >= 7 { seasonal[t - 7] } else { 0.0 };
    }
    let mut level = 50.0;
    seasonal
        .iter()
        .map(|x| {
            level += x;
            level
        })
        .collect()
}
