use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sarima_rs::initialization::KalmanInit;
use sarima_rs::kalman::{kalman_filter, kalman_loglike};
use sarima_rs::params::SarimaParams;
use sarima_rs::state_space::StateSpace;
use sarima_rs::synthetic;
use sarima_rs::types::{ModelSpec, SarimaConfig};

fn daily_sales(n_days: u64) -> Vec<f64> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let end = start + chrono::Days::new(n_days - 1);
    synthetic::generate(start, end, 42).unwrap().values().to_vec()
}

fn bench_loglike(c: &mut Criterion) {
    let mut group = c.benchmark_group("kalman_loglike");
    let spec = ModelSpec::sarima((1, 1, 1), (1, 1, 1, 7));
    let config = SarimaConfig::new(spec.sarima_order());
    let params = SarimaParams::from_flat(&[0.3, -0.6, 0.1, -0.8], &config.order).unwrap();
    let ss = StateSpace::new(&config, &params).unwrap();
    let init = KalmanInit::for_state_space(&ss);

    for n in [365u64, 1095, 2190] {
        let y = daily_sales(n);
        group.bench_with_input(BenchmarkId::new("sarima_111_111_7", n), &y, |b, y| {
            b.iter(|| kalman_loglike(black_box(y), &ss, &init))
        });
    }
    group.finish();
}

fn bench_full_filter(c: &mut Criterion) {
    let config = SarimaConfig::new(ModelSpec::arima(2, 1, 2).sarima_order());
    let params = SarimaParams::from_flat(&[0.4, 0.1, -0.3, 0.05], &config.order).unwrap();
    let ss = StateSpace::new(&config, &params).unwrap();
    let init = KalmanInit::for_state_space(&ss);
    let y = daily_sales(1095);

    c.bench_function("kalman_filter_arima_212_1095", |b| {
        b.iter(|| kalman_filter(black_box(&y), &ss, &init))
    });
}

criterion_group!(benches, bench_loglike, bench_full_filter);
criterion_main!(benches);
