use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sarima_rs::optimizer::{FitOptions, Method};
use sarima_rs::selection::grid_search_aic;
use sarima_rs::synthetic;
use sarima_rs::{fit, ModelSpec};

fn two_years() -> Vec<f64> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
    synthetic::generate(start, end, 42).unwrap().values().to_vec()
}

fn bench_fit_methods(c: &mut Criterion) {
    let y = two_years();
    let spec = ModelSpec::sarima((1, 1, 1), (0, 1, 1, 7));
    let mut group = c.benchmark_group("fit_sarima_111_011_7");
    group.sample_size(10);

    for method in [Method::Lbfgs, Method::NelderMead] {
        let options = FitOptions {
            method,
            ..FitOptions::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(method), &options, |b, options| {
            b.iter(|| fit(black_box(&y), &spec, options))
        });
    }
    group.finish();
}

fn bench_small_grid(c: &mut Criterion) {
    let y = two_years();
    let orders = [(1, 0, 0), (0, 1, 1), (1, 1, 1)];
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);
    group.bench_function("3_orders_weekly", |b| {
        b.iter(|| grid_search_aic(black_box(&y), &orders, Some(7), &FitOptions::default()))
    });
    group.finish();
}

criterion_group!(benches, bench_fit_methods, bench_small_grid);
criterion_main!(benches);
