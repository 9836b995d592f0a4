//! AIC grid search over seasonal ARIMA orders.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Result, SarimaError};
use crate::model;
use crate::optimizer::FitOptions;
use crate::types::ModelSpec;

/// `(p, d, q)` for p in 0..=2, d in 0..=1, q in 0..=2, p varying slowest.
pub fn default_orders() -> Vec<(usize, usize, usize)> {
    let mut orders = Vec::with_capacity(18);
    for p in 0..=2 {
        for d in 0..=1 {
            for q in 0..=2 {
                orders.push((p, d, q));
            }
        }
    }
    orders
}

/// `(P, D, Q, s)` over {0, 1}^3 in lexicographic order.
pub fn seasonal_orders(s: usize) -> Vec<(usize, usize, usize, usize)> {
    (0..8usize)
        .map(|bits| ((bits >> 2) & 1, (bits >> 1) & 1, bits & 1, s))
        .collect()
}

/// Every candidate in enumeration order: each `(p, d, q)` crossed with the
/// seasonal grid when a period is given, alone otherwise.
pub fn candidate_specs(
    orders: &[(usize, usize, usize)],
    seasonal_period: Option<usize>,
) -> Vec<ModelSpec> {
    match seasonal_period {
        Some(s) => {
            let seasonal = seasonal_orders(s);
            orders
                .iter()
                .flat_map(|&order| seasonal.iter().map(move |&so| ModelSpec::sarima(order, so)))
                .collect()
        }
        None => orders.iter().map(|&(p, d, q)| ModelSpec::arima(p, d, q)).collect(),
    }
}

/// Lowest-AIC candidate seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestCandidate {
    pub spec: ModelSpec,
    pub aic: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSearchOutcome {
    pub best: BestCandidate,
    /// Candidates attempted.
    pub evaluated: usize,
    /// Candidates whose fit failed or produced a non-finite AIC.
    pub failed: usize,
}

/// Fold fit outcomes, in enumeration order, into the best record.
///
/// The record is replaced only on a strictly lower AIC, so ties keep the
/// earliest candidate. Failures are counted and skipped.
pub fn select_best<I>(results: I) -> Result<GridSearchOutcome>
where
    I: IntoIterator<Item = (ModelSpec, Result<f64>)>,
{
    let (best, evaluated, failed) = results.into_iter().fold(
        (None::<BestCandidate>, 0usize, 0usize),
        |(best, evaluated, failed), (spec, outcome)| match outcome {
            Ok(aic) if aic.is_finite() => {
                tracing::debug!(%spec, aic, "candidate fitted");
                let improved = best.map_or(true, |b| aic < b.aic);
                let best = if improved { Some(BestCandidate { spec, aic }) } else { best };
                (best, evaluated + 1, failed)
            }
            Ok(aic) => {
                tracing::debug!(%spec, aic, "candidate skipped: non-finite AIC");
                (best, evaluated + 1, failed + 1)
            }
            Err(e) => {
                tracing::debug!(%spec, error = %e, "candidate skipped");
                (best, evaluated + 1, failed + 1)
            }
        },
    );

    best.map(|best| GridSearchOutcome {
        best,
        evaluated,
        failed,
    })
    .ok_or(SarimaError::NoViableModel { candidates: evaluated })
}

/// Fit every candidate on `endog` and keep the one with the lowest AIC.
///
/// Fits run in parallel; results are collected in enumeration order before
/// the fold, so the choice matches a sequential search.
pub fn grid_search_aic(
    endog: &[f64],
    orders: &[(usize, usize, usize)],
    seasonal_period: Option<usize>,
    options: &FitOptions,
) -> Result<GridSearchOutcome> {
    let specs = candidate_specs(orders, seasonal_period);
    if specs.is_empty() {
        return Err(SarimaError::InvalidConfig("no candidate orders to search".into()));
    }
    tracing::info!(candidates = specs.len(), n_obs = endog.len(), "grid search started");

    let results: Vec<(ModelSpec, Result<f64>)> = specs
        .par_iter()
        .map(|spec| (*spec, model::fit(endog, spec, options).map(|m| m.aic())))
        .collect();

    let outcome = select_best(results)?;
    tracing::info!(
        best = %outcome.best.spec,
        aic = outcome.best.aic,
        evaluated = outcome.evaluated,
        failed = outcome.failed,
        "grid search finished"
    );
    Ok(outcome)
}
