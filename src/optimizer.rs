//! Maximum-likelihood estimation of SARIMA coefficients.
//!
//! - Parameter transformations (constrained <-> unconstrained)
//! - Negative concentrated log-likelihood as an argmin problem
//! - `fit()`: L-BFGS with restarts, Nelder-Mead fallback and polish

use std::fmt;
use std::str::FromStr;

use argmin::core::{CostFunction, Executor, Gradient, IterState, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use serde::Serialize;

use crate::error::{Result, SarimaError};
use crate::initialization::KalmanInit;
use crate::kalman::{kalman_loglike, KalmanOutput};
use crate::params::{self, SarimaParams};
use crate::start_params::compute_start_params;
use crate::state_space::StateSpace;
use crate::types::{FitResult, SarimaConfig, SarimaOrder};

/// Cost reported for parameters where the likelihood cannot be evaluated.
const PENALTY: f64 = f64::MAX / 2.0;

/// Optimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Single L-BFGS run; Nelder-Mead if it errors, Nelder-Mead polish if it stalls.
    #[default]
    Lbfgs,
    /// L-BFGS from several starts, best one polished by Nelder-Mead.
    LbfgsMulti,
    NelderMead,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Lbfgs => "lbfgs",
            Method::LbfgsMulti => "lbfgs-multi",
            Method::NelderMead => "nelder-mead",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SarimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lbfgs" => Ok(Method::Lbfgs),
            "lbfgs-multi" => Ok(Method::LbfgsMulti),
            "nelder-mead" | "nm" => Ok(Method::NelderMead),
            other => Err(SarimaError::InvalidConfig(format!(
                "unknown method '{other}'; use 'lbfgs', 'lbfgs-multi' or 'nelder-mead'"
            ))),
        }
    }
}

/// Estimation options shared by every candidate fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitOptions {
    pub method: Method,
    pub maxiter: u64,
    pub enforce_stationarity: bool,
    pub enforce_invertibility: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            method: Method::Lbfgs,
            maxiter: 500,
            enforce_stationarity: false,
            enforce_invertibility: false,
        }
    }
}

impl FitOptions {
    /// Engine configuration for `order` under these options.
    pub fn config_for(&self, order: SarimaOrder) -> SarimaConfig {
        SarimaConfig {
            order,
            enforce_stationarity: self.enforce_stationarity,
            enforce_invertibility: self.enforce_invertibility,
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter transformations
// ---------------------------------------------------------------------------

type BlockMap = fn(&[f64]) -> Vec<f64>;

/// Apply `ar_map` / `ma_map` to the `[ar | ma | sar | sma]` blocks whose
/// enforcement flag is set; other blocks pass through.
fn map_blocks(values: &[f64], config: &SarimaConfig, ar_map: BlockMap, ma_map: BlockMap) -> Result<Vec<f64>> {
    let order = &config.order;
    let expected = order.k_params();
    if values.len() != expected {
        return Err(SarimaError::ParamLengthMismatch {
            expected,
            got: values.len(),
        });
    }

    let blocks = [
        (order.p, config.enforce_stationarity, ar_map),
        (order.q, config.enforce_invertibility, ma_map),
        (order.pp, config.enforce_stationarity, ar_map),
        (order.qq, config.enforce_invertibility, ma_map),
    ];

    let mut out = Vec::with_capacity(expected);
    let mut rest = values;
    for (len, enforce, map) in blocks {
        let (block, tail) = rest.split_at(len);
        if enforce && len > 0 {
            out.extend(map(block));
        } else {
            out.extend_from_slice(block);
        }
        rest = tail;
    }
    Ok(out)
}

/// Constrained -> unconstrained (optimizer space).
pub fn untransform_params(constrained: &[f64], config: &SarimaConfig) -> Result<Vec<f64>> {
    map_blocks(
        constrained,
        config,
        params::unconstrain_stationary,
        params::unconstrain_invertible,
    )
}

/// Unconstrained (optimizer space) -> constrained.
pub fn transform_params(unconstrained: &[f64], config: &SarimaConfig) -> Result<Vec<f64>> {
    map_blocks(
        unconstrained,
        config,
        params::constrain_stationary,
        params::constrain_invertible,
    )
}

/// Concentrated log-likelihood at constrained parameters.
pub fn evaluate_loglike(endog: &[f64], config: &SarimaConfig, constrained: &[f64]) -> Result<KalmanOutput> {
    let sparams = SarimaParams::from_flat(constrained, &config.order)?;
    let ss = StateSpace::new(config, &sparams)?;
    let init = KalmanInit::for_state_space(&ss);
    kalman_loglike(endog, &ss, &init)
}

// ---------------------------------------------------------------------------
// Objective
// ---------------------------------------------------------------------------

/// Negative concentrated log-likelihood over unconstrained parameters.
#[derive(Clone)]
struct NegLogLike {
    endog: Vec<f64>,
    config: SarimaConfig,
}

impl NegLogLike {
    fn eval(&self, unconstrained: &[f64]) -> Result<f64> {
        let constrained = transform_params(unconstrained, &self.config)?;
        let out = evaluate_loglike(&self.endog, &self.config, &constrained)?;
        if out.loglike.is_finite() {
            Ok(-out.loglike)
        } else {
            Err(SarimaError::DataError("non-finite log-likelihood".into()))
        }
    }

    fn cost_or_penalty(&self, unconstrained: &[f64]) -> f64 {
        self.eval(unconstrained).unwrap_or(PENALTY)
    }
}

impl CostFunction for NegLogLike {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Vec<f64>) -> std::result::Result<f64, argmin::core::Error> {
        Ok(self.cost_or_penalty(param))
    }
}

impl Gradient for NegLogLike {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    /// Central differences with step cbrt(eps) * max(1, |x_i|). Falls back to a
    /// one-sided difference when one side lands in the penalty region.
    fn gradient(&self, param: &Vec<f64>) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        let step_base = f64::EPSILON.cbrt();
        let mut work = param.clone();
        let mut center: Option<f64> = None;
        let mut grad = vec![0.0; param.len()];

        for i in 0..param.len() {
            let orig = work[i];
            let h = step_base * orig.abs().max(1.0);

            work[i] = orig + h;
            let f_plus = self.cost_or_penalty(&work);
            work[i] = orig - h;
            let f_minus = self.cost_or_penalty(&work);
            work[i] = orig;

            let g = match (f_plus < PENALTY, f_minus < PENALTY) {
                (true, true) => (f_plus - f_minus) / (2.0 * h),
                (true, false) => {
                    let f0 = *center.get_or_insert_with(|| self.cost_or_penalty(param));
                    (f_plus - f0) / h
                }
                (false, true) => {
                    let f0 = *center.get_or_insert_with(|| self.cost_or_penalty(param));
                    (f0 - f_minus) / h
                }
                (false, false) => 0.0,
            };
            grad[i] = if g.is_finite() { g } else { 0.0 };
        }

        Ok(grad)
    }
}

// ---------------------------------------------------------------------------
// Solvers
// ---------------------------------------------------------------------------

/// Outcome of one solver run.
#[derive(Debug, Clone)]
struct Attempt {
    param: Vec<f64>,
    cost: f64,
    n_iter: u64,
    converged: bool,
}

fn is_converged(reason: Option<&TerminationReason>) -> bool {
    matches!(
        reason,
        Some(TerminationReason::SolverConverged) | Some(TerminationReason::TargetCostReached)
    )
}

fn run_lbfgs(objective: NegLogLike, init_params: Vec<f64>, maxiter: u64) -> Result<Attempt> {
    let fail = |e: argmin::core::Error| SarimaError::OptimizationFailed(format!("L-BFGS: {e}"));

    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, 10)
        .with_tolerance_grad(1e-5)
        .map_err(fail)?
        .with_tolerance_cost(1e-9)
        .map_err(fail)?;

    let result = Executor::new(objective, solver)
        .configure(|state: IterState<Vec<f64>, Vec<f64>, (), (), (), f64>| {
            state.param(init_params).max_iters(maxiter)
        })
        .run()
        .map_err(fail)?;

    let state = result.state();
    let param = state
        .get_best_param()
        .ok_or_else(|| SarimaError::OptimizationFailed("L-BFGS: no best parameter".into()))?
        .clone();

    Ok(Attempt {
        param,
        cost: state.get_best_cost(),
        n_iter: state.get_iter(),
        converged: is_converged(state.get_termination_reason()),
    })
}

fn run_nelder_mead(objective: NegLogLike, init_params: Vec<f64>, maxiter: u64) -> Result<Attempt> {
    let fail = |e: argmin::core::Error| SarimaError::OptimizationFailed(format!("Nelder-Mead: {e}"));

    // n+1 vertices: the start plus a 5% (or 0.00025 near zero) step per axis
    let mut simplex = vec![init_params.clone()];
    for i in 0..init_params.len() {
        let mut vertex = init_params.clone();
        vertex[i] += if vertex[i].abs() > 1e-8 { vertex[i] * 0.05 } else { 0.00025 };
        simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex).with_sd_tolerance(1e-6).map_err(fail)?;

    let result = Executor::new(objective, solver)
        .configure(|state: IterState<Vec<f64>, (), (), (), (), f64>| state.max_iters(maxiter))
        .run()
        .map_err(fail)?;

    let state = result.state();
    let param = state
        .get_best_param()
        .ok_or_else(|| SarimaError::OptimizationFailed("Nelder-Mead: no best parameter".into()))?
        .clone();

    Ok(Attempt {
        param,
        cost: state.get_best_cost(),
        n_iter: state.get_iter(),
        converged: is_converged(state.get_termination_reason()),
    })
}

/// Shared iteration budget across solver runs.
struct Budget {
    remaining: u64,
    used: u64,
}

impl Budget {
    fn new(maxiter: u64) -> Self {
        Self { remaining: maxiter, used: 0 }
    }

    fn consume(&mut self, n: u64) {
        let n = n.min(self.remaining);
        self.used = self.used.saturating_add(n);
        self.remaining -= n;
    }
}

/// Single L-BFGS run. Errors fall back to Nelder-Mead from the start point; a
/// run that stops short of convergence is polished with the remaining budget.
fn optimize_lbfgs(objective: &NegLogLike, start: Vec<f64>, maxiter: u64) -> Result<(Attempt, String)> {
    let mut budget = Budget::new(maxiter);

    match run_lbfgs(objective.clone(), start.clone(), budget.remaining) {
        Ok(attempt) => {
            budget.consume(attempt.n_iter);
            if attempt.converged || budget.remaining == 0 {
                let n_iter = budget.used;
                return Ok((Attempt { n_iter, ..attempt }, Method::Lbfgs.to_string()));
            }
            match run_nelder_mead(objective.clone(), attempt.param.clone(), budget.remaining) {
                Ok(polish) if polish.cost <= attempt.cost => {
                    budget.consume(polish.n_iter);
                    let n_iter = budget.used;
                    Ok((Attempt { n_iter, ..polish }, "lbfgs+nm".to_string()))
                }
                Ok(polish) => {
                    budget.consume(polish.n_iter);
                    let n_iter = budget.used;
                    Ok((Attempt { n_iter, ..attempt }, Method::Lbfgs.to_string()))
                }
                Err(_) => {
                    let n_iter = budget.used;
                    Ok((Attempt { n_iter, ..attempt }, Method::Lbfgs.to_string()))
                }
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "L-BFGS failed, falling back to Nelder-Mead");
            let attempt = run_nelder_mead(objective.clone(), start, budget.remaining)?;
            Ok((attempt, "nelder-mead (fallback)".to_string()))
        }
    }
}

/// Restart count by model size.
fn n_restarts(n_params: usize, seasonal: bool) -> usize {
    if n_params >= 4 {
        3
    } else if n_params >= 3 || seasonal {
        2
    } else if n_params >= 2 {
        1
    } else {
        0
    }
}

/// L-BFGS from the start point, from zeros, from MA grid points when
/// invertibility is enforced, and from deterministic perturbations of the
/// start. The best result is polished by Nelder-Mead.
fn optimize_multistart(
    objective: &NegLogLike,
    start: Vec<f64>,
    maxiter: u64,
) -> Result<(Attempt, String)> {
    let config = &objective.config;
    let order = &config.order;
    let n = start.len();
    let mut budget = Budget::new(maxiter);
    let mut best: Option<Attempt> = None;

    let consider = |attempt: Attempt, budget: &mut Budget, best: &mut Option<Attempt>| {
        budget.consume(attempt.n_iter);
        if best.as_ref().map_or(true, |b| attempt.cost < b.cost) {
            *best = Some(attempt);
        }
    };

    if let Ok(attempt) = run_lbfgs(objective.clone(), start.clone(), budget.remaining) {
        consider(attempt, &mut budget, &mut best);
    }

    let restarts = n_restarts(n, order.pp > 0 || order.qq > 0);
    if restarts > 0 && budget.remaining > 0 {
        if let Ok(attempt) = run_lbfgs(objective.clone(), vec![0.0; n], budget.remaining) {
            consider(attempt, &mut budget, &mut best);
        }

        if config.enforce_invertibility && order.q + order.qq > 0 {
            let ma_start = order.p;
            let sma_start = order.p + order.q + order.pp;
            for ma_val in [-0.3, -0.6, -0.9] {
                if budget.remaining == 0 {
                    break;
                }
                let mut grid = vec![0.0; n];
                grid[ma_start..ma_start + order.q].fill(ma_val);
                grid[sma_start..sma_start + order.qq].fill(ma_val);
                let Ok(grid_start) = untransform_params(&grid, config) else {
                    continue;
                };
                if let Ok(attempt) = run_nelder_mead(objective.clone(), grid_start, budget.remaining) {
                    consider(attempt, &mut budget, &mut best);
                }
            }
        }

        // 64-bit LCG so restarts do not depend on an external RNG stream
        let mut rng_state: u64 = 12345;
        for _ in 0..restarts {
            if budget.remaining == 0 {
                break;
            }
            let mut perturbed = start.clone();
            for v in perturbed.iter_mut() {
                rng_state = rng_state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let u = (rng_state >> 33) as f64 / (1u64 << 31) as f64 - 0.5;
                let scale = if v.abs() > 0.1 { v.abs() * 0.5 } else { 0.1 };
                *v += u * scale;
            }
            if let Ok(attempt) = run_lbfgs(objective.clone(), perturbed, budget.remaining) {
                consider(attempt, &mut budget, &mut best);
            }
        }
    }

    let Some(best) = best else {
        let attempt = run_nelder_mead(objective.clone(), start, budget.remaining)?;
        budget.consume(attempt.n_iter);
        let n_iter = budget.used;
        return Ok((Attempt { n_iter, ..attempt }, "nelder-mead (fallback)".to_string()));
    };

    if n >= 2 && budget.remaining > 0 {
        if let Ok(polish) = run_nelder_mead(objective.clone(), best.param.clone(), budget.remaining) {
            budget.consume(polish.n_iter);
            if polish.cost < best.cost {
                let n_iter = budget.used;
                return Ok((Attempt { n_iter, ..polish }, "lbfgs-multi+nm".to_string()));
            }
        }
    }
    let n_iter = budget.used;
    Ok((Attempt { n_iter, ..best }, Method::LbfgsMulti.to_string()))
}

/// Extra unconstrained start points for the single-start L-BFGS path.
///
/// Models with three or more coefficients or any seasonal ARMA term restart
/// from zeros. Seasonal ARMA models also restart from the optimum of the same
/// model without its seasonal AR/MA terms, padded with zeros, so the fitted
/// likelihood is at least the one at that nested point.
fn lbfgs_restart_points(
    endog: &[f64],
    config: &SarimaConfig,
    options: &FitOptions,
    n_params: usize,
) -> Result<Vec<(&'static str, Vec<f64>)>> {
    let order = &config.order;
    let seasonal_arma = order.pp + order.qq > 0;
    let mut points = Vec::new();

    if n_params >= 3 || seasonal_arma {
        points.push(("zero", vec![0.0; n_params]));
    }

    if seasonal_arma {
        let nested = SarimaConfig {
            order: SarimaOrder { pp: 0, qq: 0, ..*order },
            ..config.clone()
        };
        match fit(endog, &nested, options) {
            Ok(result) => {
                let mut padded = result.params;
                padded.resize(n_params, 0.0);
                points.push(("nested", untransform_params(&padded, config)?));
            }
            Err(e) => tracing::debug!(error = %e, "nested fit failed, no nested restart"),
        }
    }
    Ok(points)
}

// ---------------------------------------------------------------------------
// Public fit() entry point
// ---------------------------------------------------------------------------

fn finish(
    endog: &[f64],
    config: &SarimaConfig,
    constrained: Vec<f64>,
    n_iter: u64,
    converged: bool,
    method: String,
) -> Result<FitResult> {
    let output = evaluate_loglike(endog, config, &constrained)?;
    if !output.loglike.is_finite() {
        return Err(SarimaError::OptimizationFailed(
            "non-finite log-likelihood at the optimum".into(),
        ));
    }
    Ok(FitResult {
        params: constrained,
        loglike: output.loglike,
        scale: output.scale,
        n_obs: endog.len(),
        n_params: SarimaParams::n_estimated_params(&config.order),
        n_iter,
        converged,
        method,
        aic: 0.0,
        bic: 0.0,
    }
    .with_information_criteria())
}

/// Fit SARIMA coefficients by maximum likelihood.
///
/// Returns the optimizer summary even when the run did not converge; callers
/// that need a converged model check `FitResult::converged`.
pub fn fit(endog: &[f64], config: &SarimaConfig, options: &FitOptions) -> Result<FitResult> {
    let order = &config.order;
    let min_obs = order.k_params().max(order.k_states()) + 1;
    if endog.len() <= min_obs {
        return Err(SarimaError::DataError(format!(
            "not enough observations: n={} <= minimum {min_obs} for this order",
            endog.len()
        )));
    }
    if let Some(bad) = endog.iter().position(|v| !v.is_finite()) {
        return Err(SarimaError::DataError(format!("non-finite observation at index {bad}")));
    }

    let constrained_start = compute_start_params(endog, config)?;

    // Pure differencing models have nothing to optimize.
    if constrained_start.is_empty() {
        return finish(endog, config, constrained_start, 0, true, "direct".to_string());
    }

    if options.maxiter == 0 {
        return finish(
            endog,
            config,
            constrained_start,
            0,
            false,
            options.method.to_string(),
        );
    }

    let start = untransform_params(&constrained_start, config)?;
    let objective = NegLogLike {
        endog: endog.to_vec(),
        config: config.clone(),
    };

    let (best, used_method) = match options.method {
        Method::Lbfgs => {
            let restarts = lbfgs_restart_points(endog, config, options, start.len())?;
            let mut best = optimize_lbfgs(&objective, start, options.maxiter);
            for (label, point) in restarts {
                match optimize_lbfgs(&objective, point, options.maxiter) {
                    Ok((attempt, method))
                        if best.as_ref().map_or(true, |(b, _)| attempt.cost < b.cost) =>
                    {
                        tracing::trace!(start = label, cost = attempt.cost, "restart improved the optimum");
                        best = Ok((attempt, format!("{method} ({label} start)")));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!(start = label, error = %e, "restart failed"),
                }
            }
            best?
        }
        Method::LbfgsMulti => optimize_multistart(&objective, start, options.maxiter)?,
        Method::NelderMead => {
            let attempt = run_nelder_mead(objective.clone(), start, options.maxiter)?;
            (attempt, Method::NelderMead.to_string())
        }
    };

    if best.cost >= PENALTY {
        return Err(SarimaError::OptimizationFailed(
            "optimizer never found a parameter with a finite likelihood".into(),
        ));
    }

    let constrained = transform_params(&best.param, config)?;
    finish(endog, config, constrained, best.n_iter, best.converged, used_method)
}
