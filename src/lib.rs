//! Seasonal ARIMA model selection and forecasting for daily series.
//!
//! The estimator writes each candidate in Harvey state-space form, evaluates
//! the concentrated Gaussian log-likelihood with a Kalman filter, and
//! maximizes it with L-BFGS (Nelder-Mead as fallback). [`selection`] searches
//! an order grid by AIC and [`pipeline`] ties loading, selection, validation
//! and forecasting together.

pub mod error;
pub mod types;
pub mod params;
pub mod polynomial;
pub mod state_space;
pub mod initialization;
pub mod kalman;
pub mod start_params;
pub mod optimizer;
pub mod forecast;
pub mod model;
pub mod metrics;
pub mod selection;
pub mod series;
pub mod synthetic;
pub mod report;
pub mod pipeline;

#[cfg(test)]
mod test_support;

pub use error::{Result, SarimaError};
pub use model::{fit, FittedModel};
pub use optimizer::{FitOptions, Method};
pub use pipeline::{PipelineConfig, PipelineOutput};
pub use series::DailySeries;
pub use types::{FitResult, ModelSpec, SarimaConfig, SarimaOrder};
