//! `sarima-forecast`: generate synthetic daily sales or run the forecast pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sarima_rs::optimizer::{FitOptions, Method};
use sarima_rs::pipeline::{self, PipelineConfig};
use sarima_rs::{series, synthetic};

#[derive(Parser)]
#[command(name = "sarima-forecast")]
#[command(about = "Seasonal ARIMA selection and forecasting for daily series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a model by AIC, validate it and forecast
    Forecast {
        /// Daily CSV with `date` and `sales` columns
        #[arg(long)]
        input: PathBuf,

        /// Forecast horizon in days
        #[arg(long, default_value_t = pipeline::DEFAULT_HORIZON)]
        horizon: usize,

        /// Validation window size in days
        #[arg(long, alias = "val_days", default_value_t = pipeline::DEFAULT_VAL_DAYS)]
        val_days: usize,

        #[arg(long, default_value = "outputs")]
        outdir: PathBuf,

        /// Seasonal period; 0 searches non-seasonal orders only
        #[arg(long, default_value_t = pipeline::DEFAULT_SEASONAL_PERIOD)]
        seasonal_period: usize,

        /// Optimizer (lbfgs, lbfgs-multi, nelder-mead)
        #[arg(long, default_value = "lbfgs")]
        method: Method,

        /// Iteration cap per fit
        #[arg(long, default_value_t = 500)]
        maxiter: u64,
    },

    /// Write a synthetic daily sales CSV
    Generate {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "data/daily_sales.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Forecast {
            input,
            horizon,
            val_days,
            outdir,
            seasonal_period,
            method,
            maxiter,
        } => {
            let series = series::load_csv(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            let config = PipelineConfig {
                horizon,
                val_days,
                seasonal_period: (seasonal_period > 0).then_some(seasonal_period),
                fit: FitOptions {
                    method,
                    maxiter,
                    ..FitOptions::default()
                },
                ..PipelineConfig::default()
            };

            let output = pipeline::run(&series, &config).context("forecast pipeline failed")?;
            output
                .write(&outdir)
                .with_context(|| format!("failed to write outputs to {}", outdir.display()))?;

            println!("[OK] Forecasting complete.");
            println!(
                "Best order: {} (AIC={:.3})",
                output.selection.best.spec, output.selection.best.aic
            );
            println!(
                "Validation RMSE={:.3}, MAPE={:.2}%",
                output.metrics.rmse, output.metrics.mape
            );
            println!("Outputs saved to: {}", outdir.display());
        }
        Commands::Generate {
            start,
            end,
            seed,
            out,
        } => {
            let series = synthetic::generate(start, end, seed)?;
            series
                .write_csv(&out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("[OK] wrote {} with {} rows", out.display(), series.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_val_days_alias() {
        let cli = Cli::parse_from(["sarima-forecast", "forecast", "--input", "x.csv", "--val_days", "30"]);
        match cli.command {
            Commands::Forecast { val_days, horizon, method, .. } => {
                assert_eq!(val_days, 30);
                assert_eq!(horizon, 90);
                assert_eq!(method, Method::Lbfgs);
            }
            Commands::Generate { .. } => panic!("expected forecast"),
        }
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::parse_from(["sarima-forecast", "generate", "--start", "2021-01-01", "--end", "2021-01-31"]);
        match cli.command {
            Commands::Generate { seed, out, .. } => {
                assert_eq!(seed, 42);
                assert_eq!(out, PathBuf::from("data/daily_sales.csv"));
            }
            Commands::Forecast { .. } => panic!("expected generate"),
        }
    }
}
