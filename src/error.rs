use thiserror::Error;

use crate::types::ModelSpec;

#[derive(Error, Debug)]
pub enum SarimaError {
    #[error("parameter length mismatch: expected {expected}, got {got}")]
    ParamLengthMismatch { expected: usize, got: usize },

    #[error("state space construction failed: {0}")]
    StateSpaceError(String),

    #[error("optimization failed: {0}")]
    OptimizationFailed(String),

    #[error("data error: {0}")]
    DataError(String),

    #[error("shape mismatch: y_true has {expected} values, y_pred has {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("metric inputs are empty")]
    EmptyInput,

    #[error("fit failed for {spec}: {reason}")]
    FitFailure { spec: ModelSpec, reason: String },

    #[error("no viable model: all {candidates} grid candidates failed to fit")]
    NoViableModel { candidates: usize },

    #[error("insufficient data: series has {len} observations, validation window needs more than {val_days}")]
    InsufficientData { len: usize, val_days: usize },

    #[error("prediction unavailable at index {index}: differencing consumes the first {first_available} observations")]
    PredictionUnavailable { index: usize, first_available: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("duplicate date {0}")]
    DuplicateDate(chrono::NaiveDate),

    #[error("parse error at row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SarimaError {
    /// Whether this error is a recoverable per-candidate fit failure.
    pub fn is_fit_failure(&self) -> bool {
        matches!(self, SarimaError::FitFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, SarimaError>;
