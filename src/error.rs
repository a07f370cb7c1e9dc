//! Error types for the seasonality-index library.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for seasonality operations.
pub type Result<T> = std::result::Result<T, SeasonalityError>;

/// Errors that can occur while building a seasonality report.
///
/// Only configuration and input-shape errors are fatal. Timestamp and
/// model-fit problems are recovered locally and surface as values in
/// [`SeasonalityReport::warnings`](crate::seasonality::SeasonalityReport).
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SeasonalityError {
    /// No rows remain after filtering.
    #[error("empty input data")]
    EmptyInput,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Model has not been fitted yet.
    #[error("model must be fitted before use")]
    FitRequired,

    /// Computation error (e.g., numerical issues, non-convergence).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// The per-category model fit failed and the flat index was used.
    #[error("model fit failed for category {category:?}: {cause}")]
    ModelFitFailure { category: String, cause: String },

    /// A required input column is absent.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Reading or writing CSV failed.
    #[error("csv error: {0}")]
    Csv(String),

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<csv::Error> for SeasonalityError {
    fn from(err: csv::Error) -> Self {
        SeasonalityError::Csv(err.to_string())
    }
}

impl From<std::io::Error> for SeasonalityError {
    fn from(err: std::io::Error) -> Self {
        SeasonalityError::Io(err.to_string())
    }
}
