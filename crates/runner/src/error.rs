//! Error types for evaluation metrics.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetricError {
    /// Truth and prediction sequences must pair up one to one
    #[error("Length mismatch: {truth} true ratings vs {predictions} predictions")]
    LengthMismatch { truth: usize, predictions: usize },

    /// RMSE of nothing is undefined
    #[error("Cannot compute RMSE of an empty sequence")]
    Empty,
}
