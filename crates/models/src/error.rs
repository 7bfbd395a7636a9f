//! Error types shared by rating models.

use thiserror::Error;

/// Errors a model can report back to the run orchestrator
#[derive(Error, Debug)]
pub enum ModelError {
    /// Prediction or continued training was requested before `train`
    #[error("Model has not been trained yet")]
    NotTrained,

    /// `train_more` was called after the training array was released
    #[error("Training data was released; call train again before training more")]
    NoTrainingData,

    /// Input array is unusable for this model
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
