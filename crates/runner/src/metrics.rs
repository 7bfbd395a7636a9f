//! Evaluation metrics.

use crate::error::MetricError;
use ndarray::ArrayView1;

/// Root-mean-squared error between true ratings and predictions.
///
/// Both inputs must have the same, non-zero length. Accumulates in `f64`.
pub fn compute_rmse(
    truth: ArrayView1<f32>,
    predictions: ArrayView1<f32>,
) -> Result<f64, MetricError> {
    if truth.len() != predictions.len() {
        return Err(MetricError::LengthMismatch {
            truth: truth.len(),
            predictions: predictions.len(),
        });
    }
    if truth.is_empty() {
        return Err(MetricError::Empty);
    }

    let sum: f64 = truth
        .iter()
        .zip(predictions.iter())
        .map(|(&t, &p)| (p as f64 - t as f64).powi(2))
        .sum();
    Ok((sum / truth.len() as f64).sqrt())
}
