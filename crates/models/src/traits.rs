//! The contract between the run orchestrator and a rating model.

use crate::error::Result;
use data_loader::{DatasetStats, RatingPoints};
use ndarray::Array1;
use std::path::Path;

/// A trainable rating predictor.
///
/// The orchestrator drives a model through this trait only; it never looks
/// at a model's parameters.
///
/// ## Lifecycle
/// 1. `set_debug` and one of `train` / `train_feature_epoch`
/// 2. any number of `train_more` calls (resumes from the stored training array)
/// 3. `predict` as often as needed
/// 4. `release_training_data` drops the training array; `predict` and `save`
///    keep working, `train_more` does not
pub trait RatingModel {
    /// Name used in artifact filenames (e.g. "BiasModel")
    fn name(&self) -> &str;

    /// Number of latent features, if the model has any
    fn num_features(&self) -> Option<usize> {
        None
    }

    fn set_debug(&mut self, debug: bool);

    /// Train from scratch for `epochs` passes (model default when `None`).
    ///
    /// The model keeps `points` so `train_more` can resume.
    fn train(
        &mut self,
        points: RatingPoints,
        stats: DatasetStats,
        epochs: Option<usize>,
    ) -> Result<()>;

    /// Continue training on the stored training array.
    fn train_more(&mut self, epochs: Option<usize>) -> Result<()>;

    /// Alternate entry point that lets the model choose its own
    /// feature/epoch ordering. Models without features train normally.
    fn train_feature_epoch(
        &mut self,
        points: RatingPoints,
        stats: DatasetStats,
        epochs: Option<usize>,
    ) -> Result<()> {
        self.train(points, stats, epochs)
    }

    /// Predict one rating per row of `points`
    fn predict(&self, points: &RatingPoints) -> Result<Array1<f32>>;

    /// Serialize the model to `path`
    fn save(&self, path: &Path) -> Result<()>;

    /// Drop the stored training array
    fn release_training_data(&mut self);

    /// Extension of the files written by `save`
    fn file_extension(&self) -> &str {
        "bin"
    }
}
