//! Bias baseline: global mean plus per-user and per-movie offsets.
//!
//! ## Algorithm
//! prediction = mean + b_user + b_movie, clipped to the rating range.
//! Each epoch is one SGD pass over the training rows:
//! 1. err = rating - prediction
//! 2. b_user  += lr * (err - reg * b_user)
//! 3. b_movie += lr * (err - reg * b_movie)
//!
//! Users and movies never seen in training fall back to a zero bias.

use crate::error::{ModelError, Result};
use crate::traits::RatingModel;
use data_loader::{
    DatasetStats, MOVIE_INDEX, MovieId, RATING_INDEX, RatingPoints, USER_INDEX, UserId,
};
use ndarray::{Array1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info, instrument};

pub const MIN_RATING: f32 = 1.0;
pub const MAX_RATING: f32 = 5.0;

/// Trainable baseline predictor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasModel {
    learning_rate: f32,
    regularization: f32,
    /// Epochs used when `train` is called without an explicit count
    default_epochs: usize,

    global_mean: f32,
    user_bias: HashMap<UserId, f32>,
    movie_bias: HashMap<MovieId, f32>,
    epochs_trained: usize,
    /// Set by `train`, even for a zero-epoch run
    #[serde(default)]
    trained: bool,

    #[serde(skip)]
    debug: bool,
    #[serde(skip)]
    train_points: Option<RatingPoints>,
}

impl BiasModel {
    pub fn new() -> Self {
        Self {
            learning_rate: 0.005,
            regularization: 0.02,
            default_epochs: 10,
            global_mean: 0.0,
            user_bias: HashMap::new(),
            movie_bias: HashMap::new(),
            epochs_trained: 0,
            trained: false,
            debug: false,
            train_points: None,
        }
    }

    /// Configure the SGD step size (default: 0.005)
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Configure the L2 penalty on biases (default: 0.02)
    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    /// Configure epochs used when none are requested (default: 10)
    pub fn with_default_epochs(mut self, epochs: usize) -> Self {
        self.default_epochs = epochs;
        self
    }

    /// Restore a model written by `save`
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn has_training_data(&self) -> bool {
        self.train_points.is_some()
    }

    fn predict_one(&self, user: UserId, movie: MovieId) -> f32 {
        let user_bias = self.user_bias.get(&user).copied().unwrap_or(0.0);
        let movie_bias = self.movie_bias.get(&movie).copied().unwrap_or(0.0);
        (self.global_mean + user_bias + movie_bias).clamp(MIN_RATING, MAX_RATING)
    }

    /// Run `epochs` SGD passes over the stored training array
    fn run_epochs(&mut self, epochs: usize) -> Result<()> {
        let points = self.train_points.take().ok_or(ModelError::NoTrainingData)?;

        for _ in 0..epochs {
            let mut squared_error = 0.0f64;
            for row in points.axis_iter(Axis(0)) {
                let user = row[USER_INDEX] as UserId;
                let movie = row[MOVIE_INDEX] as MovieId;
                let rating = row[RATING_INDEX];

                let user_bias = self.user_bias.entry(user).or_insert(0.0);
                let movie_bias = self.movie_bias.entry(movie).or_insert(0.0);
                let err = rating - (self.global_mean + *user_bias + *movie_bias);

                *user_bias += self.learning_rate * (err - self.regularization * *user_bias);
                *movie_bias += self.learning_rate * (err - self.regularization * *movie_bias);
                squared_error += (err as f64).powi(2);
            }
            self.epochs_trained += 1;

            if self.debug && points.nrows() > 0 {
                debug!(
                    "Epoch {}: training RMSE {:.5}",
                    self.epochs_trained,
                    (squared_error / points.nrows() as f64).sqrt()
                );
            }
        }

        self.train_points = Some(points);
        Ok(())
    }
}

impl Default for BiasModel {
    fn default() -> Self {
        Self::new()
    }
}

fn mean_rating(points: &RatingPoints) -> f32 {
    if points.nrows() == 0 {
        return 0.0;
    }
    let column = points.index_axis(Axis(1), RATING_INDEX);
    (column.iter().map(|&r| r as f64).sum::<f64>() / points.nrows() as f64) as f32
}

impl RatingModel for BiasModel {
    fn name(&self) -> &str {
        "BiasModel"
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    #[instrument(skip(self, points, stats), fields(rows = points.nrows()))]
    fn train(
        &mut self,
        points: RatingPoints,
        stats: DatasetStats,
        epochs: Option<usize>,
    ) -> Result<()> {
        if points.ncols() <= RATING_INDEX {
            return Err(ModelError::InvalidInput(format!(
                "training array has {} columns",
                points.ncols()
            )));
        }

        self.global_mean = match stats.get_f64("mean_rating") {
            Some(mean) => mean as f32,
            None => mean_rating(&points),
        };
        self.user_bias.clear();
        self.movie_bias.clear();
        self.epochs_trained = 0;
        self.trained = true;
        self.train_points = Some(points);

        let epochs = epochs.unwrap_or(self.default_epochs);
        info!(
            "Training {} for {} epochs (mean rating {:.4})",
            self.name(),
            epochs,
            self.global_mean
        );
        self.run_epochs(epochs)
    }

    fn train_more(&mut self, epochs: Option<usize>) -> Result<()> {
        if !self.trained {
            return Err(ModelError::NotTrained);
        }
        self.run_epochs(epochs.unwrap_or(1))
    }

    fn predict(&self, points: &RatingPoints) -> Result<Array1<f32>> {
        if !self.trained {
            return Err(ModelError::NotTrained);
        }
        if points.ncols() <= MOVIE_INDEX {
            return Err(ModelError::InvalidInput(format!(
                "prediction array has {} columns",
                points.ncols()
            )));
        }

        let predictions: Vec<f32> = (0..points.nrows())
            .into_par_iter()
            .map(|i| {
                self.predict_one(
                    points[[i, USER_INDEX]] as UserId,
                    points[[i, MOVIE_INDEX]] as MovieId,
                )
            })
            .collect();
        Ok(Array1::from(predictions))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    fn release_training_data(&mut self) {
        self.train_points = None;
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}
