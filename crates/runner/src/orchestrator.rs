//! # Experiment Orchestrator
//!
//! Sequences a single experiment:
//! 1. Confirm when the run will not persist anything
//! 2. Load the training array, its stats and the test array
//! 3. Train the model (single-shot, feature/epoch ordered, or epoch by epoch)
//! 4. Release the training array
//! 5. Save the model
//! 6. Predict the test set and append the RMSE to the run's report
//!
//! In epoch-by-epoch mode an RMSE line is appended after every epoch, so the
//! report doubles as a convergence curve. The final evaluation appends one
//! more line, which repeats the last epoch's value.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use data_loader::{DataPaths, DatasetStats, RATING_INDEX, RatingPoints, arrays};
use models::RatingModel;

use crate::metrics::compute_rmse;
use crate::naming::{ArtifactName, NameOptions, format_timestamp};
use crate::prompt;

/// Parameters of one experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub train_set: String,
    pub test_set: String,
    /// Epochs to train; the model's default when `None`
    pub epochs: Option<usize>,
    /// Feature count, reported in the logs only
    pub features: Option<usize>,
    /// Let the model order its own feature/epoch passes
    pub feature_epoch_order: bool,
    /// Write the model and RMSE report to disk
    pub create_files: bool,
    /// Train one epoch at a time, evaluating after each
    pub run_multi: bool,
}

impl RunConfig {
    pub fn new(train_set: impl Into<String>, test_set: impl Into<String>) -> Self {
        Self {
            train_set: train_set.into(),
            test_set: test_set.into(),
            epochs: None,
            features: None,
            feature_epoch_order: false,
            create_files: true,
            run_multi: false,
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = Some(epochs);
        self
    }

    pub fn with_features(mut self, features: usize) -> Self {
        self.features = Some(features);
        self
    }

    pub fn feature_epoch_order(mut self, enabled: bool) -> Self {
        self.feature_epoch_order = enabled;
        self
    }

    pub fn create_files(mut self, enabled: bool) -> Self {
        self.create_files = enabled;
        self
    }

    pub fn run_multi(mut self, enabled: bool) -> Self {
        self.run_multi = enabled;
        self
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Loading,
    Training,
    Predicting,
    SavingRmse,
    SavingModel,
    Evaluating,
    Done,
}

/// What a completed run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// RMSE after each epoch (epoch-by-epoch runs that write files)
    pub epoch_rmses: Vec<f64>,
    /// RMSE of the trained model on the test set
    pub final_rmse: Option<f64>,
    pub rmse_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The operator declined a run without persistence
    Aborted,
    Completed(RunReport),
}

/// Drives models through experiments against one data layout
pub struct ExperimentRunner {
    paths: DataPaths,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ExperimentRunner {
    /// Create a runner that prompts on stdin/stdout
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths,
            input: Box::new(io::BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
            clock: local_now,
        }
    }

    /// Read confirmations from `input` and write prompts to `output`
    pub fn with_prompt(mut self, input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        self.input = Box::new(input);
        self.output = Box::new(output);
        self
    }

    /// Replace the clock used for artifact timestamps
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    fn enter(&self, stage: RunStage) {
        debug!("Run stage: {:?}", stage);
    }

    /// Run one experiment.
    ///
    /// Returns `RunOutcome::Aborted` when `create_files` is off and the
    /// operator declines to continue; nothing is loaded or trained then.
    pub fn run<M>(&mut self, model: &mut M, config: &RunConfig) -> Result<RunOutcome>
    where
        M: RatingModel + ?Sized,
    {
        let start_time = Instant::now();
        info!(
            "Training {} on \"{}\" ratings",
            model.name(),
            config.train_set
        );

        if config.run_multi {
            match config.epochs {
                None => bail!("Training one epoch at a time needs an epoch count"),
                Some(0) => bail!("Training one epoch at a time needs at least one epoch"),
                Some(_) => {}
            }
        }

        if !config.create_files {
            warn!("No model file will be saved to disk after this run");
            writeln!(
                self.output,
                "WARNING: 'nofile' flag detected. No model file will be saved to disk after this run.\n***MODEL WILL BE LOST."
            )?;
            let proceed = prompt::confirm(
                &mut self.input,
                &mut self.output,
                "Are you sure you want to continue?",
            )
            .context("Failed to read confirmation")?;
            if !proceed {
                info!("Run aborted by operator");
                return Ok(RunOutcome::Aborted);
            }
        }

        if let Some(epochs) = config.epochs {
            info!("Number of epochs: {}", epochs);
        }
        if let Some(features) = config.features {
            info!("Number of features: {}", features);
        }

        let started = (self.clock)();
        let mut report = RunReport::default();

        self.enter(RunStage::Loading);
        let (train_points, stats, test_points) =
            self.load_run_data(&config.train_set, &config.test_set)?;
        model.set_debug(true);

        if config.create_files {
            self.paths
                .ensure_output_dirs()
                .context("Failed to create output directories")?;
        }

        let rmse_file_name = ArtifactName::new(model.name(), &config.train_set)
            .with_options(NameOptions {
                epochs: config.epochs,
                features: model.num_features(),
                feature_epoch_order: false,
            })
            .rmse_report(&config.test_set, &format_timestamp(&started));

        self.enter(RunStage::Training);
        if !config.run_multi {
            if !config.feature_epoch_order {
                model.train(train_points, stats, config.epochs)?;
            } else {
                model.train_feature_epoch(train_points, stats, config.epochs)?;
            }
        } else {
            info!("Training multi");
            let epochs = config.epochs.unwrap_or_default();
            let mut initial = Some((train_points, stats));
            for epoch in 0..epochs {
                debug!("Training epoch {}", epoch + 1);
                match initial.take() {
                    Some((points, stats)) => model.train(points, stats, Some(1))?,
                    None => model.train_more(Some(1))?,
                }
                if config.create_files {
                    let rmse = self.predict_and_save_rmse(
                        &*model,
                        &test_points,
                        &config.test_set,
                        &rmse_file_name,
                    )?;
                    report.epoch_rmses.push(rmse);
                    report.rmse_path = Some(self.paths.results_dir.join(&rmse_file_name));
                }
            }
        }

        model.release_training_data();

        if config.create_files {
            self.enter(RunStage::SavingModel);
            let finished = (self.clock)();
            let model_path = self.save_model(
                &*model,
                &config.train_set,
                config.epochs,
                config.feature_epoch_order,
                &started,
                &finished,
            )?;
            report.model_path = Some(model_path);

            self.enter(RunStage::Evaluating);
            let rmse = self.predict_and_save_rmse(
                &*model,
                &test_points,
                &config.test_set,
                &rmse_file_name,
            )?;
            report.final_rmse = Some(rmse);
            report.rmse_path = Some(self.paths.results_dir.join(&rmse_file_name));
        } else {
            self.enter(RunStage::Evaluating);
            let rmse = self.evaluate(&*model, &test_points, &config.test_set)?;
            report.final_rmse = Some(rmse);
        }

        self.enter(RunStage::Done);
        info!(
            "Run of {} finished in {:.2?}",
            model.name(),
            start_time.elapsed()
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Earlier epoch-by-epoch loop, kept for its `svd_...` report names.
    ///
    /// Always writes one RMSE line per epoch and never saves the model.
    pub fn old_run_multi<M>(
        &mut self,
        model: &mut M,
        train_set: &str,
        test_set: &str,
        epochs: usize,
        features: Option<usize>,
    ) -> Result<Vec<f64>>
    where
        M: RatingModel + ?Sized,
    {
        info!("Training {} on \"{}\" ratings", model.name(), train_set);
        info!("Maximum number of epochs: {}", epochs);
        if let Some(features) = features {
            info!("Number of features: {}", features);
        }

        let (train_points, stats, test_points) = self.load_run_data(train_set, test_set)?;
        self.paths
            .ensure_output_dirs()
            .context("Failed to create output directories")?;

        let rmse_file_name = ArtifactName::legacy(train_set)
            .with_options(NameOptions {
                epochs: Some(epochs),
                features,
                feature_epoch_order: false,
            })
            .rmse_report(test_set, &format_timestamp(&(self.clock)()));

        model.set_debug(true);
        let mut rmses = Vec::with_capacity(epochs);
        let mut initial = Some((train_points, stats));
        for epoch in 0..epochs {
            info!("Training epoch {}:", epoch);
            match initial.take() {
                Some((points, stats)) => model.train(points, stats, Some(1))?,
                None => model.train_more(Some(1))?,
            }
            rmses.push(self.predict_and_save_rmse(&*model, &test_points, test_set, &rmse_file_name)?);
        }
        model.release_training_data();

        Ok(rmses)
    }

    /// Load `<train>.npy`, `<train>_stats.json` and `<test>.npy`
    fn load_run_data(
        &self,
        train_set: &str,
        test_set: &str,
    ) -> Result<(RatingPoints, DatasetStats, RatingPoints)> {
        let train_path = self.paths.array_path(train_set);
        let stats_path = self.paths.stats_path(train_set);
        let test_path = self.paths.array_path(test_set);

        let train_points = arrays::load_array(&train_path)
            .with_context(|| format!("Failed to load training array {}", train_path.display()))?;
        let stats = arrays::load_stats(&stats_path)
            .with_context(|| format!("Failed to load stats {}", stats_path.display()))?;
        let test_points = arrays::load_array(&test_path)
            .with_context(|| format!("Failed to load test array {}", test_path.display()))?;

        info!(
            "Loaded {} training points and {} test points",
            train_points.nrows(),
            test_points.nrows()
        );
        Ok((train_points, stats, test_points))
    }

    /// Predict `test_points` and return the RMSE against their true ratings
    fn evaluate<M>(&self, model: &M, test_points: &RatingPoints, test_set: &str) -> Result<f64>
    where
        M: RatingModel + ?Sized,
    {
        self.enter(RunStage::Predicting);
        info!("Predicting \"{}\" ratings", test_set);
        let predictions = model.predict(test_points)?;
        let truth = test_points.column(RATING_INDEX);
        let rmse = compute_rmse(truth, predictions.view())?;
        info!("RMSE: {}", rmse);
        Ok(rmse)
    }

    /// Predict, compute RMSE and append it to `rmse_file_name`
    pub fn predict_and_save_rmse<M>(
        &self,
        model: &M,
        test_points: &RatingPoints,
        test_set: &str,
        rmse_file_name: &str,
    ) -> Result<f64>
    where
        M: RatingModel + ?Sized,
    {
        let rmse = self.evaluate(model, test_points, test_set)?;
        self.save_rmse(rmse, rmse_file_name, true)?;
        Ok(rmse)
    }

    /// Write one RMSE line into the results directory.
    ///
    /// `append` adds to an existing report; otherwise the file is truncated.
    pub fn save_rmse(&self, rmse: f64, rmse_file_name: &str, append: bool) -> Result<PathBuf> {
        self.enter(RunStage::SavingRmse);
        let path = self.paths.results_dir.join(rmse_file_name);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .with_context(|| format!("Failed to open RMSE report {}", path.display()))?;
        writeln!(file, "{}", rmse)?;
        Ok(path)
    }

    /// Save the model under a name derived from the run's parameters
    pub fn save_model<M>(
        &self,
        model: &M,
        train_set: &str,
        epochs: Option<usize>,
        feature_epoch_order: bool,
        started: &NaiveDateTime,
        finished: &NaiveDateTime,
    ) -> Result<PathBuf>
    where
        M: RatingModel + ?Sized,
    {
        let file_name = ArtifactName::new(model.name(), train_set)
            .with_options(NameOptions {
                epochs,
                features: model.num_features(),
                feature_epoch_order,
            })
            .model_file(
                &format_timestamp(started),
                &format_timestamp(finished),
                model.file_extension(),
            );
        let path = self.paths.models_dir.join(file_name);

        model
            .save(&path)
            .with_context(|| format!("Failed to save model to {}", path.display()))?;
        info!("Saved model to {}", path.display());
        Ok(path)
    }

    /// Write predictions into the results directory, three decimals per line
    pub fn save_predictions<I>(&self, predictions: I, file_name: &str) -> Result<PathBuf>
    where
        I: IntoIterator,
        I::Item: Into<f64>,
    {
        let path = self.paths.results_dir.join(file_name);
        data_loader::write_ratings(predictions, &path)
            .with_context(|| format!("Failed to write predictions to {}", path.display()))?;
        Ok(path)
    }
}
