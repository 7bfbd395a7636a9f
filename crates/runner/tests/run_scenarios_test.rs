//! Integration tests for the experiment orchestrator.
//!
//! A recording model stands in for a real one: it logs every call the
//! runner makes and predicts each true rating plus 0.5, so every RMSE is 0.5.

use chrono::{NaiveDate, NaiveDateTime};
use data_loader::{DataPaths, DatasetStats, RATING_INDEX, RatingPoints, arrays};
use models::{BiasModel, ModelError, RatingModel};
use ndarray::{Array1, array};
use runner::{ExperimentRunner, RunConfig, RunOutcome};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    SetDebug(bool),
    Train { rows: usize, epochs: Option<usize> },
    TrainMore { epochs: Option<usize> },
    TrainFeatureEpoch { rows: usize, epochs: Option<usize> },
    Predict { rows: usize },
    Save(PathBuf),
    Release,
}

#[derive(Default)]
struct RecordingModel {
    calls: Rc<RefCell<Vec<Call>>>,
    stats: Option<DatasetStats>,
}

impl RecordingModel {
    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }
}

impl RatingModel for RecordingModel {
    fn name(&self) -> &str {
        "RecordingModel"
    }

    fn num_features(&self) -> Option<usize> {
        Some(8)
    }

    fn set_debug(&mut self, debug: bool) {
        self.record(Call::SetDebug(debug));
    }

    fn train(
        &mut self,
        points: RatingPoints,
        stats: DatasetStats,
        epochs: Option<usize>,
    ) -> models::Result<()> {
        self.stats = Some(stats);
        self.record(Call::Train { rows: points.nrows(), epochs });
        Ok(())
    }

    fn train_more(&mut self, epochs: Option<usize>) -> models::Result<()> {
        if self.stats.is_none() {
            return Err(ModelError::NotTrained);
        }
        self.record(Call::TrainMore { epochs });
        Ok(())
    }

    fn train_feature_epoch(
        &mut self,
        points: RatingPoints,
        stats: DatasetStats,
        epochs: Option<usize>,
    ) -> models::Result<()> {
        self.stats = Some(stats);
        self.record(Call::TrainFeatureEpoch { rows: points.nrows(), epochs });
        Ok(())
    }

    fn predict(&self, points: &RatingPoints) -> models::Result<Array1<f32>> {
        self.record(Call::Predict { rows: points.nrows() });
        Ok(points.column(RATING_INDEX).mapv(|r| r + 0.5))
    }

    fn save(&self, path: &Path) -> models::Result<()> {
        self.record(Call::Save(path.to_path_buf()));
        fs::write(path, "recorded")?;
        Ok(())
    }

    fn release_training_data(&mut self) {
        self.record(Call::Release);
    }
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 7)
        .unwrap()
        .and_hms_opt(9, 5, 0)
        .unwrap()
}

/// 4-row training array, 2-row test array and a stats blob
fn create_test_setup() -> (TempDir, DataPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    fs::create_dir_all(&paths.data_dir).unwrap();

    let train = array![
        [1.0f32, 1.0, 10.0, 4.0],
        [1.0, 2.0, 11.0, 3.0],
        [2.0, 1.0, 12.0, 5.0],
        [2.0, 3.0, 13.0, 2.0],
    ];
    let test = array![[1.0f32, 3.0, 14.0, 3.0], [2.0, 2.0, 15.0, 4.0]];
    arrays::save_array(&paths.array_path("train"), &train).unwrap();
    arrays::save_array(&paths.array_path("test"), &test).unwrap();
    arrays::save_stats(
        &paths.stats_path("train"),
        &DatasetStats::new(serde_json::json!({ "mean_rating": 3.5 })),
    )
    .unwrap();

    (dir, paths)
}

fn runner_with_input(paths: DataPaths, input: &str) -> ExperimentRunner {
    ExperimentRunner::new(paths)
        .with_prompt(Cursor::new(input.as_bytes().to_vec()), io::sink())
        .with_clock(fixed_clock)
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_single_shot_run() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test").with_epochs(3);
    let outcome = runner.run(&mut model, &config).unwrap();

    let report = match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Aborted => panic!("run should not abort"),
    };

    assert_eq!(model.count(|c| matches!(c, Call::Train { .. })), 1);
    assert!(model.calls().contains(&Call::Train { rows: 4, epochs: Some(3) }));
    assert_eq!(model.count(|c| matches!(c, Call::TrainMore { .. })), 0);
    assert_eq!(model.count(|c| matches!(c, Call::Predict { rows: 2 })), 1);
    assert_eq!(model.count(|c| matches!(c, Call::Save(_))), 1);
    assert!(model.calls().contains(&Call::SetDebug(true)));

    // training data is released before evaluation
    let calls = model.calls();
    let release = calls.iter().position(|c| *c == Call::Release).unwrap();
    let predict = calls.iter().position(|c| matches!(c, Call::Predict { .. })).unwrap();
    assert!(release < predict);

    let reports = files_in(&paths.results_dir);
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].file_name().unwrap(),
        "RecordingModel_train_3epochs_8features_rmse_test_Mar-07-09h-05m.txt"
    );
    assert_eq!(read_lines(&reports[0]), vec!["0.5"]);

    let saved = files_in(&paths.models_dir);
    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0].file_name().unwrap(),
        "RecordingModel_train_3epochs_8features_model_Mar-07-09h-05m_to_Mar-07-09h-05m.bin"
    );

    assert_eq!(report.final_rmse, Some(0.5));
    assert!(report.epoch_rmses.is_empty());
    assert_eq!(report.rmse_path, Some(reports[0].clone()));
    assert_eq!(report.model_path, Some(saved[0].clone()));
}

#[test]
fn test_multi_epoch_run() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test").with_epochs(3).run_multi(true);
    let outcome = runner.run(&mut model, &config).unwrap();

    let trains: Vec<Call> = model
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Train { .. } | Call::TrainMore { .. }))
        .collect();
    assert_eq!(
        trains,
        vec![
            Call::Train { rows: 4, epochs: Some(1) },
            Call::TrainMore { epochs: Some(1) },
            Call::TrainMore { epochs: Some(1) },
        ]
    );

    // one prediction per epoch plus the final evaluation
    assert_eq!(model.count(|c| matches!(c, Call::Predict { .. })), 4);
    assert_eq!(model.count(|c| matches!(c, Call::Save(_))), 1);

    let reports = files_in(&paths.results_dir);
    assert_eq!(reports.len(), 1);
    assert_eq!(read_lines(&reports[0]), vec!["0.5", "0.5", "0.5", "0.5"]);
    assert_eq!(files_in(&paths.models_dir).len(), 1);

    match outcome {
        RunOutcome::Completed(report) => {
            assert_eq!(report.epoch_rmses, vec![0.5, 0.5, 0.5]);
            assert_eq!(report.final_rmse, Some(0.5));
        }
        RunOutcome::Aborted => panic!("run should not abort"),
    }
}

#[test]
fn test_feature_epoch_order_run() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test")
        .with_epochs(2)
        .feature_epoch_order(true);
    runner.run(&mut model, &config).unwrap();

    assert!(
        model
            .calls()
            .contains(&Call::TrainFeatureEpoch { rows: 4, epochs: Some(2) })
    );
    assert_eq!(model.count(|c| matches!(c, Call::Train { .. })), 0);

    let saved = files_in(&paths.models_dir);
    assert_eq!(saved.len(), 1);
    let name = saved[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.contains("_model_feature_epoch_order_"), "{}", name);
}

#[test]
fn test_declined_run_has_no_side_effects() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "n\n");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test").with_epochs(3).create_files(false);
    let outcome = runner.run(&mut model, &config).unwrap();

    assert_eq!(outcome, RunOutcome::Aborted);
    assert!(model.calls().is_empty());
    assert!(!paths.results_dir.exists());
    assert!(!paths.models_dir.exists());
}

#[test]
fn test_declined_run_does_not_touch_missing_data() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let mut runner = runner_with_input(paths, "n\n");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("absent", "absent").create_files(false);
    assert_eq!(runner.run(&mut model, &config).unwrap(), RunOutcome::Aborted);
}

#[test]
fn test_confirmed_run_without_files() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "\n");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test")
        .with_epochs(2)
        .run_multi(true)
        .create_files(false);
    let outcome = runner.run(&mut model, &config).unwrap();

    assert_eq!(model.count(|c| matches!(c, Call::TrainMore { .. })), 1);
    assert_eq!(model.count(|c| matches!(c, Call::Save(_))), 0);
    assert!(files_in(&paths.results_dir).is_empty());
    assert!(files_in(&paths.models_dir).is_empty());

    match outcome {
        RunOutcome::Completed(report) => {
            assert_eq!(report.final_rmse, Some(0.5));
            assert_eq!(report.rmse_path, None);
            assert_eq!(report.model_path, None);
        }
        RunOutcome::Aborted => panic!("empty answer should confirm"),
    }
}

#[test]
fn test_multi_run_needs_epochs() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths, "");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test").run_multi(true);
    assert!(runner.run(&mut model, &config).is_err());
    assert!(model.calls().is_empty());
}

#[test]
fn test_multi_run_rejects_zero_epochs() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("train", "test").with_epochs(0).run_multi(true);
    assert!(runner.run(&mut model, &config).is_err());
    assert!(model.calls().is_empty());
    assert!(files_in(&paths.models_dir).is_empty());
    assert!(files_in(&paths.results_dir).is_empty());
}

#[test]
fn test_zero_epoch_run_evaluates_the_mean() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "");
    let mut model = BiasModel::new();

    let config = RunConfig::new("train", "test").with_epochs(0);
    let report = match runner.run(&mut model, &config).unwrap() {
        RunOutcome::Completed(report) => report,
        RunOutcome::Aborted => panic!("run should not abort"),
    };

    // every prediction is the 3.5 mean; the test ratings are 3 and 4
    let rmse = report.final_rmse.unwrap();
    assert!((rmse - 0.5).abs() < 1e-6);

    assert_eq!(files_in(&paths.models_dir).len(), 1);
    let reports = files_in(&paths.results_dir);
    assert_eq!(reports.len(), 1);
    assert_eq!(read_lines(&reports[0]).len(), 1);
}

#[test]
fn test_missing_training_array() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths, "");
    let mut model = RecordingModel::default();

    let config = RunConfig::new("nonexistent", "test").with_epochs(1);
    let err = runner.run(&mut model, &config).unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to load training array"));
    assert!(model.calls().is_empty());
}

#[test]
fn test_old_run_multi_uses_legacy_names() {
    let (_dir, paths) = create_test_setup();
    let mut runner = runner_with_input(paths.clone(), "");
    let mut model = RecordingModel::default();

    let rmses = runner
        .old_run_multi(&mut model, "train", "test", 2, Some(40))
        .unwrap();

    assert_eq!(rmses, vec![0.5, 0.5]);
    assert_eq!(model.count(|c| matches!(c, Call::Save(_))), 0);
    assert!(model.calls().contains(&Call::Release));

    let reports = files_in(&paths.results_dir);
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].file_name().unwrap(),
        "svd_train_2epochs_40features_rmse_test_Mar-07-09h-05m.txt"
    );
    assert_eq!(read_lines(&reports[0]), vec!["0.5", "0.5"]);
}
