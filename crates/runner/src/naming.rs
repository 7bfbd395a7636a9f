//! Artifact filenames.
//!
//! Reports and saved models are identified on disk only by their names:
//!
//! - RMSE report: `{model}_{train}[_{E}epochs][_{F}features]_rmse_{test}_{time}.txt`
//! - model file: `{model}_{train}[_{E}epochs][_{F}features]_model[_feature_epoch_order]_{start}_to_{end}.{ext}`
//!
//! Timestamps have minute resolution, so two runs started in the same
//! minute with the same parameters share a report file.

use chrono::NaiveDateTime;

/// month-day-hour-minute, e.g. `Mar-07-09h-05m`
pub const TIME_FORMAT: &str = "%b-%d-%Hh-%Mm";

/// Model tag used by the legacy multi-epoch reports
pub const LEGACY_MODEL_TAG: &str = "svd";

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Optional segments of an artifact name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameOptions {
    pub epochs: Option<usize>,
    pub features: Option<usize>,
    pub feature_epoch_order: bool,
}

/// Builds the filenames of one run's artifacts
#[derive(Debug, Clone)]
pub struct ArtifactName<'a> {
    model: &'a str,
    train_set: &'a str,
    options: NameOptions,
}

impl<'a> ArtifactName<'a> {
    pub fn new(model: &'a str, train_set: &'a str) -> Self {
        Self {
            model,
            train_set,
            options: NameOptions::default(),
        }
    }

    /// Names in the legacy `svd_...` family
    pub fn legacy(train_set: &'a str) -> Self {
        Self::new(LEGACY_MODEL_TAG, train_set)
    }

    pub fn with_options(mut self, options: NameOptions) -> Self {
        self.options = options;
        self
    }

    /// `{model}_{train}[_{E}epochs][_{F}features]`
    fn stem(&self) -> String {
        let mut stem = format!("{}_{}", self.model, self.train_set);
        if let Some(epochs) = self.options.epochs {
            stem.push_str(&format!("_{}epochs", epochs));
        }
        if let Some(features) = self.options.features {
            stem.push_str(&format!("_{}features", features));
        }
        stem
    }

    pub fn rmse_report(&self, test_set: &str, time: &str) -> String {
        format!("{}_rmse_{}_{}.txt", self.stem(), test_set, time)
    }

    pub fn model_file(&self, started: &str, finished: &str, extension: &str) -> String {
        let order = if self.options.feature_epoch_order {
            "_feature_epoch_order"
        } else {
            ""
        };
        format!(
            "{}_model{}_{}_to_{}.{}",
            self.stem(),
            order,
            started,
            finished,
            extension
        )
    }
}
