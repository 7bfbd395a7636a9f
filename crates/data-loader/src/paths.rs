//! Directory and file layout for a harness workspace.
//!
//! Every component receives a `DataPaths` explicitly instead of reading
//! module-level constants, so tests can point the whole harness at a
//! temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extension of serialized training/test arrays
pub const ARRAY_EXTENSION: &str = "npy";

/// Suffix and extension of the stats file stored next to a training array
pub const STATS_SUFFIX: &str = "_stats";
pub const STATS_EXTENSION: &str = "json";

/// Locations of the inputs a run reads and the artifacts it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Serialized arrays and stats
    pub data_dir: PathBuf,
    /// RMSE reports and saved predictions
    pub results_dir: PathBuf,
    pub submissions_dir: PathBuf,
    pub models_dir: PathBuf,
    /// Full whitespace-separated dataset
    pub all_data_file: PathBuf,
    /// Partition index aligned with `all_data_file`
    pub all_index_file: PathBuf,
}

impl DataPaths {
    /// Conventional layout under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let data_dir = root.join("data");
        Self {
            all_data_file: data_dir.join("all.dta"),
            all_index_file: data_dir.join("all.idx"),
            data_dir,
            results_dir: root.join("results"),
            submissions_dir: root.join("submissions"),
            models_dir: root.join("models"),
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_submissions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.submissions_dir = dir.into();
        self
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn with_all_data_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.all_data_file = file.into();
        self
    }

    pub fn with_all_index_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.all_index_file = file.into();
        self
    }

    /// `<data_dir>/<name>.npy`
    pub fn array_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", name, ARRAY_EXTENSION))
    }

    /// `<data_dir>/<name>_stats.json`
    pub fn stats_path(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.{}", name, STATS_SUFFIX, STATS_EXTENSION))
    }

    /// Create every output directory that does not exist yet
    pub fn ensure_output_dirs(&self) -> Result<()> {
        for dir in [&self.results_dir, &self.submissions_dir, &self.models_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new(".")
    }
}
