//! Run orchestration for the rating experiment harness.
//!
//! This crate wires the data loader's arrays into a `RatingModel`'s training
//! lifecycle, evaluates it and persists the results.
//!
//! ## Components
//! - **orchestrator**: `ExperimentRunner`, one experiment from loading to saving
//! - **metrics**: RMSE
//! - **naming**: Timestamped, parameterized artifact filenames
//! - **prompt**: Confirmation before a run that saves nothing
//!
//! ## Example Usage
//! ```ignore
//! use data_loader::DataPaths;
//! use models::BiasModel;
//! use runner::{ExperimentRunner, RunConfig};
//!
//! let mut runner = ExperimentRunner::new(DataPaths::new("."));
//! let mut model = BiasModel::new();
//! let config = RunConfig::new("base", "probe").with_epochs(20).run_multi(true);
//! runner.run(&mut model, &config)?;
//! ```

pub mod error;
pub mod metrics;
pub mod naming;
pub mod orchestrator;
pub mod prompt;

pub use error::MetricError;
pub use metrics::compute_rmse;
pub use naming::{ArtifactName, NameOptions};
pub use orchestrator::{ExperimentRunner, RunConfig, RunOutcome, RunReport, RunStage};
