//! Rating models for the experiment harness.
//!
//! - **traits**: `RatingModel`, the contract the run orchestrator drives
//! - **bias**: `BiasModel`, a global-mean plus user/movie bias baseline
//! - **error**: `ModelError`
//!
//! ## Example Usage
//! ```ignore
//! use models::{BiasModel, RatingModel};
//!
//! let mut model = BiasModel::new().with_learning_rate(0.01);
//! model.train(train_points, stats, Some(20))?;
//! let predictions = model.predict(&test_points)?;
//! ```

pub mod bias;
pub mod error;
pub mod traits;

// Re-export main types
pub use bias::BiasModel;
pub use error::{ModelError, Result};
pub use traits::RatingModel;
