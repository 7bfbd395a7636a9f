//! # Data Loader Crate
//!
//! Data access for the rating experiment harness.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Rating, Partition, DatasetStats, RatingPoints)
//! - **parser**: Streaming parsers for the full dataset and index files
//! - **partition**: Positional filtering of the dataset by partition code
//! - **arrays**: `.npy` arrays and JSON stats consumed by a run
//! - **writer**: Rating and submission file writers
//! - **paths**: Explicit directory layout (`DataPaths`)
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{DataPaths, partition, arrays};
//!
//! let paths = DataPaths::new(".");
//!
//! // Stream the probe partition without loading the dataset
//! for record in partition::probe_points(&paths)? {
//!     let (user, movie, time, rating) = record?.fields();
//!     println!("{user} {movie} {time} {rating}");
//! }
//!
//! // Load a training array and its stats
//! let points = arrays::load_array(&paths.array_path("base"))?;
//! let stats = arrays::load_stats(&paths.stats_path("base"))?;
//! ```

// Public modules
pub mod arrays;
pub mod error;
pub mod parser;
pub mod partition;
pub mod paths;
pub mod types;
pub mod writer;

// Re-export commonly used types for convenience
pub use arrays::{load_array, load_stats};
pub use error::{DataLoadError, Result};
pub use parser::{
    IndexStream, RecordStream, parse_record_fields, stream_all_records, stream_indices,
};
pub use partition::{PartitionStream, stream_partition};
pub use paths::DataPaths;
pub use types::{
    // Type aliases
    MovieId,
    Timestamp,
    UserId,
    RatingPoints,
    // Core types
    DatasetStats,
    Partition,
    PartitionCode,
    PartitionCounts,
    Rating,
    // Field positions
    MOVIE_INDEX,
    RATING_INDEX,
    TIME_INDEX,
    USER_INDEX,
};
pub use writer::{write_ratings, write_submission};
