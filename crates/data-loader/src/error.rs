//! Error types for the data-loader crate.
//!
//! Every fallible operation in this crate reports one of these variants, so
//! callers can tell a missing file apart from a malformed one.

use thiserror::Error;

/// Errors that can occur while streaming, loading or writing rating data
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// Input file does not exist
    #[error("No such file: {path}")]
    FileNotFound { path: String },

    /// Reading or writing failed for another reason
    #[error("I/O failure: {0}")]
    IoError(#[from] std::io::Error),

    /// A dataset or index line is not in the expected format
    #[error("{file}:{line}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// One field of a record line is not a number of the right kind
    #[error("Bad {field} value {value:?}")]
    InvalidValue { field: String, value: String },

    /// A record line carried fewer fields than the format requires
    #[error("Expected at least {expected} fields but found {found}")]
    FieldCountMismatch { expected: usize, found: usize },

    /// Points could not be shaped into a rating array
    #[error("Invalid rating points: {0}")]
    ValidationError(String),

    /// A serialized array or stats file has the wrong layout
    #[error("Malformed file {path}: {reason}")]
    Format { path: String, reason: String },

    /// The dataset file and the partition index file have different lengths.
    ///
    /// `records` and `indices` are the number of lines read from each file
    /// when the shorter one ran out.
    #[error("Partition index is misaligned with the dataset: {records} records vs {indices} indices")]
    PartitionAlignment { records: usize, indices: usize },
}

/// Result of any data-loader operation
pub type Result<T> = std::result::Result<T, DataLoadError>;

/// Map an `io::Error` from opening `path` onto `FileNotFound` when that is what happened.
pub(crate) fn open_error(path: &std::path::Path, err: std::io::Error) -> DataLoadError {
    if err.kind() == std::io::ErrorKind::NotFound {
        DataLoadError::FileNotFound {
            path: path.display().to_string(),
        }
    } else {
        DataLoadError::IoError(err)
    }
}
