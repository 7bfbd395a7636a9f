//! Core domain types for the ratings dataset.
//!
//! - Type aliases for ids (UserId, MovieId, Timestamp)
//! - Positional field constants for the whitespace-separated text format
//! - Partition codes used by the aligned index file
//! - The dense training/test array and the opaque stats blob

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

/// Day number the rating was made on
pub type Timestamp = u32;

/// Dense training or test array: one rating record per row.
///
/// Columns follow the same positions as the text format, so
/// `points[[row, RATING_INDEX]]` is the true rating.
pub type RatingPoints = Array2<f32>;

// =============================================================================
// Field positions
// =============================================================================

pub const USER_INDEX: usize = 0;
pub const MOVIE_INDEX: usize = 1;
pub const TIME_INDEX: usize = 2;
pub const RATING_INDEX: usize = 3;

/// Number of fields every record line must carry
pub const RECORD_FIELDS: usize = 4;

// =============================================================================
// Partition codes
// =============================================================================

/// One line of the index file. Codes outside the named partitions are kept
/// as they are and simply belong to no `Partition`.
pub type PartitionCode = i32;

pub const BASE_INDEX: PartitionCode = 1;
pub const VALID_INDEX: PartitionCode = 2;
pub const HIDDEN_INDEX: PartitionCode = 3;
pub const PROBE_INDEX: PartitionCode = 4;
pub const QUAL_INDEX: PartitionCode = 5;

/// Named subsets of the full dataset, selected through the index file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    Base,
    Valid,
    Hidden,
    Probe,
    Qual,
}

impl Partition {
    pub const ALL: [Partition; 5] = [
        Partition::Base,
        Partition::Valid,
        Partition::Hidden,
        Partition::Probe,
        Partition::Qual,
    ];

    /// Code written in the index file for this partition
    pub fn code(self) -> PartitionCode {
        match self {
            Partition::Base => BASE_INDEX,
            Partition::Valid => VALID_INDEX,
            Partition::Hidden => HIDDEN_INDEX,
            Partition::Probe => PROBE_INDEX,
            Partition::Qual => QUAL_INDEX,
        }
    }

    pub fn from_code(code: PartitionCode) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Partition::Base => "base",
            Partition::Valid => "valid",
            Partition::Hidden => "hidden",
            Partition::Probe => "probe",
            Partition::Qual => "qual",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Rating Type
// =============================================================================

/// A single (user, movie, time, rating) record from the full dataset file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub timestamp: Timestamp,
    /// Rating value from 1.0 to 5.0, or 0.0 for unrated (qual) rows
    pub rating: f32,
}

impl Rating {
    /// The record's fields in positional order
    pub fn fields(&self) -> (UserId, MovieId, Timestamp, f32) {
        (self.user_id, self.movie_id, self.timestamp, self.rating)
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Precomputed statistics for a training set.
///
/// The harness never interprets these; they are handed to the model as loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetStats(serde_json::Value);

impl DatasetStats {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Look up a top-level numeric entry
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Record counts per index code from one aligned pass over the dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub total: usize,
    pub by_code: BTreeMap<PartitionCode, usize>,
}

impl PartitionCounts {
    pub fn get(&self, partition: Partition) -> usize {
        self.by_code.get(&partition.code()).copied().unwrap_or(0)
    }

    /// Records whose code is not one of the named partitions
    pub fn unassigned(&self) -> usize {
        self.by_code
            .iter()
            .filter(|(code, _)| Partition::from_code(**code).is_none())
            .map(|(_, count)| count)
            .sum()
    }
}
