//! Loading and saving of the dense arrays and stats a run consumes.
//!
//! Arrays are NumPy `.npy` files with one rating record per row. Whatever
//! numeric dtype the file was written with is converted to `f32` on load.
//! Stats are free-form JSON handed to the model untouched.

use crate::error::{DataLoadError, Result, open_error};
use crate::types::*;
use ndarray::{Array2, Axis};
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

fn format_error(path: &Path, reason: impl ToString) -> DataLoadError {
    DataLoadError::Format {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Try to decode `bytes` as a 2-D array of `T`, converting each element.
///
/// `Ok(None)` means the file holds a different dtype and the caller should try another.
fn read_as<T>(bytes: &[u8], path: &Path, convert: fn(T) -> f32) -> Result<Option<Array2<f32>>>
where
    T: ReadableElement + Clone,
{
    match Array2::<T>::read_npy(bytes) {
        Ok(array) => Ok(Some(array.mapv(convert))),
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(None),
        Err(e) => Err(format_error(path, e)),
    }
}

fn decode(bytes: &[u8], path: &Path) -> Result<Option<Array2<f32>>> {
    if let Some(array) = read_as::<f32>(bytes, path, |v| v)? {
        return Ok(Some(array));
    }
    if let Some(array) = read_as::<f64>(bytes, path, |v| v as f32)? {
        return Ok(Some(array));
    }
    if let Some(array) = read_as::<i64>(bytes, path, |v| v as f32)? {
        return Ok(Some(array));
    }
    if let Some(array) = read_as::<i32>(bytes, path, |v| v as f32)? {
        return Ok(Some(array));
    }
    if let Some(array) = read_as::<u32>(bytes, path, |v| v as f32)? {
        return Ok(Some(array));
    }
    read_as::<u64>(bytes, path, |v| v as f32)
}

/// Load a dense rating array from a `.npy` file.
///
/// Accepts `f4`, `f8`, `i4`, `i8`, `u4` and `u8` element types. The array
/// must be 2-D with at least `RECORD_FIELDS` columns.
pub fn load_array(path: &Path) -> Result<RatingPoints> {
    let bytes = fs::read(path).map_err(|e| open_error(path, e))?;

    let array =
        decode(&bytes, path)?.ok_or_else(|| format_error(path, "unsupported element type"))?;

    if array.ncols() < RECORD_FIELDS {
        return Err(format_error(
            path,
            format!(
                "expected at least {} columns, found {}",
                RECORD_FIELDS,
                array.ncols()
            ),
        ));
    }

    debug!("Loaded {} points from {}", array.nrows(), path.display());
    Ok(array)
}

/// Write a rating array as a `.npy` file of `f4` values.
pub fn save_array(path: &Path, points: &RatingPoints) -> Result<()> {
    ndarray_npy::write_npy(path, points).map_err(|e| format_error(path, e))
}

/// Collect a record stream into a dense array, one row per record.
pub fn collect_points<I>(records: I) -> Result<RatingPoints>
where
    I: IntoIterator<Item = Result<Rating>>,
{
    let mut values = Vec::new();
    let mut rows = 0;
    for record in records {
        let (user, movie, time, rating) = record?.fields();
        values.extend_from_slice(&[user as f32, movie as f32, time as f32, rating]);
        rows += 1;
    }

    Array2::from_shape_vec((rows, RECORD_FIELDS), values)
        .map_err(|e| DataLoadError::ValidationError(e.to_string()))
}

/// Load the opaque stats blob stored next to a training array.
pub fn load_stats(path: &Path) -> Result<DatasetStats> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| format_error(path, e))
}

pub fn save_stats(path: &Path, stats: &DatasetStats) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), stats).map_err(|e| format_error(path, e))
}

/// Summary statistics for a training array.
///
/// Produces `mean_rating`, `num_points`, `num_users` and `num_movies`.
pub fn compute_stats(points: &RatingPoints) -> DatasetStats {
    let num_points = points.nrows();
    let mean_rating = if num_points > 0 {
        points
            .index_axis(Axis(1), RATING_INDEX)
            .iter()
            .map(|&r| r as f64)
            .sum::<f64>()
            / num_points as f64
    } else {
        0.0
    };

    let distinct = |column: usize| {
        points
            .index_axis(Axis(1), column)
            .iter()
            .map(|&v| v as u32)
            .collect::<HashSet<_>>()
            .len()
    };

    DatasetStats::new(serde_json::json!({
        "mean_rating": mean_rating,
        "num_points": num_points,
        "num_users": distinct(USER_INDEX),
        "num_movies": distinct(MOVIE_INDEX),
    }))
}
