//! Streaming parsers for the line-oriented dataset and index files.
//!
//! - full dataset: `user movie time rating`, whitespace separated, one record per line
//! - index file: one partition code per line, aligned with the dataset by line number
//!
//! Both files are far too large to hold in memory, so each parser is an
//! iterator over a buffered reader. Calling `stream_all_records` or
//! `stream_indices` again reopens the file and starts from the top.
//!
//! Blank lines are reported as parse errors rather than skipped: skipping a
//! line in one file but not the other would shift the positional alignment.

use crate::error::{DataLoadError, Result, open_error};
use crate::types::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::debug;

/// Progress is reported once per this many items
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Open a file for line-by-line reading
pub(crate) fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    Ok(BufReader::new(file).lines())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract a rating record from its whitespace-split fields.
///
/// Fields are read by position (`USER_INDEX`, `MOVIE_INDEX`, `TIME_INDEX`,
/// `RATING_INDEX`); anything after the last positional field is ignored.
pub fn parse_record_fields(fields: &[&str]) -> Result<Rating> {
    if fields.len() < RECORD_FIELDS {
        return Err(DataLoadError::FieldCountMismatch {
            expected: RECORD_FIELDS,
            found: fields.len(),
        });
    }

    let invalid = |field: &str, value: &str| DataLoadError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    };

    let user = fields[USER_INDEX];
    let movie = fields[MOVIE_INDEX];
    let time = fields[TIME_INDEX];
    let rating = fields[RATING_INDEX];

    Ok(Rating {
        user_id: user.parse().map_err(|_| invalid("user", user))?,
        movie_id: movie.parse().map_err(|_| invalid("movie", movie))?,
        timestamp: time.parse().map_err(|_| invalid("time", time))?,
        rating: rating.parse().map_err(|_| invalid("rating", rating))?,
    })
}

/// Lazy, finite sequence of records read from the full dataset file
pub struct RecordStream {
    lines: Lines<BufReader<File>>,
    file: String,
    line_no: usize,
}

impl RecordStream {
    /// Number of lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl Iterator for RecordStream {
    type Item = Result<Rating>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        let count = self.line_no;
        self.line_no += 1;

        if count % PROGRESS_INTERVAL == 0 {
            debug!("{} records streamed from {}", count, self.file);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        Some(
            parse_record_fields(&fields).map_err(|e| DataLoadError::ParseError {
                file: self.file.clone(),
                line: self.line_no,
                reason: e.to_string(),
            }),
        )
    }
}

/// Lazy, finite sequence of partition codes read from an index file
pub struct IndexStream {
    lines: Lines<BufReader<File>>,
    file: String,
    line_no: usize,
}

impl IndexStream {
    /// Number of lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl Iterator for IndexStream {
    type Item = Result<PartitionCode>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        self.line_no += 1;

        let trimmed = line.trim();
        Some(trimmed.parse().map_err(|e| DataLoadError::ParseError {
            file: self.file.clone(),
            line: self.line_no,
            reason: format!("Invalid index {:?}: {}", trimmed, e),
        }))
    }
}

/// Stream every record of the dataset file at `path`.
pub fn stream_all_records(path: &Path) -> Result<RecordStream> {
    Ok(RecordStream {
        lines: open_lines(path)?,
        file: file_label(path),
        line_no: 0,
    })
}

/// Stream every partition code of the index file at `path`.
pub fn stream_indices(path: &Path) -> Result<IndexStream> {
    Ok(IndexStream {
        lines: open_lines(path)?,
        file: file_label(path),
        line_no: 0,
    })
}
