//! Partition filtering over the full dataset.
//!
//! The index file assigns every dataset line to a partition by position:
//! line N of the index holds the code of line N of the dataset. A
//! `PartitionStream` walks both files in lockstep and keeps the records whose
//! code matches, so neither file is ever loaded whole.
//!
//! Alignment is checked lazily: when one file runs out before the other the
//! stream yields a single `PartitionAlignment` error and stops.

use crate::error::{DataLoadError, Result};
use crate::parser::{self, IndexStream, PROGRESS_INTERVAL, RecordStream};
use crate::paths::DataPaths;
use crate::types::*;
use tracing::{debug, info};

/// Lazy, finite sequence of the records belonging to one partition code
pub struct PartitionStream {
    records: RecordStream,
    indices: IndexStream,
    code: PartitionCode,
    yielded: usize,
    finished: bool,
}

impl PartitionStream {
    /// Partition code this stream keeps
    pub fn code(&self) -> PartitionCode {
        self.code
    }

    fn misaligned(&mut self) -> DataLoadError {
        self.finished = true;
        DataLoadError::PartitionAlignment {
            records: self.records.lines_read(),
            indices: self.indices.lines_read(),
        }
    }
}

impl Iterator for PartitionStream {
    type Item = Result<Rating>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let (record, code) = match (self.records.next(), self.indices.next()) {
                (Some(record), Some(code)) => (record, code),
                (None, None) => {
                    self.finished = true;
                    debug!("Partition {} exhausted after {} points", self.code, self.yielded);
                    return None;
                }
                _ => return Some(Err(self.misaligned())),
            };

            let code = match code {
                Ok(code) => code,
                Err(e) => return Some(Err(e)),
            };
            let record = match record {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };

            if code != self.code {
                continue;
            }

            if self.yielded % PROGRESS_INTERVAL == 0 {
                debug!("{} points generated", self.yielded);
            }
            self.yielded += 1;
            return Some(Ok(record));
        }
    }
}

/// Stream the records of the canonical dataset whose aligned index equals `partition_code`.
pub fn stream_partition(paths: &DataPaths, partition_code: PartitionCode) -> Result<PartitionStream> {
    Ok(PartitionStream {
        records: parser::stream_all_records(&paths.all_data_file)?,
        indices: parser::stream_indices(&paths.all_index_file)?,
        code: partition_code,
        yielded: 0,
        finished: false,
    })
}

/// Every record of the canonical dataset, regardless of partition
pub fn all_points(paths: &DataPaths) -> Result<RecordStream> {
    parser::stream_all_records(&paths.all_data_file)
}

pub fn base_points(paths: &DataPaths) -> Result<PartitionStream> {
    stream_partition(paths, BASE_INDEX)
}

pub fn valid_points(paths: &DataPaths) -> Result<PartitionStream> {
    stream_partition(paths, VALID_INDEX)
}

pub fn hidden_points(paths: &DataPaths) -> Result<PartitionStream> {
    stream_partition(paths, HIDDEN_INDEX)
}

pub fn probe_points(paths: &DataPaths) -> Result<PartitionStream> {
    stream_partition(paths, PROBE_INDEX)
}

pub fn qual_points(paths: &DataPaths) -> Result<PartitionStream> {
    stream_partition(paths, QUAL_INDEX)
}

/// Check that the dataset and index files have the same number of lines.
///
/// Returns the shared line count.
pub fn validate_alignment(paths: &DataPaths) -> Result<usize> {
    let records = count_lines(&paths.all_data_file)?;
    let indices = count_lines(&paths.all_index_file)?;

    if records != indices {
        return Err(DataLoadError::PartitionAlignment { records, indices });
    }
    Ok(records)
}

fn count_lines(path: &std::path::Path) -> Result<usize> {
    let mut count = 0;
    for line in parser::open_lines(path)? {
        line?;
        count += 1;
    }
    Ok(count)
}

/// Count how many dataset records fall under each index code.
///
/// One aligned pass; fails on the first misalignment or unreadable code.
pub fn count_partitions(paths: &DataPaths) -> Result<PartitionCounts> {
    let mut records = parser::open_lines(&paths.all_data_file)?;
    let mut indices = parser::stream_indices(&paths.all_index_file)?;
    let mut counts = PartitionCounts::default();

    loop {
        match (records.next(), indices.next()) {
            (Some(line), Some(code)) => {
                line?;
                *counts.by_code.entry(code?).or_insert(0) += 1;
                counts.total += 1;
            }
            (None, None) => break,
            (None, Some(_)) => {
                return Err(DataLoadError::PartitionAlignment {
                    records: counts.total,
                    indices: indices.lines_read(),
                });
            }
            (Some(_), None) => {
                return Err(DataLoadError::PartitionAlignment {
                    records: counts.total + 1,
                    indices: indices.lines_read(),
                });
            }
        }
    }

    info!(
        "Counted {} records across {} partition codes",
        counts.total,
        counts.by_code.len()
    );
    Ok(counts)
}
