//! Writers for rating files: one value per line, three decimals.

use crate::error::Result;
use crate::paths::DataPaths;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `values` to `path`, one `{:.3}` formatted value per line.
///
/// The target file is truncated first.
pub fn write_ratings<I>(values: I, path: &Path) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for value in values {
        writeln!(writer, "{:.3}", value.into())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a submission file into the configured submissions directory.
pub fn write_submission<I>(paths: &DataPaths, values: I, file_name: &str) -> Result<PathBuf>
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    let path = paths.submissions_dir.join(file_name);
    write_ratings(values, &path)?;
    info!("Wrote submission to {}", path.display());
    Ok(path)
}
