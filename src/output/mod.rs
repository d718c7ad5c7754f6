//! Tab-delimited outputs: the call matrix and the statistics tables.

pub mod matrix;
pub mod stats;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{MatrixError, Result};

pub const MASTER_MATRIX_FILE: &str = "master.tsv";
pub const MISSING_MATRIX_FILE: &str = "missingdata.tsv";
pub const SAMPLE_STATS_FILE: &str = "sample_stats.tsv";
pub const GENERAL_STATS_FILE: &str = "general_stats.tsv";

/// Destinations for every table a run produces.
#[derive(Debug)]
pub struct Sinks<W> {
    pub matrix: W,
    /// Only present when the missing-data matrix was requested
    pub missing: Option<W>,
    pub sample_stats: W,
    pub general_stats: W,
    /// Files backing the sinks, removed if the run fails
    pub files: Vec<PathBuf>,
}

impl Sinks<BufWriter<File>> {
    /// Create the output files inside `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` if the directory or any file cannot be created.
    pub fn create(dir: &Path, missing_matrix: bool) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| MatrixError::io_at("creating", dir, e))?;

        let mut files = Vec::with_capacity(4);
        let mut create = |name: &str| {
            let path = dir.join(name);
            let file = create_file(&path);
            files.push(path);
            file
        };
        let matrix = create(MASTER_MATRIX_FILE)?;
        let missing = missing_matrix
            .then(|| create(MISSING_MATRIX_FILE))
            .transpose()?;
        let sample_stats = create(SAMPLE_STATS_FILE)?;
        let general_stats = create(GENERAL_STATS_FILE)?;

        Ok(Self {
            matrix,
            missing,
            sample_stats,
            general_stats,
            files,
        })
    }
}

/// Remove the output files of a failed run.
pub(crate) fn discard(files: &[PathBuf]) {
    for path in files {
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "removed output of failed run"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "could not remove output of failed run"
            ),
        }
    }
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| MatrixError::io_at("creating", path, e))
}

pub(crate) fn write_error(table: &str, source: std::io::Error) -> MatrixError {
    MatrixError::io(format!("writing {table}"), source)
}

/// Write `fields` tab-separated and newline-terminated.
pub(crate) fn write_row<W: Write, I>(out: &mut W, fields: I) -> std::io::Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.write_all(b"\t")?;
        }
        out.write_all(field.as_ref())?;
    }
    out.write_all(b"\n")
}
