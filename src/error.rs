//! Error taxonomy shared by the readers, the pipeline, and the writers.
//!
//! Normal end of input is never an error: sequential reads return `Ok(None)` and
//! chunked reads report `end_of_contig`. Everything represented here is fatal.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    /// Missing required input, or inputs that disagree with each other
    /// (e.g. a duplicates file out of lockstep with the reference).
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unexpected character '{}' (0x{byte:02x}) in {} at byte {offset}{}", escape_byte(.byte), .path.display(), contig_suffix(.contig))]
    Format {
        path: PathBuf,
        contig: Option<String>,
        offset: u64,
        byte: u8,
    },

    #[error("Malformed header in {}: {reason}", .path.display())]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown sample analysis type: {}", .0.display())]
    UnknownSampleType(PathBuf),

    #[error("Too many contigs in {}: {count} exceeds maximum allowed (100000)", .path.display())]
    TooManyContigs { path: PathBuf, count: usize },

    #[error("Pipeline failure: {0}")]
    Pipeline(String),
}

fn escape_byte(byte: &u8) -> String {
    char::from(*byte).escape_default().to_string()
}

fn contig_suffix(contig: &Option<String>) -> String {
    contig
        .as_deref()
        .map(|name| format!(" (contig {name})"))
        .unwrap_or_default()
}

impl MatrixError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap an IO error that happened while touching `path`.
    pub fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("{action} {}", path.display()), source)
    }
}

pub type Result<T> = std::result::Result<T, MatrixError>;
