//! Uniform seek/read over every sample file.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MatrixError, Result};
use crate::parsing::fasta::{is_fasta_file, FastaSource};

/// A per-sample sequence aligned to the reference coordinate system.
///
/// Implemented by each supported sample file format.
pub trait SampleSource: Send {
    /// Position at the start of `contig`. Returns `false` if the sample lacks it,
    /// after which reads return no bytes.
    ///
    /// # Errors
    ///
    /// Returns an error only for IO failures.
    fn seek_contig(&mut self, contig: &str) -> Result<bool>;

    /// Append up to `n` calls of the current contig to `out`.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Format` or `MatrixError::Io`.
    fn read_positions(&mut self, n: usize, out: &mut Vec<u8>) -> Result<()>;

    fn path(&self) -> &Path;
}

impl<R: Read + Seek + Send> SampleSource for FastaSource<R> {
    fn seek_contig(&mut self, contig: &str) -> Result<bool> {
        FastaSource::seek_contig(self, contig)
    }

    fn read_positions(&mut self, n: usize, out: &mut Vec<u8>) -> Result<()> {
        FastaSource::read_positions(self, n, out).map(|_| ())
    }

    fn path(&self) -> &Path {
        FastaSource::path(self)
    }
}

/// Open a sample file with the reader its name selects.
///
/// # Errors
///
/// Returns `MatrixError::UnknownSampleType` for an unsupported file name, or
/// any error from opening and indexing the file.
pub fn open_sample_source(path: &Path) -> Result<Box<dyn SampleSource>> {
    if is_fasta_file(path) {
        Ok(Box::new(FastaSource::open(path, true)?))
    } else {
        Err(MatrixError::UnknownSampleType(path.to_path_buf()))
    }
}

/// Sample display name: the file name without its final extension.
#[must_use]
pub fn sample_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
}

/// Ordered collection of sample sources, read in unison.
pub struct SampleSet {
    sources: Vec<Box<dyn SampleSource>>,
    names: Vec<String>,
}

impl SampleSet {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn SampleSource>>) -> Self {
        let names = sources.iter().map(|s| sample_name(s.path())).collect();
        Self { sources, names }
    }

    /// Open every sample file, keeping the given order.
    ///
    /// # Errors
    ///
    /// Fails on the first file that cannot be opened or has an unknown type.
    pub fn open(paths: &[PathBuf]) -> Result<Self> {
        let sources = paths
            .iter()
            .map(|path| open_sample_source(path))
            .collect::<Result<Vec<_>>>()?;
        debug!(samples = sources.len(), "indexed all samples");
        Ok(Self::new(sources))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Seek every sample to `contig`. Returns how many samples have it.
    ///
    /// # Errors
    ///
    /// Any IO failure is fatal for the whole set; a missing contig is not.
    pub fn seek_contig(&mut self, contig: &str) -> Result<usize> {
        let mut found = 0;
        for (source, name) in self.sources.iter_mut().zip(&self.names) {
            if source.seek_contig(contig)? {
                found += 1;
            } else {
                warn!(sample = %name, contig, "sample has no data for contig; calls will be X");
            }
        }
        Ok(found)
    }

    /// Read up to `n` calls per sample into `out`, one buffer per sample.
    ///
    /// A buffer may end up shorter than `n`; callers treat the missing tail as `X`.
    ///
    /// # Errors
    ///
    /// Returns the first read error from any sample.
    pub fn read_positions(&mut self, n: usize, out: &mut [Vec<u8>]) -> Result<()> {
        debug_assert_eq!(out.len(), self.sources.len());
        for (source, buffer) in self.sources.iter_mut().zip(out.iter_mut()) {
            source.read_positions(n, buffer)?;
        }
        Ok(())
    }
}
