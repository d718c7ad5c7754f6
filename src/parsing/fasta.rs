//! Seekable, chunked reader over a FASTA-like sequence file.
//!
//! Framing is handled by `noodles::fasta`:
//! - Definition lines are read with [`fasta::io::Reader::read_definition`] and
//!   parsed as a [`Definition`]; the contig name is the definition name with an
//!   optional `franken::` prefix removed
//! - Sequence bytes come from [`fasta::io::Reader::sequence_reader`], which stops
//!   at the next definition line or EOF
//!
//! Sequence bytes are returned uppercased with whitespace skipped. Any other
//! byte inside a sequence is a [`MatrixError::Format`].
//!
//! A source can be used two ways:
//! - **Sequential** ([`FastaSource::next_contig`]): walk contigs in file order
//!   (the reference and the duplicates mask)
//! - **Indexed** ([`FastaSource::seek_contig`]): jump to a contig by name (samples)

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use noodles::fasta::{self, record::Definition};
use tracing::{debug, warn};

use crate::core::contig::{contig_name, ContigEntry};
use crate::error::{MatrixError, Result};
use crate::utils::validation::check_contig_limit;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Check if the path routes to the FASTA reader.
///
/// The rule is a case-sensitive suffix match on `fasta`, so `.fasta`,
/// `.frankenfasta` and even `notReallyAfasta` all qualify.
pub fn is_fasta_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with("fasta")
}

/// Bytes accepted inside a contig body besides whitespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alphabet {
    /// Letters only (reference and sample sequences)
    #[default]
    Sequence,
    /// Letters and digits (duplicates mask flags such as `0`/`1`)
    Flags,
}

impl Alphabet {
    #[inline]
    fn accepts(self, byte: u8) -> bool {
        match self {
            Self::Sequence => byte.is_ascii_alphabetic(),
            Self::Flags => byte.is_ascii_alphanumeric(),
        }
    }
}

#[derive(Debug)]
struct ContigIndex {
    entries: Vec<ContigEntry>,
    by_name: HashMap<String, usize>,
}

/// A FASTA file exposed as a stream of per-contig sequence bytes.
pub struct FastaSource<R = File> {
    path: PathBuf,
    reader: fasta::io::Reader<BufReader<R>>,
    index: Option<ContigIndex>,
    alphabet: Alphabet,
    /// Contig currently being read, for error messages
    current: Option<String>,
    /// The current contig has no more sequence bytes
    exhausted: bool,
}

impl<R> fmt::Debug for FastaSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastaSource")
            .field("path", &self.path)
            .field("index", &self.index)
            .field("alphabet", &self.alphabet)
            .field("current", &self.current)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl FastaSource<File> {
    /// Open a FASTA file, optionally building a contig index for [`FastaSource::seek_contig`].
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` if the file cannot be opened or read,
    /// `MatrixError::MalformedHeader` for a header without a name, or
    /// `MatrixError::TooManyContigs` if the contig limit is exceeded.
    pub fn open(path: &Path, index: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| MatrixError::io_at("opening", path, e))?;
        Self::from_reader(path, file, index)
    }
}

impl<R: Read + Seek> FastaSource<R> {
    /// Wrap an already open reader. `path` is only used in messages.
    ///
    /// # Errors
    ///
    /// See [`FastaSource::open`].
    pub fn from_reader(path: impl Into<PathBuf>, inner: R, index: bool) -> Result<Self> {
        let buffered = BufReader::with_capacity(READ_BUFFER_SIZE, inner);
        let mut source = Self {
            path: path.into(),
            reader: fasta::io::Reader::new(buffered),
            index: None,
            alphabet: Alphabet::default(),
            current: None,
            exhausted: true,
        };

        if index {
            let index = source.build_index()?;
            debug!(
                path = %source.path.display(),
                contigs = index.entries.len(),
                "indexed sequence file"
            );
            source.index = Some(index);
            source.rewind()?;
        }

        Ok(source)
    }

    /// Accept a different set of body bytes.
    #[must_use]
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Contigs in file order, if the source was indexed.
    #[must_use]
    pub fn contigs(&self) -> Option<&[ContigEntry]> {
        self.index.as_ref().map(|index| index.entries.as_slice())
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Return to the start of the file with no contig selected.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` if the seek fails.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek_to(SeekFrom::Start(0))?;
        self.current = None;
        self.exhausted = true;
        Ok(())
    }

    /// Single forward pass recording where each contig's sequence starts,
    /// the same offsets a `.fai` index holds.
    fn build_index(&mut self) -> Result<ContigIndex> {
        let mut entries: Vec<ContigEntry> = Vec::new();
        let mut by_name = HashMap::new();

        // Anything before the first definition line is not part of a contig
        self.skip_sequence()?;

        while let Some(name) = self.read_definition()? {
            if check_contig_limit(entries.len()).is_some() {
                return Err(MatrixError::TooManyContigs {
                    path: self.path.clone(),
                    count: entries.len(),
                });
            }

            if by_name.contains_key(&name) {
                warn!(
                    path = %self.path.display(),
                    contig = %name,
                    "duplicate contig name, keeping the first occurrence"
                );
            } else {
                by_name.insert(name.clone(), entries.len());
            }
            entries.push(ContigEntry::new(name, self.position()?));

            self.skip_sequence()?;
        }

        Ok(ContigIndex { entries, by_name })
    }

    /// Byte offset of the next unread byte.
    fn position(&mut self) -> Result<u64> {
        self.reader
            .get_mut()
            .stream_position()
            .map_err(|e| MatrixError::io_at("reading", &self.path, e))
    }

    fn seek_to(&mut self, to: SeekFrom) -> Result<u64> {
        self.reader
            .get_mut()
            .seek(to)
            .map_err(|e| MatrixError::io_at("seeking in", &self.path, e))
    }

    /// Read and parse the next definition line. Returns `Ok(None)` at EOF.
    fn read_definition(&mut self) -> Result<Option<String>> {
        let start = self.position()?;
        let mut line = String::new();
        let read = self
            .reader
            .read_definition(&mut line)
            .map_err(|e| MatrixError::io_at("reading", &self.path, e))?;
        if read == 0 {
            return Ok(None);
        }

        let malformed = |reason: String| MatrixError::MalformedHeader {
            path: self.path.clone(),
            reason: format!("{reason} at byte {start}"),
        };
        let definition: Definition = line.parse().map_err(|e| malformed(format!("{e}")))?;
        contig_name(definition.name())
            .map(Some)
            .ok_or_else(|| malformed("header without a contig name".to_string()))
    }

    /// Consume the rest of the current sequence, returning how many
    /// non-whitespace bytes were skipped.
    fn skip_sequence(&mut self) -> Result<u64> {
        let mut sequence = self.reader.sequence_reader();
        let mut skipped = 0;
        loop {
            let buf = sequence
                .fill_buf()
                .map_err(|e| MatrixError::io_at("reading", &self.path, e))?;
            if buf.is_empty() {
                break;
            }
            skipped += buf.iter().filter(|b| !b.is_ascii_whitespace()).count() as u64;
            let len = buf.len();
            sequence.consume(len);
        }
        Ok(skipped)
    }

    /// Position the reader at the first sequence byte of `name`.
    ///
    /// Returns `false` if the contig is not in the index; the source is then
    /// positioned at end-of-file and every read returns zero bytes.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Configuration` if the source was not indexed, or
    /// `MatrixError::Io` if the seek fails.
    pub fn seek_contig(&mut self, name: &str) -> Result<bool> {
        let index = self.index.as_ref().ok_or_else(|| {
            MatrixError::Configuration(format!(
                "{} was opened without an index and cannot seek to contig {name}",
                self.path.display()
            ))
        })?;

        match index.by_name.get(name).map(|&i| index.entries[i].offset) {
            Some(offset) => {
                self.seek_to(SeekFrom::Start(offset))?;
                self.current = Some(name.to_string());
                self.exhausted = false;
                Ok(true)
            }
            None => {
                self.seek_to(SeekFrom::End(0))?;
                self.current = None;
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// Skip whatever is left of the current contig.
    ///
    /// Returns the number of sequence bytes that were never read.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` on read failure.
    pub fn skip_contig(&mut self) -> Result<u64> {
        let skipped = self.skip_sequence()?;
        self.exhausted = true;
        Ok(skipped)
    }

    /// Advance to the next header in file order and return its contig name.
    ///
    /// Any unread bytes of the current contig are skipped. Returns `Ok(None)`
    /// once no headers remain.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` on read failure or
    /// `MatrixError::MalformedHeader` for a header without a name.
    pub fn next_contig(&mut self) -> Result<Option<String>> {
        self.skip_sequence()?;
        let name = self.read_definition()?;
        self.exhausted = name.is_none();
        self.current.clone_from(&name);
        Ok(name)
    }

    /// Append up to `n` sequence bytes of the current contig to `out`.
    ///
    /// Returns `true` once the contig is fully consumed (the next line is a
    /// definition or the file has ended). Calls after that append nothing and
    /// keep returning `true`.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Format` on a byte that is neither accepted by the
    /// alphabet nor whitespace, or `MatrixError::Io` on read failure.
    pub fn read_positions(&mut self, n: usize, out: &mut Vec<u8>) -> Result<bool> {
        let alphabet = self.alphabet;
        let mut remaining = n;

        while remaining > 0 && !self.exhausted {
            let mut sequence = self.reader.sequence_reader();
            let buf = sequence
                .fill_buf()
                .map_err(|e| MatrixError::io_at("reading", &self.path, e))?;
            if buf.is_empty() {
                self.exhausted = true;
                break;
            }

            let mut consumed = 0;
            let mut rejected = None;
            for &byte in buf {
                if remaining == 0 {
                    break;
                }
                if alphabet.accepts(byte) {
                    out.push(byte.to_ascii_uppercase());
                    remaining -= 1;
                } else if !byte.is_ascii_whitespace() {
                    rejected = Some(byte);
                    break;
                }
                consumed += 1;
            }
            sequence.consume(consumed);

            if let Some(byte) = rejected {
                return Err(MatrixError::Format {
                    path: self.path.clone(),
                    contig: self.current.clone(),
                    offset: self.position()?,
                    byte,
                });
            }
        }

        if !self.exhausted {
            self.exhausted = self.at_contig_end()?;
        }
        Ok(self.exhausted)
    }

    /// Skip whitespace and report whether the contig has ended, without
    /// consuming any sequence byte.
    fn at_contig_end(&mut self) -> Result<bool> {
        let mut sequence = self.reader.sequence_reader();
        loop {
            let buf = sequence
                .fill_buf()
                .map_err(|e| MatrixError::io_at("reading", &self.path, e))?;
            if buf.is_empty() {
                return Ok(true);
            }

            let whitespace = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let len = buf.len();
            sequence.consume(whitespace);
            if whitespace < len {
                return Ok(false);
            }
        }
    }

    /// Read the rest of the current contig.
    ///
    /// # Errors
    ///
    /// See [`FastaSource::read_positions`].
    pub fn read_contig(&mut self, out: &mut Vec<u8>) -> Result<()> {
        const STEP: usize = 64 * 1024;
        while !self.read_positions(STEP, out)? {}
        Ok(())
    }
}
