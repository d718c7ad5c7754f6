//! Readers for the reference, the duplicates mask, and sample sequence files.
//!
//! - **FASTA sources** ([`fasta`]): indexed or sequential, chunked reads
//! - **Reference** ([`reference`]): reference + optional duplicates mask in lockstep
//! - **Samples** ([`samples`]): every sample file seeked and read in unison
//!
//! ## Example
//!
//! ```rust,no_run
//! use snp_matrix::parsing::fasta::FastaSource;
//! use std::path::Path;
//!
//! let mut sample = FastaSource::open(Path::new("sample.fasta"), true).unwrap();
//! sample.seek_contig("chr1").unwrap();
//!
//! let mut bases = Vec::new();
//! while !sample.read_positions(4096, &mut bases).unwrap() {}
//! ```
//!
//! ## Sample file types
//!
//! | File name suffix | Reader |
//! |------------------|--------|
//! | `fasta` (case-sensitive; `.fasta`, `.frankenfasta`, ...) | [`fasta::FastaSource`] |
//! | anything else | rejected as an unknown sample analysis type |

pub mod fasta;
pub mod reference;
pub mod samples;
