//! # snp-matrix
//!
//! A library for building a position-by-position SNP call matrix from a
//! reference genome and any number of sample sequences already aligned to it.
//!
//! Every sample file carries one contig per reference contig, in reference
//! coordinates. For each reference position the library collects every
//! sample's call, classifies it against the reference base, and emits one
//! matrix row plus per-sample and per-contig statistics.
//!
//! ## Features
//!
//! - **Streaming reads**: contigs are read in bounded chunks, never whole
//! - **Ordered parallelism**: chunks are analyzed on a worker pool while rows
//!   are written in exact genomic order
//! - **Bounded memory**: a fixed-capacity queue of in-flight chunks provides backpressure
//! - **Repeat masking**: an optional duplicates file suppresses SNP calls in repeats
//! - **Missing data tolerance**: a sample lacking a contig reads as `X` calls
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use snp_matrix::{CancelFlag, PipelineConfig, ReferenceReader, SampleSet, Sinks};
//!
//! let mut reference = ReferenceReader::open(Path::new("ref.fasta"), None).unwrap();
//! let mut samples = SampleSet::open(&[PathBuf::from("s1.fasta")]).unwrap();
//! let sinks = Sinks::create(Path::new("out"), false).unwrap();
//!
//! let summary = snp_matrix::run(
//!     &mut reference,
//!     &mut samples,
//!     sinks,
//!     &PipelineConfig::default(),
//!     &CancelFlag::new(),
//! )
//! .unwrap();
//! println!("{} positions", summary.positions);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Calls, chunks, positions, and statistics
//! - [`parsing`]: Sequence, reference, and sample readers
//! - [`pipeline`]: Pools, analysis, and scheduling
//! - [`output`]: Matrix and statistics writers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod error;
pub mod output;
pub mod parsing;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{MatrixError, Result};
pub use output::Sinks;
pub use parsing::reference::ReferenceReader;
pub use parsing::samples::SampleSet;
pub use pipeline::scheduler::{run, PipelineConfig, RunSummary};
pub use pipeline::CancelFlag;
