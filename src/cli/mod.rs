//! Command-line interface for snp-matrix.
//!
//! A single command reads a reference, an optional duplicates mask, and any
//! number of pre-aligned sample files, then writes the call matrix and
//! statistics tables to the output directory.
//!
//! ## Usage
//!
//! ```text
//! # Compare every sample against the reference
//! snp-matrix --reference ref.fasta samples/*.frankenfasta
//!
//! # Mask repeat regions and also write the missing-data matrix
//! snp-matrix --reference ref.fasta --duplicates dups.fasta --missing-matrix s1.fasta s2.fasta
//!
//! # JSON run summary for scripting
//! snp-matrix --reference ref.fasta s1.fasta --format json
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::scheduler::{DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_CAPACITY};
use crate::utils::validation::{parse_chunk_size, parse_proportion, parse_queue_capacity};

pub mod analyze;

#[derive(Parser)]
#[command(name = "snp-matrix")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Build a position-by-position SNP call matrix from pre-aligned samples")]
#[command(
    long_about = "snp-matrix compares every position of a reference against the same position in each sample file.\n\nSample files must already be aligned to the reference coordinate system (one contig per reference contig, same length). The output is:\n- master.tsv: one row per reference position with every sample's call and summary counts\n- sample_stats.tsv: per-sample call totals\n- general_stats.tsv: per-contig position totals\n- missingdata.tsv (with --missing-matrix): rows where some sample made a confident SNP call"
)]
pub struct Cli {
    #[command(flatten)]
    pub args: analyze::AnalyzeArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run summary format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Pipeline tuning flags shared by every run.
#[derive(clap::Args, Debug, Clone)]
pub struct TuningArgs {
    /// Positions read per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_chunk_size)]
    pub chunk_size: usize,

    /// Chunks allowed in flight at once
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, value_parser = parse_queue_capacity)]
    pub queue_capacity: usize,

    /// Worker threads (0 = all cores)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,
}

/// Filters accepted for compatibility; see [`analyze::run`].
#[derive(clap::Args, Debug, Clone)]
pub struct FilterArgs {
    /// Minimum read depth for a call to pass
    #[arg(long, default_value_t = 0)]
    pub coverage: u32,

    /// Minimum proportion of reads agreeing with a call for it to pass
    #[arg(long, default_value_t = 0.0, value_parser = parse_proportion)]
    pub proportion: f64,
}

/// Where results are written.
#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory for the output tables
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write missingdata.tsv
    #[arg(long)]
    pub missing_matrix: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli =
            Cli::try_parse_from(["snp-matrix", "--reference", "ref.fasta", "a.fasta", "b.fasta"])
                .unwrap();
        assert_eq!(cli.args.reference, Some(PathBuf::from("ref.fasta")));
        assert_eq!(cli.args.samples.len(), 2);
        assert_eq!(cli.args.tuning.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cli.args.tuning.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(cli.args.output.output_dir, PathBuf::from("."));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.args.output.missing_matrix);
    }

    #[test]
    fn test_rejects_invalid_tuning() {
        assert!(
            Cli::try_parse_from(["snp-matrix", "--reference", "r.fasta", "--chunk-size", "0"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["snp-matrix", "--reference", "r.fasta", "--queue-capacity", "0"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["snp-matrix", "--reference", "r.fasta", "--proportion", "2"])
                .is_err()
        );
    }

    #[test]
    fn test_reference_is_optional_to_the_parser() {
        let cli = Cli::try_parse_from(["snp-matrix", "a.fasta"]).unwrap();
        assert!(cli.args.reference.is_none());
    }
}
