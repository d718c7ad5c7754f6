use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::cli::{FilterArgs, OutputArgs, OutputFormat, TuningArgs};
use crate::output::Sinks;
use crate::parsing::reference::ReferenceReader;
use crate::parsing::samples::SampleSet;
use crate::pipeline::scheduler::{self, PipelineConfig, RunSummary};
use crate::pipeline::CancelFlag;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Reference FASTA (required)
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Duplicates mask in FASTA framing ('1' marks a repeat region)
    #[arg(short, long)]
    pub duplicates: Option<PathBuf>,

    /// Sample files aligned to the reference (name must end in "fasta")
    pub samples: Vec<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

impl AnalyzeArgs {
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunk_size: self.tuning.chunk_size,
            queue_capacity: self.tuning.queue_capacity,
            threads: self.tuning.threads,
        }
    }
}

/// Run the analysis and print a summary.
///
/// The coverage and proportion filters are validated but no depth data is
/// read, so every call counts as passing both.
pub fn run(args: AnalyzeArgs, format: OutputFormat, cancel: &CancelFlag) -> anyhow::Result<()> {
    let reference = args
        .reference
        .as_deref()
        .context("--reference is required")?;

    if args.filters.coverage > 0 || args.filters.proportion > 0.0 {
        info!(
            coverage = args.filters.coverage,
            proportion = args.filters.proportion,
            "coverage and proportion filters are not connected to depth data; every call passes"
        );
    }
    if args.samples.is_empty() {
        warn!("no sample files given; the matrix will contain reference calls only");
    }

    let mut reference_reader = ReferenceReader::open(reference, args.duplicates.as_deref())
        .with_context(|| format!("Failed to open reference {}", reference.display()))?;
    let mut samples = SampleSet::open(&args.samples).context("Failed to open sample files")?;
    let sinks = Sinks::create(&args.output.output_dir, args.output.missing_matrix)?;

    let summary = scheduler::run(
        &mut reference_reader,
        &mut samples,
        sinks,
        &args.pipeline_config(),
        cancel,
    )
    .with_context(|| match reference_reader.contig() {
        Some(contig) => format!("Analysis failed while reading contig {contig}"),
        None => "Analysis failed".to_string(),
    })?;

    match format {
        OutputFormat::Text => print_text_summary(&args, &summary),
        OutputFormat::Json => print_json_summary(&args, &summary)?,
    }

    if summary.cancelled {
        anyhow::bail!(
            "Interrupted; outputs in {} are incomplete",
            args.output.output_dir.display()
        );
    }
    Ok(())
}

fn print_text_summary(args: &AnalyzeArgs, summary: &RunSummary) {
    println!("Analysis Summary");
    println!("{}", "=".repeat(60));
    println!("  Samples: {}", summary.samples);
    println!("  Contigs: {}", summary.contigs);
    println!("  Positions: {}", summary.positions);
    println!("  Chunks: {}", summary.chunks);
    println!("  Matrix rows: {}", summary.matrix_rows);
    if args.output.missing_matrix {
        println!("  Missing-data rows: {}", summary.missing_matrix_rows);
    }
    println!("  Output directory: {}", args.output.output_dir.display());
    println!("  Elapsed: {:.2}s", summary.elapsed_secs);
    if summary.cancelled {
        println!("  Status: interrupted (outputs are incomplete)");
    }
}

fn print_json_summary(args: &AnalyzeArgs, summary: &RunSummary) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "reference": args.reference.as_ref().map(|p| p.display().to_string()),
        "duplicates": args.duplicates.as_ref().map(|p| p.display().to_string()),
        "output_dir": args.output.output_dir.display().to_string(),
        "summary": summary,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
