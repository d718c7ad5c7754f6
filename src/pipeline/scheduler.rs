//! Contig × chunk traversal feeding a bounded, ordered worker pipeline.
//!
//! The scheduler runs on the calling thread and is the only code that touches
//! input files. For each chunk it queues a single-use result slot, then hands
//! the chunk's private buffers to a worker. The slot queue is bounded, so the
//! scheduler blocks once `queue_capacity` chunks are in flight.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Sender};
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::chunk::Chunk;
use crate::core::stats::StatsDelta;
use crate::error::{MatrixError, Result};
use crate::output::matrix::{MatrixTotals, MatrixWriter};
use crate::output::stats::StatsAggregator;
use crate::output::{self, Sinks};
use crate::parsing::reference::ReferenceReader;
use crate::parsing::samples::SampleSet;
use crate::pipeline::analyzer::{analyze_chunk, AnalyzedChunk};
use crate::pipeline::pool::Pools;
use crate::pipeline::{CancelFlag, ResultSlot};

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Tuning for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Positions read per chunk
    pub chunk_size: usize,
    /// Chunks allowed in flight between the scheduler and the matrix writer
    pub queue_capacity: usize,
    /// Worker threads; 0 uses every available core
    pub threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            threads: 0,
        }
    }
}

/// What a completed (or interrupted) run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub samples: usize,
    pub contigs: usize,
    pub positions: u64,
    pub chunks: u64,
    pub matrix_rows: u64,
    pub missing_matrix_rows: u64,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

/// Counts kept by the scheduler while reading.
#[derive(Debug, Default)]
struct Progress {
    contigs: usize,
    positions: u64,
    chunks: u64,
}

/// Run the whole pipeline: read every contig, analyze in parallel, and write
/// the matrix and statistics to `sinks`.
///
/// Returns once every worker has finished and both consumers have drained
/// and flushed their outputs.
///
/// # Errors
///
/// Any read, format, desync, or write error is fatal and returned as is.
pub fn run<W: Write + Send>(
    reference: &mut ReferenceReader,
    samples: &mut SampleSet,
    sinks: Sinks<W>,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    run_with(reference, samples, sinks, config, cancel)
}

/// [`run`] over any reference source; used by tests with in-memory input.
///
/// On any error the run is aborted and the files listed in `sinks.files` are
/// removed, so a failed run leaves no partial tables behind.
///
/// # Errors
///
/// Same as [`run`].
pub fn run_with<R, W>(
    reference: &mut ReferenceReader<R>,
    samples: &mut SampleSet,
    sinks: Sinks<W>,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<RunSummary>
where
    R: std::io::Read + std::io::Seek,
    W: Write + Send,
{
    let files = sinks.files.clone();
    let result = execute(reference, samples, sinks, config, cancel);
    if let Err(e) = &result {
        cancel.abort();
        warn!(error = %e, "run failed; discarding outputs");
        output::discard(&files);
    }
    result
}

fn execute<R, W>(
    reference: &mut ReferenceReader<R>,
    samples: &mut SampleSet,
    sinks: Sinks<W>,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<RunSummary>
where
    R: std::io::Read + std::io::Seek,
    W: Write + Send,
{
    let started = Instant::now();
    let workers = ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|i| format!("analyzer-{i}"))
        .build()
        .map_err(|e| MatrixError::Pipeline(format!("failed to start worker pool: {e}")))?;

    let num_samples = samples.len();
    info!(
        samples = num_samples,
        threads = workers.current_num_threads(),
        chunk_size = config.chunk_size,
        queue_capacity = config.queue_capacity,
        "starting analysis"
    );

    let pools = Pools::new(num_samples, config.chunk_size);
    let Sinks {
        matrix,
        missing,
        mut sample_stats,
        mut general_stats,
        files: _,
    } = sinks;
    let writer = MatrixWriter::new(matrix, missing, samples.names())?;

    let (slot_tx, slot_rx) = bounded::<ResultSlot>(config.queue_capacity);
    let (stats_tx, stats_rx) = unbounded::<StatsDelta>();

    let (scheduled, written, aggregated) = thread::scope(|s| {
        let pools = &pools;

        let writer_handle = s.spawn(move || writer.drain(&slot_rx, pools, cancel));
        let aggregator_handle = s.spawn(move || {
            let mut aggregator = StatsAggregator::new(num_samples);
            aggregator.drain(&stats_rx, pools, cancel);
            aggregator
        });

        let scheduled = workers.in_place_scope(|scope| {
            let mut spawn = |chunk: Chunk, slot: Sender<AnalyzedChunk>, stats: Sender<StatsDelta>| {
                scope.spawn(move |_| {
                    let (analyzed, delta) = analyze_chunk(&chunk, pools);
                    pools.chunks.put(chunk.buffers);
                    if let Err(rejected) = stats.send(delta) {
                        pools.deltas.put(rejected.into_inner());
                    }
                    if let Err(rejected) = slot.send(analyzed) {
                        pools.put_batch(rejected.into_inner().positions);
                    }
                });
            };
            schedule(reference, samples, config, pools, cancel, &slot_tx, &stats_tx, &mut spawn)
        });
        if scheduled.is_err() {
            cancel.abort();
        }
        drop(slot_tx);
        drop(stats_tx);

        let written = writer_handle
            .join()
            .map_err(|_| MatrixError::Pipeline("matrix writer panicked".to_string()));
        let aggregated = aggregator_handle
            .join()
            .map_err(|_| MatrixError::Pipeline("stats aggregator panicked".to_string()));
        (scheduled, written, aggregated)
    });

    let progress = scheduled?;
    let totals: MatrixTotals = written??;
    let aggregator = aggregated?;

    aggregator.write_sample_stats(&mut sample_stats)?;
    aggregator.write_general_stats(&mut general_stats)?;

    let summary = RunSummary {
        samples: num_samples,
        contigs: progress.contigs,
        positions: progress.positions,
        chunks: progress.chunks,
        matrix_rows: totals.rows,
        missing_matrix_rows: totals.missing_rows,
        cancelled: totals.cancelled || cancel.is_cancelled(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    info!(
        contigs = summary.contigs,
        positions = summary.positions,
        rows = summary.matrix_rows,
        "analysis complete"
    );
    Ok(summary)
}

/// Read every contig in chunks, queueing a result slot for each before
/// handing it to `spawn`.
#[allow(clippy::too_many_arguments)]
fn schedule<R, F>(
    reference: &mut ReferenceReader<R>,
    samples: &mut SampleSet,
    config: &PipelineConfig,
    pools: &Pools,
    cancel: &CancelFlag,
    slot_queue: &Sender<ResultSlot>,
    stats: &Sender<StatsDelta>,
    spawn: &mut F,
) -> Result<Progress>
where
    R: std::io::Read + std::io::Seek,
    F: FnMut(Chunk, Sender<AnalyzedChunk>, Sender<StatsDelta>),
{
    let mut progress = Progress::default();

    'contigs: while let Some(name) = reference.next_contig()? {
        let contig: Arc<str> = Arc::from(name.as_str());
        let contig_index = progress.contigs;
        progress.contigs += 1;

        let found = samples.seek_contig(&contig)?;
        debug!(contig = %contig, samples_with_contig = found, "seeked samples");

        let mut next_position: u64 = 1;
        loop {
            if cancel.is_cancelled() {
                warn!(contig = %contig, "interrupted; no further chunks will be read");
                break 'contigs;
            }

            let mut buffers = pools.chunks.get();
            let partial = reference.read_positions(
                config.chunk_size,
                &mut buffers.reference,
                &mut buffers.duplicates,
            )?;
            let len = buffers.reference.len();
            samples.read_positions(len, &mut buffers.samples)?;

            if len == 0 {
                pools.chunks.put(buffers);
                if partial {
                    continue;
                }
                break;
            }

            let chunk = Chunk {
                serial: progress.chunks,
                contig_index,
                contig: Arc::clone(&contig),
                start: next_position,
                buffers,
            };
            debug!(
                contig = %contig,
                serial = chunk.serial,
                start = chunk.start,
                len,
                "scheduling chunk"
            );

            let (result_tx, result_rx) = bounded(1);
            if slot_queue.send(result_rx).is_err() {
                // The matrix writer has stopped
                pools.chunks.put(chunk.buffers);
                break 'contigs;
            }
            spawn(chunk, result_tx, stats.clone());

            progress.chunks += 1;
            progress.positions += len as u64;
            next_position += len as u64;
            if !partial {
                break;
            }
        }

        info!(contig = %contig, positions = next_position - 1, "contig scheduled");
    }

    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::fasta::{Alphabet, FastaSource};
    use crate::parsing::samples::SampleSource;
    use std::io::Cursor;

    type Source = FastaSource<Cursor<Vec<u8>>>;

    fn fasta(name: &str, bytes: &[u8], index: bool) -> Source {
        FastaSource::from_reader(name, Cursor::new(bytes.to_vec()), index).unwrap()
    }

    fn sample_set(samples: &[(&str, &[u8])]) -> SampleSet {
        SampleSet::new(
            samples
                .iter()
                .map(|(name, bytes)| Box::new(fasta(name, bytes, true)) as Box<dyn SampleSource>)
                .collect(),
        )
    }

    #[derive(Debug)]
    struct Outputs {
        matrix: Vec<u8>,
        sample_stats: Vec<u8>,
        general_stats: Vec<u8>,
    }

    fn run_in_memory(
        reference: &[u8],
        duplicates: Option<&[u8]>,
        samples: &[(&str, &[u8])],
        config: PipelineConfig,
    ) -> Result<(RunSummary, Outputs)> {
        let dups = duplicates.map(|d| fasta("dups.fasta", d, true).with_alphabet(Alphabet::Flags));
        let mut reference =
            ReferenceReader::new(fasta("ref.fasta", reference, dups.is_some()), dups)?;
        let mut samples = sample_set(samples);

        let mut outputs = Outputs {
            matrix: Vec::new(),
            sample_stats: Vec::new(),
            general_stats: Vec::new(),
        };
        let sinks = Sinks {
            matrix: &mut outputs.matrix,
            missing: None,
            sample_stats: &mut outputs.sample_stats,
            general_stats: &mut outputs.general_stats,
            files: Vec::new(),
        };
        let summary = run_with(&mut reference, &mut samples, sinks, &config, &CancelFlag::new())?;
        Ok((summary, outputs))
    }

    const REFERENCE: &[u8] = b">ContigA\nGATC\n>ContigB\nCTAG\nDCBA\n";

    #[test]
    fn test_small_chunks_keep_row_order() {
        let config = PipelineConfig {
            chunk_size: 3,
            queue_capacity: 1,
            threads: 2,
        };
        let (summary, outputs) =
            run_in_memory(REFERENCE, None, &[("s1.fasta", REFERENCE)], config).unwrap();

        assert_eq!(summary.contigs, 2);
        assert_eq!(summary.positions, 12);
        assert_eq!(summary.chunks, 5);
        assert_eq!(summary.matrix_rows, 12);
        assert!(!summary.cancelled);

        let text = String::from_utf8(outputs.matrix).unwrap();
        let loci: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        let expected: Vec<String> = (1..=4)
            .map(|i| format!("ContigA::{i}"))
            .chain((1..=8).map(|i| format!("ContigB::{i}")))
            .collect();
        assert_eq!(loci, expected);
        assert!(!outputs.sample_stats.is_empty());
        assert!(String::from_utf8(outputs.general_stats)
            .unwrap()
            .contains("Whole Genome\t12\t"));
    }

    #[test]
    fn test_desync_fails_before_any_row() {
        let dups: &[u8] = b">ContigB\n00000000\n>ContigA\n0000\n";
        let err = run_in_memory(REFERENCE, Some(dups), &[], PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, MatrixError::Configuration(_)));
    }

    #[test]
    fn test_bad_sample_byte_is_fatal() {
        let sample: &[u8] = b">ContigA\nGA*C\n>ContigB\nCTAGDCBA\n";
        let err = run_in_memory(REFERENCE, None, &[("s1.fasta", sample)], PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(err, MatrixError::Format { .. }));
    }
}
