//! Per-chunk classification into position records and a statistics delta.

use std::sync::Arc;

use crate::core::call::{is_called, is_clean_base, CallClass};
use crate::core::chunk::Chunk;
use crate::core::position::{Position, FILTER_UNDETERMINED};
use crate::core::stats::StatsDelta;
use crate::pipeline::pool::Pools;

/// The analyzed positions of one chunk, in genomic order.
#[derive(Debug)]
pub struct AnalyzedChunk {
    pub serial: u64,
    pub contig: Arc<str>,
    /// 1-based position number of `positions[0]` within the contig
    pub start: u64,
    pub positions: Vec<Position>,
}

/// Classify every position of `chunk`.
///
/// Position records, the batch holding them, and the delta are all borrowed
/// from `pools`; whoever consumes them returns them. The chunk's own buffers
/// are left for the caller to recycle.
#[must_use]
pub fn analyze_chunk(chunk: &Chunk, pools: &Pools) -> (AnalyzedChunk, StatsDelta) {
    let mut delta = pools.deltas.get();
    delta.contig_index = chunk.contig_index;
    delta.contig = Some(Arc::clone(&chunk.contig));
    delta.samples.resize(chunk.num_samples(), Default::default());

    let mut positions = pools.batches.get();
    positions.reserve(chunk.len());

    for offset in 0..chunk.len() {
        let mut position = pools.positions.get();
        analyze_position(chunk, offset, &mut position, &mut delta);
        delta.contig_stat.add_position(&position);
        positions.push(position);
    }

    let analyzed = AnalyzedChunk {
        serial: chunk.serial,
        contig: Arc::clone(&chunk.contig),
        start: chunk.start,
        positions,
    };
    (analyzed, delta)
}

fn analyze_position(chunk: &Chunk, offset: usize, position: &mut Position, delta: &mut StatsDelta) {
    let reference = chunk.reference_call(offset);
    let duplicated = chunk.is_duplicated(offset);
    let clean = is_clean_base(reference);

    position.reference_clean = clean;
    position.reference_duplicated = duplicated;
    position.calls.push(reference);

    for (sample, stat) in delta.samples.iter_mut().enumerate() {
        let call = chunk.sample_call(sample, offset);
        let called = is_called(call);

        position.tally(call);
        position.calls.push(call);
        position.call_was_made.push(if called { b'Y' } else { b'N' });

        // No depth data is available, so every sample passes both filters
        position.passed_depth_filter.push(FILTER_UNDETERMINED);
        position.passed_proportion_filter.push(FILTER_UNDETERMINED);
        position.passed_coverage += 1;
        position.passed_proportion += 1;
        stat.passed_coverage_filter += 1;
        stat.passed_proportion_filter += 1;

        if called {
            position.was_called += 1;
            stat.was_called += 1;
        } else {
            position.all_called = false;
        }

        if called && clean {
            stat.quality_breadth += 1;
            match CallClass::classify(reference, call, duplicated) {
                CallClass::Degenerate => {
                    position.called_degen += 1;
                    stat.called_degen += 1;
                }
                CallClass::Reference => {
                    position.called_reference += 1;
                    stat.called_reference += 1;
                }
                CallClass::Snp => {
                    position.called_snp += 1;
                    position.missing_matrix_eligible = true;
                    stat.called_snp += 1;
                }
                CallClass::MaskedSnp => {}
            }
        } else {
            position.all_quality_breadth = false;
        }
    }

    position.build_pattern();
}
