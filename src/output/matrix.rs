//! Ordered serialization of analyzed chunks to `master.tsv` (and optionally
//! `missingdata.tsv`).

use std::io::Write;

use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use crate::core::position::Position;
use crate::error::{MatrixError, Result};
use crate::output::{write_error, write_row, MASTER_MATRIX_FILE, MISSING_MATRIX_FILE};
use crate::pipeline::analyzer::AnalyzedChunk;
use crate::pipeline::pool::Pools;
use crate::pipeline::{recv_or_cancel, CancelFlag, Received, ResultSlot};

/// Columns before the per-sample call columns.
pub const LEADING_COLUMNS: [&str; 2] = ["LocusID", "Reference"];

/// Columns after the per-sample call columns.
pub const TRAILING_COLUMNS: [&str; 20] = [
    "#SNPcall",
    "#Indelcall",
    "#Refcall",
    "#CallWasMade",
    "#PassedDepthFilter",
    "#PassedProportionFilter",
    "#A",
    "#C",
    "#G",
    "#T",
    "#Indel",
    "#NXdegen",
    "Contig",
    "Position",
    "InDupRegion",
    "SampleConsensus",
    "CallWasMade",
    "PassedDepthFilter",
    "PassedProportionFilter",
    "Pattern",
];

/// What the writer emitted before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixTotals {
    pub chunks: u64,
    pub rows: u64,
    pub missing_rows: u64,
    pub cancelled: bool,
}

/// Sole owner of the matrix outputs.
#[derive(Debug)]
pub struct MatrixWriter<W: Write> {
    matrix: W,
    missing: Option<W>,
    line: Vec<u8>,
    totals: MatrixTotals,
}

impl<W: Write> MatrixWriter<W> {
    /// Wrap the outputs and write their headers.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` if a header cannot be written.
    pub fn new(mut matrix: W, mut missing: Option<W>, sample_names: &[String]) -> Result<Self> {
        let header: Vec<&str> = LEADING_COLUMNS
            .into_iter()
            .chain(sample_names.iter().map(String::as_str))
            .chain(TRAILING_COLUMNS)
            .collect();

        write_row(&mut matrix, &header).map_err(|e| write_error(MASTER_MATRIX_FILE, e))?;
        if let Some(out) = &mut missing {
            write_row(out, &header).map_err(|e| write_error(MISSING_MATRIX_FILE, e))?;
        }

        Ok(Self {
            matrix,
            missing,
            line: Vec::with_capacity(256),
            totals: MatrixTotals::default(),
        })
    }

    /// Write one row per position of `chunk`.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Pipeline` if `chunk` is out of order and
    /// `MatrixError::Io` on a write failure.
    pub fn write_chunk(&mut self, chunk: &AnalyzedChunk) -> Result<()> {
        if chunk.serial != self.totals.chunks {
            return Err(MatrixError::Pipeline(format!(
                "matrix writer expected chunk {} but received chunk {}",
                self.totals.chunks, chunk.serial
            )));
        }

        for (number, position) in (chunk.start..).zip(&chunk.positions) {
            self.line.clear();
            format_row(&mut self.line, &chunk.contig, number, position)
                .map_err(|e| write_error(MASTER_MATRIX_FILE, e))?;

            self.matrix
                .write_all(&self.line)
                .map_err(|e| write_error(MASTER_MATRIX_FILE, e))?;
            self.totals.rows += 1;

            if position.missing_matrix_eligible {
                if let Some(out) = &mut self.missing {
                    out.write_all(&self.line)
                        .map_err(|e| write_error(MISSING_MATRIX_FILE, e))?;
                    self.totals.missing_rows += 1;
                }
            }
        }

        self.totals.chunks += 1;
        Ok(())
    }

    /// Write chunks in the order their slots were queued until the queue
    /// closes or `cancel` is raised, then flush.
    ///
    /// Each slot is waited on in turn, even if later slots are already filled.
    /// After an abort nothing more is written or flushed.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Pipeline` if an analysis task ended without
    /// filling its slot, or `MatrixError::Io` on a write failure.
    pub fn drain(
        mut self,
        slots: &Receiver<ResultSlot>,
        pools: &Pools,
        cancel: &CancelFlag,
    ) -> Result<MatrixTotals> {
        let drained = self.drain_slots(slots, pools, cancel);
        if cancel.is_aborted() {
            debug!(rows = self.totals.rows, "run aborted; matrix writer stopped without flushing");
            drained?;
            return Ok(self.totals);
        }
        let flushed = self.flush();
        drained?;
        flushed?;
        debug!(rows = self.totals.rows, chunks = self.totals.chunks, "matrix writer finished");
        Ok(self.totals)
    }

    fn drain_slots(
        &mut self,
        slots: &Receiver<ResultSlot>,
        pools: &Pools,
        cancel: &CancelFlag,
    ) -> Result<()> {
        loop {
            let slot = match recv_or_cancel(slots, cancel) {
                Received::Item(slot) => slot,
                Received::Closed => return Ok(()),
                Received::Cancelled => break,
            };
            let chunk = match recv_or_cancel(&slot, cancel) {
                Received::Item(chunk) => chunk,
                Received::Closed => {
                    return Err(MatrixError::Pipeline(format!(
                        "analysis of chunk {} ended without a result",
                        self.totals.chunks
                    )))
                }
                Received::Cancelled => break,
            };

            let written = self.write_chunk(&chunk);
            pools.put_batch(chunk.positions);
            written?;
        }

        if cancel.is_aborted() {
            return Ok(());
        }
        warn!(rows = self.totals.rows, "interrupted; matrix output is incomplete");
        self.totals.cancelled = true;
        Ok(())
    }

    /// Flush every output.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` if a flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.matrix
            .flush()
            .map_err(|e| write_error(MASTER_MATRIX_FILE, e))?;
        if let Some(out) = &mut self.missing {
            out.flush().map_err(|e| write_error(MISSING_MATRIX_FILE, e))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn totals(&self) -> MatrixTotals {
        self.totals
    }
}

fn format_row(
    line: &mut Vec<u8>,
    contig: &str,
    number: u64,
    position: &Position,
) -> std::io::Result<()> {
    let samples = position.num_samples();

    write!(line, "{contig}::{number}\t")?;
    for &call in &position.calls {
        line.push(call);
        line.push(b'\t');
    }
    write!(
        line,
        "{}\t0\t{}\t{}/{samples}\t{}/{samples}\t{}/{samples}\t{}\t{}\t{}\t{}\t0\t{}\t{contig}\t{number}\t{}\t{}\t",
        position.called_snp,
        position.called_reference,
        position.was_called,
        position.passed_coverage,
        position.passed_proportion,
        position.num_a,
        position.num_c,
        position.num_g,
        position.num_t,
        position.num_n,
        python_bool(position.reference_duplicated),
        python_bool(position.all_passed_consensus),
    )?;

    for field in [
        &position.call_was_made,
        &position.passed_depth_filter,
        &position.passed_proportion_filter,
    ] {
        line.extend_from_slice(field);
        line.push(b'\t');
    }
    line.extend_from_slice(&position.pattern);
    line.push(b'\n');
    Ok(())
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
