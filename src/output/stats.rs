//! Order-independent reduction of statistics deltas and the two stats tables.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::core::stats::{ContigStat, SampleStat, StatsDelta};
use crate::error::Result;
use crate::output::{write_error, write_row, GENERAL_STATS_FILE, SAMPLE_STATS_FILE};
use crate::pipeline::pool::Pools;
use crate::pipeline::{recv_or_cancel, CancelFlag, Received};

pub const SAMPLE_STATS_COLUMNS: [&str; 7] = [
    "wasCalled",
    "passedCoverageFilter",
    "passedProportionFilter",
    "qualityBreadth",
    "calledReference",
    "calledSnp",
    "calledDegen",
];

pub const GENERAL_STATS_COLUMNS: [&str; 11] = [
    "Contig",
    "referenceLength",
    "referenceClean",
    "referenceDuplicated",
    "allCalled",
    "allPassedCoverage",
    "allPassedProportion",
    "allPassedConsensus",
    "qualityBreadth",
    "anySnps",
    "bestSnps",
];

/// Label of the final row of the general stats table.
pub const WHOLE_GENOME: &str = "Whole Genome";

/// Running per-sample and per-contig totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsAggregator {
    samples: Vec<SampleStat>,
    /// Keyed by contig index so the table follows reference order
    contigs: BTreeMap<usize, (Arc<str>, ContigStat)>,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(num_samples: usize) -> Self {
        Self {
            samples: vec![SampleStat::default(); num_samples],
            contigs: BTreeMap::new(),
        }
    }

    /// Fold one delta into the totals.
    pub fn add(&mut self, delta: &StatsDelta) {
        for (total, stat) in self.samples.iter_mut().zip(&delta.samples) {
            *total += stat;
        }
        if let Some(name) = &delta.contig {
            let (_, stat) = self
                .contigs
                .entry(delta.contig_index)
                .or_insert_with(|| (Arc::clone(name), ContigStat::default()));
            *stat += &delta.contig_stat;
        }
    }

    /// Fold deltas until every sender is gone or `cancel` is raised,
    /// returning each delta to `pools`.
    pub fn drain(&mut self, deltas: &Receiver<StatsDelta>, pools: &Pools, cancel: &CancelFlag) {
        let mut received = 0u64;
        while let Received::Item(delta) = recv_or_cancel(deltas, cancel) {
            self.add(&delta);
            pools.deltas.put(delta);
            received += 1;
        }
        debug!(deltas = received, "stats aggregation finished");
    }

    #[must_use]
    pub fn samples(&self) -> &[SampleStat] {
        &self.samples
    }

    /// Per-contig totals in reference order.
    pub fn contigs(&self) -> impl Iterator<Item = (&str, &ContigStat)> {
        self.contigs.values().map(|(name, stat)| (name.as_ref(), stat))
    }

    /// Sum of every contig's totals.
    #[must_use]
    pub fn whole_genome(&self) -> ContigStat {
        self.contigs.values().fold(ContigStat::default(), |mut total, (_, stat)| {
            total += stat;
            total
        })
    }

    /// Write `sample_stats.tsv`: one row per sample, in input order.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` on a write failure.
    pub fn write_sample_stats<W: Write>(&self, out: &mut W) -> Result<()> {
        let write = |out: &mut W| -> std::io::Result<()> {
            write_row(out, SAMPLE_STATS_COLUMNS)?;
            for stat in &self.samples {
                write_row(
                    out,
                    [
                        stat.was_called,
                        stat.passed_coverage_filter,
                        stat.passed_proportion_filter,
                        stat.quality_breadth,
                        stat.called_reference,
                        stat.called_snp,
                        stat.called_degen,
                    ]
                    .map(|n| n.to_string()),
                )?;
            }
            out.flush()
        };
        write(out).map_err(|e| write_error(SAMPLE_STATS_FILE, e))
    }

    /// Write `general_stats.tsv`: one row per contig plus a whole-genome row.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` on a write failure.
    pub fn write_general_stats<W: Write>(&self, out: &mut W) -> Result<()> {
        let whole = self.whole_genome();
        let write = |out: &mut W| -> std::io::Result<()> {
            write_row(out, GENERAL_STATS_COLUMNS)?;
            for (name, stat) in self.contigs().chain([(WHOLE_GENOME, &whole)]) {
                write_row(out, std::iter::once(name.to_string()).chain(contig_fields(stat)))?;
            }
            out.flush()
        };
        write(out).map_err(|e| write_error(GENERAL_STATS_FILE, e))
    }
}

fn contig_fields(stat: &ContigStat) -> impl Iterator<Item = String> {
    [
        stat.reference_length,
        stat.reference_clean,
        stat.reference_duplicated,
        stat.all_called,
        stat.all_passed_coverage,
        stat.all_passed_proportion,
        stat.all_passed_consensus,
        stat.quality_breadth,
        stat.any_snps,
        stat.best_snps,
    ]
    .into_iter()
    .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn delta(contig_index: usize, contig: &str, length: u64, called: &[u64]) -> StatsDelta {
        let mut delta = StatsDelta::new(called.len());
        delta.contig_index = contig_index;
        delta.contig = Some(Arc::from(contig));
        delta.contig_stat.reference_length = length;
        for (stat, &n) in delta.samples.iter_mut().zip(called) {
            stat.was_called = n;
            stat.called_reference = n;
        }
        delta
    }

    #[test]
    fn test_order_independent_totals() {
        let deltas = [
            delta(0, "ContigA", 3, &[3, 1]),
            delta(1, "ContigB", 5, &[4, 0]),
            delta(0, "ContigA", 1, &[1, 1]),
        ];

        let mut forward = StatsAggregator::new(2);
        deltas.iter().for_each(|d| forward.add(d));
        let mut backward = StatsAggregator::new(2);
        deltas.iter().rev().for_each(|d| backward.add(d));

        assert_eq!(forward, backward);
        assert_eq!(forward.samples()[0].was_called, 8);
        assert_eq!(forward.samples()[1].was_called, 2);
        assert_eq!(forward.whole_genome().reference_length, 9);

        let contigs: Vec<_> = forward
            .contigs()
            .map(|(name, stat)| (name.to_string(), stat.reference_length))
            .collect();
        assert_eq!(contigs, [("ContigA".to_string(), 4), ("ContigB".to_string(), 5)]);
    }

    #[test]
    fn test_drain_returns_deltas_to_pool() {
        let pools = Pools::new(1, 4);
        let (tx, rx) = unbounded();
        tx.send(delta(0, "ContigA", 2, &[2])).unwrap();
        tx.send(delta(0, "ContigA", 2, &[1])).unwrap();
        drop(tx);

        let mut aggregator = StatsAggregator::new(1);
        aggregator.drain(&rx, &pools, &CancelFlag::new());
        assert_eq!(aggregator.samples()[0].was_called, 3);
        assert_eq!(pools.deltas.idle(), 2);
    }

    #[test]
    fn test_sample_stats_table() {
        let mut aggregator = StatsAggregator::new(2);
        aggregator.add(&delta(0, "ContigA", 4, &[4, 2]));

        let mut out = Vec::new();
        aggregator.write_sample_stats(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "wasCalled\tpassedCoverageFilter\tpassedProportionFilter\tqualityBreadth\tcalledReference\tcalledSnp\tcalledDegen"
        );
        assert_eq!(lines[1], "4\t0\t0\t0\t4\t0\t0");
        assert_eq!(lines[2], "2\t0\t0\t0\t2\t0\t0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_general_stats_table() {
        let mut aggregator = StatsAggregator::new(1);
        aggregator.add(&delta(1, "ContigB", 8, &[0]));
        aggregator.add(&delta(0, "ContigA", 4, &[0]));

        let mut out = Vec::new();
        aggregator.write_general_stats(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first_columns: Vec<(&str, &str)> = text
            .lines()
            .map(|l| {
                let mut fields = l.split('\t');
                (fields.next().unwrap(), fields.next().unwrap())
            })
            .collect();
        assert_eq!(
            first_columns,
            [
                ("Contig", "referenceLength"),
                ("ContigA", "4"),
                ("ContigB", "8"),
                ("Whole Genome", "12"),
            ]
        );
    }
}
