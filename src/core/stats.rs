//! Order-independent statistics produced per chunk and summed over the run.

use std::ops::AddAssign;
use std::sync::Arc;

use crate::core::position::Position;
use crate::pipeline::pool::Recycle;

/// Running totals for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleStat {
    pub was_called: u64,
    pub passed_coverage_filter: u64,
    pub passed_proportion_filter: u64,
    pub quality_breadth: u64,
    pub called_reference: u64,
    pub called_snp: u64,
    pub called_degen: u64,
}

impl AddAssign<&SampleStat> for SampleStat {
    fn add_assign(&mut self, other: &SampleStat) {
        self.was_called += other.was_called;
        self.passed_coverage_filter += other.passed_coverage_filter;
        self.passed_proportion_filter += other.passed_proportion_filter;
        self.quality_breadth += other.quality_breadth;
        self.called_reference += other.called_reference;
        self.called_snp += other.called_snp;
        self.called_degen += other.called_degen;
    }
}

/// Position-level summary counts for one contig
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContigStat {
    pub reference_length: u64,
    pub reference_clean: u64,
    pub reference_duplicated: u64,
    pub all_called: u64,
    pub all_passed_coverage: u64,
    pub all_passed_proportion: u64,
    pub all_passed_consensus: u64,
    pub quality_breadth: u64,
    pub any_snps: u64,
    pub best_snps: u64,
}

impl ContigStat {
    /// Count one analyzed position.
    pub fn add_position(&mut self, position: &Position) {
        self.reference_length += 1;
        self.reference_clean += u64::from(position.reference_clean);
        self.reference_duplicated += u64::from(position.reference_duplicated);
        self.all_called += u64::from(position.all_called);
        self.all_passed_coverage += u64::from(position.all_passed_coverage);
        self.all_passed_proportion += u64::from(position.all_passed_proportion);
        self.all_passed_consensus += u64::from(position.all_passed_consensus);
        self.quality_breadth += u64::from(position.all_quality_breadth);
        self.any_snps += u64::from(position.is_any_snp());
        self.best_snps += u64::from(position.is_best_snp());
    }
}

impl AddAssign<&ContigStat> for ContigStat {
    fn add_assign(&mut self, other: &ContigStat) {
        self.reference_length += other.reference_length;
        self.reference_clean += other.reference_clean;
        self.reference_duplicated += other.reference_duplicated;
        self.all_called += other.all_called;
        self.all_passed_coverage += other.all_passed_coverage;
        self.all_passed_proportion += other.all_passed_proportion;
        self.all_passed_consensus += other.all_passed_consensus;
        self.quality_breadth += other.quality_breadth;
        self.any_snps += other.any_snps;
        self.best_snps += other.best_snps;
    }
}

/// Statistics produced by analyzing one chunk
#[derive(Debug, Clone, Default)]
pub struct StatsDelta {
    pub contig_index: usize,
    pub contig: Option<Arc<str>>,
    pub samples: Vec<SampleStat>,
    pub contig_stat: ContigStat,
}

impl StatsDelta {
    #[must_use]
    pub fn new(num_samples: usize) -> Self {
        Self {
            samples: vec![SampleStat::default(); num_samples],
            ..Self::default()
        }
    }
}

impl Recycle for StatsDelta {
    fn recycle(&mut self) {
        self.contig_index = 0;
        self.contig = None;
        self.samples.fill(SampleStat::default());
        self.contig_stat = ContigStat::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stat_add_assign() {
        let mut total = SampleStat::default();
        let delta = SampleStat {
            was_called: 3,
            passed_coverage_filter: 4,
            passed_proportion_filter: 4,
            quality_breadth: 2,
            called_reference: 1,
            called_snp: 1,
            called_degen: 1,
        };
        total += &delta;
        total += &delta;
        assert_eq!(total.was_called, 6);
        assert_eq!(total.passed_coverage_filter, 8);
        assert_eq!(total.called_degen, 2);
    }

    #[test]
    fn test_contig_stat_add_position() {
        let mut stat = ContigStat::default();

        let mut snp = Position::default();
        snp.reference_clean = true;
        snp.called_snp = 1;
        stat.add_position(&snp);

        let mut missing = Position::default();
        missing.all_called = false;
        missing.all_quality_breadth = false;
        missing.reference_duplicated = true;
        stat.add_position(&missing);

        assert_eq!(stat.reference_length, 2);
        assert_eq!(stat.reference_clean, 1);
        assert_eq!(stat.reference_duplicated, 1);
        assert_eq!(stat.all_called, 1);
        assert_eq!(stat.quality_breadth, 1);
        assert_eq!(stat.any_snps, 1);
        assert_eq!(stat.best_snps, 1);
    }

    #[test]
    fn test_delta_recycle() {
        let mut delta = StatsDelta::new(2);
        delta.contig_index = 4;
        delta.contig = Some(Arc::from("chr2"));
        delta.samples[1].called_snp = 7;
        delta.contig_stat.reference_length = 10;
        delta.recycle();
        assert_eq!(delta.contig_index, 0);
        assert!(delta.contig.is_none());
        assert_eq!(delta.samples, vec![SampleStat::default(); 2]);
        assert_eq!(delta.contig_stat, ContigStat::default());
    }
}
