use crate::core::call::{is_called, Nucleotide, ANY_CALL};
use crate::pipeline::pool::Recycle;

/// Per-sample filter byte when there is no depth/proportion data to judge by.
pub const FILTER_UNDETERMINED: u8 = b'-';

/// Analysis result for a single genomic site across all samples.
///
/// Pooled: every field returns to its default in [`Recycle::recycle`] so a
/// later borrower never sees a previous position's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    // === Summary flags (default true unless noted) ===
    pub all_called: bool,
    /// Default false; set when the reference base is A/C/G/T
    pub reference_clean: bool,
    /// Default false; set when the duplicates mask flags this site
    pub reference_duplicated: bool,
    pub all_passed_coverage: bool,
    pub all_passed_proportion: bool,
    pub all_passed_consensus: bool,
    pub all_quality_breadth: bool,
    /// Default false; at least one confident, non-duplicated SNP call
    pub missing_matrix_eligible: bool,

    // === Counters ===
    pub was_called: u32,
    pub called_reference: u32,
    pub called_snp: u32,
    pub called_degen: u32,
    pub passed_coverage: u32,
    pub passed_proportion: u32,
    pub num_a: u32,
    pub num_c: u32,
    pub num_g: u32,
    pub num_t: u32,
    pub num_n: u32,

    // === Per-sample strings ===
    /// Reference call followed by one call per sample
    pub calls: Vec<u8>,
    /// `Y`/`N` per sample
    pub call_was_made: Vec<u8>,
    pub passed_depth_filter: Vec<u8>,
    pub passed_proportion_filter: Vec<u8>,
    /// Reference is `1`, distinct sample calls numbered by first appearance, uncalled `N`
    pub pattern: Vec<u8>,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            all_called: true,
            reference_clean: false,
            reference_duplicated: false,
            all_passed_coverage: true,
            all_passed_proportion: true,
            all_passed_consensus: true,
            all_quality_breadth: true,
            missing_matrix_eligible: false,
            was_called: 0,
            called_reference: 0,
            called_snp: 0,
            called_degen: 0,
            passed_coverage: 0,
            passed_proportion: 0,
            num_a: 0,
            num_c: 0,
            num_g: 0,
            num_t: 0,
            num_n: 0,
            calls: Vec::new(),
            call_was_made: Vec::new(),
            passed_depth_filter: Vec::new(),
            passed_proportion_filter: Vec::new(),
            pattern: Vec::new(),
        }
    }
}

impl Position {
    #[must_use]
    pub fn with_capacity(num_samples: usize) -> Self {
        Self {
            calls: Vec::with_capacity(num_samples + 1),
            call_was_made: Vec::with_capacity(num_samples),
            passed_depth_filter: Vec::with_capacity(num_samples),
            passed_proportion_filter: Vec::with_capacity(num_samples),
            pattern: Vec::with_capacity(num_samples + 1),
            ..Self::default()
        }
    }

    /// Reference call, or `N` for a position that has not been filled.
    #[must_use]
    pub fn reference_call(&self) -> u8 {
        self.calls.first().copied().unwrap_or(ANY_CALL)
    }

    #[must_use]
    pub fn sample_calls(&self) -> &[u8] {
        self.calls.get(1..).unwrap_or_default()
    }

    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.call_was_made.len()
    }

    pub fn tally(&mut self, call: u8) {
        match Nucleotide::from_call(call) {
            Nucleotide::A => self.num_a += 1,
            Nucleotide::C => self.num_c += 1,
            Nucleotide::G => self.num_g += 1,
            Nucleotide::T => self.num_t += 1,
            Nucleotide::N => self.num_n += 1,
        }
    }

    /// True when at least one sample differs from a clean reference outside a duplicated region.
    #[must_use]
    pub fn is_any_snp(&self) -> bool {
        self.called_snp > 0
    }

    #[must_use]
    pub fn is_best_snp(&self) -> bool {
        self.all_quality_breadth && self.is_any_snp()
    }

    /// Fill [`Position::pattern`] from [`Position::calls`].
    pub fn build_pattern(&mut self) {
        // `N` is reserved for uncalled samples
        const SYMBOLS: &[u8] = b"123456789ABCDEFGHIJKLMOPQRSTUVWXYZ";

        self.pattern.clear();
        // At most a handful of distinct calls exist at one site
        let mut seen: Vec<u8> = Vec::with_capacity(8);
        for (i, &call) in self.calls.iter().enumerate() {
            if i > 0 && !is_called(call) {
                self.pattern.push(ANY_CALL);
                continue;
            }
            let id = seen.iter().position(|&c| c == call).unwrap_or_else(|| {
                seen.push(call);
                seen.len() - 1
            });
            self.pattern
                .push(SYMBOLS.get(id).copied().unwrap_or(SYMBOLS[SYMBOLS.len() - 1]));
        }
    }
}

impl Recycle for Position {
    fn recycle(&mut self) {
        self.calls.clear();
        self.call_was_made.clear();
        self.passed_depth_filter.clear();
        self.passed_proportion_filter.clear();
        self.pattern.clear();

        let Self {
            calls,
            call_was_made,
            passed_depth_filter,
            passed_proportion_filter,
            pattern,
            ..
        } = std::mem::take(self);

        *self = Self {
            calls,
            call_was_made,
            passed_depth_filter,
            passed_proportion_filter,
            pattern,
            ..Self::default()
        };
    }
}
