//! Classification of single-byte base calls.
//!
//! All bytes reaching these helpers have already been uppercased by the reader.

/// Call used for a sample with no data at a position (short or missing contig).
pub const MISSING_CALL: u8 = b'X';

/// Call meaning "any base".
pub const ANY_CALL: u8 = b'N';

/// Duplicate-mask flag marking a repeat region.
pub const DUPLICATED_FLAG: u8 = b'1';

/// True for an unambiguous nucleotide (A/C/G/T).
#[inline]
#[must_use]
pub fn is_clean_base(call: u8) -> bool {
    matches!(call, b'A' | b'C' | b'G' | b'T')
}

/// True unless the call is the missing sentinel or `N`.
#[inline]
#[must_use]
pub fn is_called(call: u8) -> bool {
    !matches!(call, MISSING_CALL | ANY_CALL)
}

/// Tally bucket for a call. Anything other than A/C/G/T counts as `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
    N,
}

impl Nucleotide {
    #[inline]
    #[must_use]
    pub fn from_call(call: u8) -> Self {
        match call {
            b'A' => Self::A,
            b'C' => Self::C,
            b'G' => Self::G,
            b'T' => Self::T,
            _ => Self::N,
        }
    }
}

/// How a called sample compares against a clean reference base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Called, but not a clean A/C/G/T (IUPAC ambiguity code etc.)
    Degenerate,
    /// Same base as the reference
    Reference,
    /// Different clean base, outside a duplicated region
    Snp,
    /// Different clean base inside a duplicated region; not counted
    MaskedSnp,
}

impl CallClass {
    /// Classify a called sample base against a clean reference base.
    #[must_use]
    pub fn classify(reference: u8, call: u8, duplicated: bool) -> Self {
        if !is_clean_base(call) {
            Self::Degenerate
        } else if call == reference {
            Self::Reference
        } else if duplicated {
            Self::MaskedSnp
        } else {
            Self::Snp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_clean_base() {
        for b in *b"ACGT" {
            assert!(is_clean_base(b));
        }
        for b in *b"NXRYD-" {
            assert!(!is_clean_base(b));
        }
    }

    #[test]
    fn test_is_called() {
        assert!(is_called(b'A'));
        assert!(is_called(b'R'));
        assert!(!is_called(b'N'));
        assert!(!is_called(MISSING_CALL));
    }

    #[test]
    fn test_classify() {
        assert_eq!(CallClass::classify(b'A', b'A', false), CallClass::Reference);
        assert_eq!(CallClass::classify(b'A', b'A', true), CallClass::Reference);
        assert_eq!(CallClass::classify(b'A', b'G', false), CallClass::Snp);
        assert_eq!(CallClass::classify(b'A', b'G', true), CallClass::MaskedSnp);
        assert_eq!(CallClass::classify(b'A', b'R', false), CallClass::Degenerate);
    }

    #[test]
    fn test_nucleotide_from_call() {
        assert_eq!(Nucleotide::from_call(b'G'), Nucleotide::G);
        assert_eq!(Nucleotide::from_call(b'X'), Nucleotide::N);
        assert_eq!(Nucleotide::from_call(b'D'), Nucleotide::N);
    }
}
