//! Lockstep reader over the reference and its optional duplicates mask.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, warn};

use crate::core::contig::first_mismatch;
use crate::error::{MatrixError, Result};
use crate::parsing::fasta::{Alphabet, FastaSource};

/// Iterates reference contigs, advancing the duplicates mask (if any) in step.
///
/// The mask must describe the same contigs in the same order as the reference.
#[derive(Debug)]
pub struct ReferenceReader<R = File> {
    reference: FastaSource<R>,
    duplicates: Option<FastaSource<R>>,
    contig: Option<String>,
    /// Bytes read from each side for the current contig
    reference_len: u64,
    mask_len: u64,
    mask_length_mismatches: usize,
}

impl ReferenceReader<File> {
    /// Open the reference and, if given, the duplicates file.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Io` if either file cannot be read and
    /// `MatrixError::Configuration` if the two files disagree on contig order.
    pub fn open(reference: &Path, duplicates: Option<&Path>) -> Result<Self> {
        // Both sides are indexed only when there is something to compare
        let index = duplicates.is_some();
        let reference = FastaSource::open(reference, index)?;
        let duplicates = duplicates
            .map(|path| FastaSource::open(path, true).map(|s| s.with_alphabet(Alphabet::Flags)))
            .transpose()?;
        Self::new(reference, duplicates)
    }
}

impl<R: Read + Seek> ReferenceReader<R> {
    /// Pair a reference with an optional mask.
    ///
    /// When both sources are indexed, their contig order is compared up front
    /// so a desynchronized mask fails before any position is analyzed.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Configuration` on a contig order mismatch.
    pub fn new(reference: FastaSource<R>, duplicates: Option<FastaSource<R>>) -> Result<Self> {
        if let Some(dups) = &duplicates {
            if let (Some(ref_contigs), Some(dup_contigs)) = (reference.contigs(), dups.contigs()) {
                if let Some((r, d)) = first_mismatch(ref_contigs, dup_contigs) {
                    return Err(desync_error(r, d));
                }
                debug!(
                    contigs = ref_contigs.len(),
                    "duplicates file matches reference contig order"
                );
            }
        }

        Ok(Self {
            reference,
            duplicates,
            contig: None,
            reference_len: 0,
            mask_len: 0,
            mask_length_mismatches: 0,
        })
    }

    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.duplicates.is_some()
    }

    /// Name of the contig currently being read.
    #[must_use]
    pub fn contig(&self) -> Option<&str> {
        self.contig.as_deref()
    }

    /// Contigs whose mask length differed from the reference length.
    #[must_use]
    pub fn mask_length_mismatches(&self) -> usize {
        self.mask_length_mismatches
    }

    /// Advance both sources to their next contig.
    ///
    /// Returns `Ok(None)` when the reference is exhausted. A mask contig
    /// longer or shorter than its reference contig is logged and counted, and
    /// the mask is treated as unflagged past its end.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Configuration` if the mask's next contig differs
    /// from the reference's (including one side ending before the other).
    pub fn next_contig(&mut self) -> Result<Option<String>> {
        self.check_mask_length()?;

        let name = self.reference.next_contig()?;

        if let Some(dups) = &mut self.duplicates {
            let dup_name = dups.next_contig()?;
            if name != dup_name {
                return Err(desync_error(
                    name.as_deref().unwrap_or("<none>"),
                    dup_name.as_deref().unwrap_or("<none>"),
                ));
            }
        }

        self.contig.clone_from(&name);
        Ok(name)
    }

    /// Append up to `n` reference bytes to `reference` and the matching mask
    /// bytes to `duplicates` (left empty without a mask).
    ///
    /// Returns `true` while the contig is only partially consumed.
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::Format` or `MatrixError::Io` from either source.
    pub fn read_positions(
        &mut self,
        n: usize,
        reference: &mut Vec<u8>,
        duplicates: &mut Vec<u8>,
    ) -> Result<bool> {
        let before = reference.len();
        let complete = self.reference.read_positions(n, reference)?;
        let read = reference.len() - before;
        self.reference_len += read as u64;

        if let Some(dups) = &mut self.duplicates {
            if read > 0 {
                let before = duplicates.len();
                dups.read_positions(read, duplicates)?;
                self.mask_len += (duplicates.len() - before) as u64;
            }
        }

        Ok(!complete)
    }

    /// Compare the finished contig's lengths, counting mask bytes never read.
    fn check_mask_length(&mut self) -> Result<()> {
        if let (Some(contig), Some(dups)) = (&self.contig, &mut self.duplicates) {
            self.reference_len += self.reference.skip_contig()?;
            self.mask_len += dups.skip_contig()?;
            if self.mask_len != self.reference_len {
                warn!(
                    contig = %contig,
                    reference_length = self.reference_len,
                    duplicates_length = self.mask_len,
                    "duplicates contig length differs from the reference"
                );
                self.mask_length_mismatches += 1;
            }
        }
        self.reference_len = 0;
        self.mask_len = 0;
        Ok(())
    }
}

fn desync_error(reference: &str, duplicates: &str) -> MatrixError {
    MatrixError::Configuration(format!(
        "The duplicates file should have a corresponding contig for every contig in the reference \
         (reference: {reference}, duplicates: {duplicates})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    type Source = FastaSource<Cursor<Vec<u8>>>;

    fn fasta(bytes: &[u8], index: bool) -> Source {
        FastaSource::from_reader("ref.fasta", Cursor::new(bytes.to_vec()), index).unwrap()
    }

    fn mask(bytes: &[u8], index: bool) -> Source {
        fasta(bytes, index).with_alphabet(Alphabet::Flags)
    }

    const REFERENCE: &[u8] = b">ContigA\nGATC\n>ContigB\nCTAGDCBA\n";

    #[test]
    fn test_reference_only() {
        let mut reader = ReferenceReader::new(fasta(REFERENCE, false), None).unwrap();
        assert!(!reader.has_duplicates());

        assert_eq!(reader.next_contig().unwrap().as_deref(), Some("ContigA"));
        let (mut r, mut d) = (Vec::new(), Vec::new());
        assert!(reader.read_positions(3, &mut r, &mut d).unwrap());
        assert!(!reader.read_positions(3, &mut r, &mut d).unwrap());
        assert_eq!(r, b"GATC");
        assert!(d.is_empty());

        assert_eq!(reader.next_contig().unwrap().as_deref(), Some("ContigB"));
        assert_eq!(reader.contig(), Some("ContigB"));
        assert_eq!(reader.next_contig().unwrap(), None);
    }

    #[test]
    fn test_lockstep_with_mask() {
        let dups = mask(b">ContigA\n1100\n>ContigB\n00000000\n", false);
        let mut reader = ReferenceReader::new(fasta(REFERENCE, false), Some(dups)).unwrap();

        reader.next_contig().unwrap();
        let (mut r, mut d) = (Vec::new(), Vec::new());
        assert!(reader.read_positions(2, &mut r, &mut d).unwrap());
        assert_eq!((r.as_slice(), d.as_slice()), (&b"GA"[..], &b"11"[..]));

        assert!(!reader.read_positions(10, &mut r, &mut d).unwrap());
        assert_eq!(d, b"1100");

        assert_eq!(reader.next_contig().unwrap().as_deref(), Some("ContigB"));
    }

    #[test]
    fn test_upfront_order_check() {
        let dups = mask(b">ContigB\n00000000\n>ContigA\n0000\n", true);
        let err = ReferenceReader::new(fasta(REFERENCE, true), Some(dups)).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, MatrixError::Configuration(_)));
        assert!(message.contains("reference: ContigA"));
        assert!(message.contains("duplicates: ContigB"));
    }

    #[test]
    fn test_next_contig_detects_desync() {
        let dups = mask(b">ContigA\n0000\n>ContigC\n00000000\n", false);
        let mut reader = ReferenceReader::new(fasta(REFERENCE, false), Some(dups)).unwrap();
        assert!(reader.next_contig().is_ok());
        assert!(matches!(
            reader.next_contig(),
            Err(MatrixError::Configuration(_))
        ));
    }

    #[test]
    fn test_mask_length_mismatch_is_counted() {
        // ContigA mask is two bytes too long, ContigB one byte short
        let dups = mask(b">ContigA\n110000\n>ContigB\n0000000\n", false);
        let mut reader = ReferenceReader::new(fasta(REFERENCE, false), Some(dups)).unwrap();
        let (mut r, mut d) = (Vec::new(), Vec::new());

        reader.next_contig().unwrap();
        while reader.read_positions(3, &mut r, &mut d).unwrap() {}
        assert_eq!(d, b"1100");

        assert_eq!(reader.next_contig().unwrap().as_deref(), Some("ContigB"));
        assert_eq!(reader.mask_length_mismatches(), 1);

        r.clear();
        d.clear();
        while reader.read_positions(3, &mut r, &mut d).unwrap() {}
        assert_eq!((r.len(), d.len()), (8, 7));

        assert_eq!(reader.next_contig().unwrap(), None);
        assert_eq!(reader.mask_length_mismatches(), 2);
    }

    #[test]
    fn test_matching_mask_lengths() {
        let dups = mask(b">ContigA\n1100\n>ContigB\n00000000\n", false);
        let mut reader = ReferenceReader::new(fasta(REFERENCE, false), Some(dups)).unwrap();
        let (mut r, mut d) = (Vec::new(), Vec::new());
        while reader.next_contig().unwrap().is_some() {
            while reader.read_positions(4, &mut r, &mut d).unwrap() {}
        }
        assert_eq!(reader.mask_length_mismatches(), 0);
    }

    #[test]
    fn test_mask_ending_early_is_desync() {
        let dups = mask(b">ContigA\n0000\n", false);
        let mut reader = ReferenceReader::new(fasta(REFERENCE, false), Some(dups)).unwrap();
        reader.next_contig().unwrap();
        let err = reader.next_contig().unwrap_err();
        assert!(err.to_string().contains("duplicates: <none>"));
    }
}
