use std::sync::Arc;

use crate::core::call::{DUPLICATED_FLAG, MISSING_CALL};
use crate::pipeline::pool::Recycle;

/// Byte buffers holding one chunk of aligned input.
///
/// Index `i` in every buffer refers to the same genomic offset. Any sample
/// buffer (and the duplicates buffer) may be shorter than `reference`; the
/// remaining offsets are missing data, not an error.
#[derive(Debug, Default)]
pub struct ChunkBuffers {
    pub reference: Vec<u8>,
    /// Empty when no duplicates file is configured
    pub duplicates: Vec<u8>,
    pub samples: Vec<Vec<u8>>,
}

impl ChunkBuffers {
    #[must_use]
    pub fn new(num_samples: usize, capacity: usize) -> Self {
        Self {
            reference: Vec::with_capacity(capacity),
            duplicates: Vec::with_capacity(capacity),
            samples: (0..num_samples)
                .map(|_| Vec::with_capacity(capacity))
                .collect(),
        }
    }
}

impl Recycle for ChunkBuffers {
    fn recycle(&mut self) {
        self.reference.clear();
        self.duplicates.clear();
        for sample in &mut self.samples {
            sample.clear();
        }
    }
}

/// One bounded slice of one contig, ready for analysis.
#[derive(Debug)]
pub struct Chunk {
    /// Order in which the chunk was read; matrix rows follow this order
    pub serial: u64,

    /// Index of the contig in reference order
    pub contig_index: usize,

    pub contig: Arc<str>,

    /// 1-based position of the first reference byte within the contig
    pub start: u64,

    pub buffers: ChunkBuffers,
}

impl Chunk {
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.reference.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.reference.is_empty()
    }

    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.buffers.samples.len()
    }

    #[inline]
    #[must_use]
    pub fn reference_call(&self, offset: usize) -> u8 {
        self.buffers.reference[offset]
    }

    /// True if the duplicates mask flags `offset`; offsets past the mask are not duplicated.
    #[inline]
    #[must_use]
    pub fn is_duplicated(&self, offset: usize) -> bool {
        self.buffers.duplicates.get(offset) == Some(&DUPLICATED_FLAG)
    }

    /// Call for `sample` at `offset`, padded with the missing sentinel when out of range.
    #[inline]
    #[must_use]
    pub fn sample_call(&self, sample: usize, offset: usize) -> u8 {
        self.buffers.samples[sample]
            .get(offset)
            .map_or(MISSING_CALL, u8::to_ascii_uppercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(reference: &[u8], duplicates: &[u8], samples: &[&[u8]]) -> Chunk {
        let mut buffers = ChunkBuffers::new(samples.len(), reference.len());
        buffers.reference.extend_from_slice(reference);
        buffers.duplicates.extend_from_slice(duplicates);
        for (buffer, sample) in buffers.samples.iter_mut().zip(samples) {
            buffer.extend_from_slice(sample);
        }
        Chunk {
            serial: 0,
            contig_index: 0,
            contig: Arc::from("chr1"),
            start: 1,
            buffers,
        }
    }

    #[test]
    fn test_short_sample_pads_with_missing() {
        let c = chunk(b"GATC", b"", &[b"GA", b"gatc"]);
        assert_eq!(c.sample_call(0, 1), b'A');
        assert_eq!(c.sample_call(0, 2), MISSING_CALL);
        assert_eq!(c.sample_call(0, 3), MISSING_CALL);
        assert_eq!(c.sample_call(1, 3), b'C');
    }

    #[test]
    fn test_duplicates_mask() {
        let c = chunk(b"GATC", b"110", &[]);
        assert!(c.is_duplicated(0));
        assert!(c.is_duplicated(1));
        assert!(!c.is_duplicated(2));
        assert!(!c.is_duplicated(3));

        let unmasked = chunk(b"GATC", b"", &[]);
        assert!(!unmasked.is_duplicated(0));
    }

    #[test]
    fn test_recycle_clears_but_keeps_shape() {
        let mut c = chunk(b"GATC", b"1111", &[b"GATC", b"GA"]);
        c.buffers.recycle();
        assert!(c.buffers.reference.is_empty());
        assert!(c.buffers.duplicates.is_empty());
        assert_eq!(c.buffers.samples.len(), 2);
        assert!(c.buffers.samples.iter().all(Vec::is_empty));
    }
}
