//! Free-list pools for the buffers and records that churn once per chunk.
//!
//! A borrower owns an object from [`Pool::get`] until it hands it back with
//! [`Pool::put`], which resets it first. Pools are unbounded; the ordered
//! result queue is what caps the number of live objects.

use std::fmt;

use crossbeam_queue::SegQueue;

use crate::core::chunk::ChunkBuffers;
use crate::core::position::Position;
use crate::core::stats::StatsDelta;

/// Reset an object to its documented default while keeping its allocations.
pub trait Recycle {
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// A thread-safe free list with a factory for when it runs dry.
pub struct Pool<T> {
    free: SegQueue<T>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Recycle> Pool<T> {
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            free: SegQueue::new(),
            factory: Box::new(factory),
        }
    }

    /// Take a clean object, allocating one if none are free.
    pub fn get(&self) -> T {
        self.free.pop().unwrap_or_else(|| (self.factory)())
    }

    /// Reset `item` and return it to the free list.
    pub fn put(&self, mut item: T) {
        item.recycle();
        self.free.push(item);
    }

    /// Number of objects currently waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("idle", &self.free.len()).finish()
    }
}

/// Every pool the pipeline shares, sized for one sample count.
#[derive(Debug)]
pub struct Pools {
    pub chunks: Pool<ChunkBuffers>,
    pub positions: Pool<Position>,
    pub batches: Pool<Vec<Position>>,
    pub deltas: Pool<StatsDelta>,
}

impl Pools {
    #[must_use]
    pub fn new(num_samples: usize, chunk_size: usize) -> Self {
        Self {
            chunks: Pool::new(move || ChunkBuffers::new(num_samples, chunk_size)),
            positions: Pool::new(move || Position::with_capacity(num_samples)),
            batches: Pool::new(move || Vec::with_capacity(chunk_size)),
            deltas: Pool::new(move || StatsDelta::new(num_samples)),
        }
    }

    /// Return a finished batch and every position in it.
    pub fn put_batch(&self, mut batch: Vec<Position>) {
        for position in batch.drain(..) {
            self.positions.put(position);
        }
        self.batches.put(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_get_reuses_returned_object() {
        let pool: Pool<Vec<u8>> = Pool::new(|| Vec::with_capacity(16));
        let mut buffer = pool.get();
        buffer.extend_from_slice(b"GATC");
        let ptr = buffer.as_ptr();
        pool.put(buffer);
        assert_eq!(pool.idle(), 1);

        let reused = pool.get();
        assert!(reused.is_empty());
        assert_eq!(reused.as_ptr(), ptr);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_put_resets_position() {
        let pools = Pools::new(2, 8);
        let mut position = pools.positions.get();
        position.all_called = false;
        position.called_snp = 1;
        position.calls.extend_from_slice(b"AGX");
        pools.positions.put(position);

        assert_eq!(pools.positions.get(), Position::default());
    }

    #[test]
    fn test_put_batch_returns_positions() {
        let pools = Pools::new(1, 4);
        let mut batch = pools.batches.get();
        batch.push(pools.positions.get());
        batch.push(pools.positions.get());
        pools.put_batch(batch);
        assert_eq!(pools.batches.idle(), 1);
        assert_eq!(pools.positions.idle(), 2);
        assert!(pools.batches.get().is_empty());
    }

    #[test]
    fn test_concurrent_get_put() {
        let pools = Arc::new(Pools::new(3, 32));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let pools = Arc::clone(&pools);
                thread::spawn(move || {
                    for round in 0..200 {
                        let mut delta = pools.deltas.get();
                        assert_eq!(delta.samples.len(), 3);
                        assert!(delta.samples.iter().all(|s| s.was_called == 0));
                        delta.contig_index = worker;
                        delta.samples[round % 3].was_called = 1;

                        let mut buffers = pools.chunks.get();
                        assert!(buffers.reference.is_empty());
                        buffers.reference.push(b'A');
                        buffers.samples[0].push(b'G');

                        pools.chunks.put(buffers);
                        pools.deltas.put(delta);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pools.deltas.idle() <= 8);
        assert!(pools.chunks.idle() <= 8);
    }
}
