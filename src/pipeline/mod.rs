//! Bounded, ordered fan-out/fan-in over chunks.
//!
//! ```text
//!  scheduler ──chunk──▶ worker pool ──positions──▶ result slot ─┐
//!      │                     │                                 │ FIFO of slots
//!      └─── slot queue (bounded) ───────────────────────────────┴──▶ matrix writer
//!                            └──stats delta──▶ stats aggregator
//! ```
//!
//! - [`pool`]: free lists for chunk buffers, positions, batches, and deltas
//! - [`analyzer`]: classification of one chunk
//! - [`scheduler`]: contig/chunk traversal and thread orchestration

pub mod analyzer;
pub mod pool;
pub mod scheduler;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::pipeline::analyzer::AnalyzedChunk;

/// Single-use channel a worker fills with its analyzed chunk.
pub type ResultSlot = Receiver<AnalyzedChunk>;

/// How often blocked consumers re-check for cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const RUNNING: u8 = 0;
const INTERRUPTED: u8 = 1;
const ABORTED: u8 = 2;

/// Shared stop signal for every pipeline thread.
///
/// An interrupt ([`CancelFlag::cancel`]) keeps whatever was written so far.
/// An abort ([`CancelFlag::abort`]) follows a fatal error and means the
/// outputs must be discarded. An abort overrides an earlier interrupt.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicU8>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run at the next chunk boundary, keeping partial output.
    pub fn cancel(&self) {
        let _ = self
            .0
            .compare_exchange(RUNNING, INTERRUPTED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Stop the run because of a fatal error.
    pub fn abort(&self) {
        self.0.store(ABORTED, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) != RUNNING
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst) == ABORTED
    }
}

/// Outcome of a cancellable receive.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Received<T> {
    Item(T),
    Closed,
    Cancelled,
}

/// Block on `rx` until an item arrives, every sender is gone, or `cancel` is raised.
pub(crate) fn recv_or_cancel<T>(rx: &Receiver<T>, cancel: &CancelFlag) -> Received<T> {
    loop {
        if cancel.is_cancelled() {
            return Received::Cancelled;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(item) => return Received::Item(item),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Received::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};
    use std::thread;

    #[test]
    fn test_recv_or_cancel() {
        let (tx, rx) = unbounded();
        let cancel = CancelFlag::new();

        tx.send(7).unwrap();
        assert_eq!(recv_or_cancel(&rx, &cancel), Received::Item(7));

        drop(tx);
        assert_eq!(recv_or_cancel(&rx, &cancel), Received::<i32>::Closed);
    }

    #[test]
    fn test_cancel_unblocks_waiting_receiver() {
        let (_tx, rx) = bounded::<u8>(1);
        let cancel = CancelFlag::new();
        let remote = cancel.clone();

        let waiter = thread::spawn(move || recv_or_cancel(&rx, &cancel));
        thread::sleep(POLL_INTERVAL);
        remote.cancel();
        assert_eq!(waiter.join().unwrap(), Received::Cancelled);
    }

    #[test]
    fn test_abort_overrides_interrupt() {
        let cancel = CancelFlag::new();
        assert!(!cancel.is_cancelled());

        cancel.cancel();
        assert!(cancel.is_cancelled());
        assert!(!cancel.is_aborted());

        cancel.abort();
        assert!(cancel.is_aborted());

        // A late interrupt does not downgrade an abort
        cancel.cancel();
        assert!(cancel.is_aborted());
    }
}
