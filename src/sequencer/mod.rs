//! The claim/publish protocol shared by single- and multi-producer
//! sequencers, plus the gating-sequence bookkeeping both variants need.

mod multi;
mod single;

pub use multi::MultiProducerSequencer;
pub use single::SingleProducerSequencer;

use std::sync::Arc;

use crate::barrier::SequenceBarrier;
use crate::error::Result;
use crate::sequence::{minimum_sequence, Sequence};
use crate::wait_strategy::WaitStrategy;

/// Construction-time choice between the single- and multi-producer claim
/// protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerType {
    /// Exactly one thread ever calls `next`/`publish`.
    Single,
    /// Any number of threads may call `next`/`publish` concurrently.
    Multi,
}

/// Common contract implemented by [`SingleProducerSequencer`] and
/// [`MultiProducerSequencer`].
pub trait Sequencer: Send + Sync {
    /// Claim the next sequence. Blocks while claiming it would overwrite a
    /// slot still being read by a gating consumer.
    fn next(&self) -> i64 {
        self.next_n(1)
    }

    /// Claim the next `n` sequences; returns the highest claimed.
    fn next_n(&self, n: usize) -> i64;

    /// Non-blocking variant of [`Self::next`]. Fails with
    /// [`crate::error::SequencerError::InsufficientCapacity`] rather than
    /// waiting.
    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    /// Non-blocking variant of [`Self::next_n`].
    fn try_next_n(&self, n: usize) -> Result<i64>;

    /// Mark `seq` published and wake waiters.
    fn publish(&self, seq: i64);

    /// Mark every sequence in `[lo, hi]` published and wake waiters.
    fn publish_range(&self, lo: i64, hi: i64);

    /// Whether `seq` has been published.
    fn is_available(&self, seq: i64) -> bool;

    /// Highest sequence in `[next_sequence, available_sequence]` such that
    /// every sequence in that range is published: the contiguity
    /// guarantee consumers rely on.
    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64;

    /// Whether `n` more sequences could be claimed right now without
    /// blocking.
    fn has_available_capacity(&self, n: usize) -> bool;

    /// Slots not currently claimed by any producer.
    fn remaining_capacity(&self) -> i64;

    /// The slowest gating sequence, or the cursor if there are none.
    fn get_minimum_sequence(&self) -> i64;

    /// Current cursor value (highest claimed sequence).
    fn get_cursor(&self) -> i64;

    /// Register additional consumer sequences that gate producer claims.
    /// Atomic copy-on-write replacement of the gating set: reading the
    /// set for min-gating never requires a lock.
    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]);

    /// Remove a previously-registered gating sequence. Returns whether it
    /// was present.
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Force the cursor to `seq`. Initialization-time only: racy by design,
    /// valid only before any producer/consumer thread has started and
    /// before any gating sequence is registered.
    fn claim(&self, seq: i64);

    /// Build a barrier gated on `dependents` (or the cursor, if empty),
    /// driven by `wait_strategy`.
    fn new_barrier(
        self: Arc<Self>,
        dependents: Vec<Arc<Sequence>>,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> SequenceBarrier
    where
        Self: 'static + Sized,
    {
        let cursor = self.cursor_handle();
        let sequencer = self.clone();
        SequenceBarrier::new(cursor, dependents, wait_strategy, move |next_sequence, available_sequence| {
            let highest = sequencer.get_highest_published_sequence(next_sequence, available_sequence);
            if highest >= next_sequence {
                Some(highest)
            } else {
                None
            }
        })
    }

    /// A handle to the cursor [`Sequence`], for barriers built without this
    /// trait's `new_barrier` default (e.g. wired up manually).
    fn cursor_handle(&self) -> Arc<Sequence>;
}

/// Copy-on-write snapshot of the gating-sequence set shared by both
/// sequencer variants.
pub(crate) struct GatingSequences {
    snapshot: parking_lot::RwLock<Arc<[Arc<Sequence>]>>,
}

impl GatingSequences {
    pub(crate) fn new() -> Self {
        Self {
            snapshot: parking_lot::RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub(crate) fn add(&self, sequences: &[Arc<Sequence>]) {
        let mut guard = self.snapshot.write();
        let mut next: Vec<Arc<Sequence>> = guard.iter().cloned().collect();
        next.extend(sequences.iter().cloned());
        *guard = Arc::from(next);
    }

    pub(crate) fn remove(&self, sequence: &Arc<Sequence>) -> bool {
        let mut guard = self.snapshot.write();
        let before = guard.len();
        let next: Vec<Arc<Sequence>> = guard
            .iter()
            .filter(|s| !Arc::ptr_eq(s, sequence))
            .cloned()
            .collect();
        let removed = next.len() != before;
        *guard = Arc::from(next);
        removed
    }

    pub(crate) fn snapshot(&self) -> Arc<[Arc<Sequence>]> {
        self.snapshot.read().clone()
    }

    pub(crate) fn minimum(&self, fallback: i64) -> i64 {
        minimum_sequence(&self.snapshot(), fallback)
    }
}

pub(crate) fn validate_capacity(size: usize) -> Result<()> {
    if size == 0 || !size.is_power_of_two() {
        return Err(crate::error::SequencerError::invalid_capacity(size));
    }
    Ok(())
}

pub(crate) fn log2(size: usize) -> u32 {
    size.trailing_zeros()
}

pub(crate) fn park_briefly() {
    std::thread::yield_now();
}
