//! Claim protocol for the case where exactly one thread ever calls
//! `next`/`publish`.

use std::cell::Cell;
use std::sync::Arc;

use super::{validate_capacity, GatingSequences, Sequencer};
use crate::error::{Result, SequencerError};
use crate::sequence::Sequence;
use crate::wait_strategy::WaitStrategy;

/// Single-producer claim protocol: exactly one thread ever claims and
/// publishes sequences on this sequencer.
///
/// `next_value` and `cached_gating_sequence` are touched only by the one
/// producer thread that owns this sequencer, so they're plain [`Cell`]s
/// rather than atomics. The whole point of the single-producer variant is
/// avoiding atomic RMWs on the claim fast path. The struct is still `Sync`
/// because the cursor and gating set are shared with consumer threads;
/// callers are responsible for ensuring only one thread ever calls the
/// producer-side methods (`next*`, `publish*`, `claim`).
pub struct SingleProducerSequencer {
    buffer_size: i64,
    cursor: Arc<Sequence>,
    next_value: Cell<i64>,
    cached_gating_sequence: Cell<i64>,
    gating_sequences: GatingSequences,
    wait_strategy: Arc<dyn WaitStrategy>,
}

// Safety: `next_value` and `cached_gating_sequence` are only ever read or
// written from the single producer thread that calls `next`/`try_next`/
// `claim`. Consumer threads only observe `cursor`, which is a real atomic.
unsafe impl Sync for SingleProducerSequencer {}

impl SingleProducerSequencer {
    /// Create a sequencer for a `buffer_size`-slot ring buffer (must be a
    /// non-zero power of two).
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        validate_capacity(buffer_size)?;
        Ok(Self {
            buffer_size: buffer_size as i64,
            cursor: Arc::new(Sequence::new()),
            next_value: Cell::new(crate::sequence::INITIAL_VALUE),
            cached_gating_sequence: Cell::new(crate::sequence::INITIAL_VALUE),
            gating_sequences: GatingSequences::new(),
            wait_strategy,
        })
    }

    fn min_gating(&self, fallback: i64) -> i64 {
        self.gating_sequences.minimum(fallback)
    }
}

impl Sequencer for SingleProducerSequencer {
    fn next_n(&self, n: usize) -> i64 {
        let n = n as i64;
        let next_value = self.next_value.get();
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.buffer_size;
        let cached_gating_sequence = self.cached_gating_sequence.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            // Publish claim intent with a full fence so gating consumers
            // observe it before we spin on their progress.
            self.cursor.set_volatile(next_value);

            let mut min_sequence;
            loop {
                min_sequence = self.min_gating(next_value);
                if min_sequence >= wrap_point {
                    break;
                }
                super::park_briefly();
            }
            self.cached_gating_sequence.set(min_sequence);
        }

        self.next_value.set(next_sequence);
        next_sequence
    }

    fn try_next_n(&self, n: usize) -> Result<i64> {
        let n_i64 = n as i64;
        let next_value = self.next_value.get();
        let next_sequence = next_value + n_i64;
        let wrap_point = next_sequence - self.buffer_size;
        let min_sequence = self.min_gating(next_value);

        if wrap_point > min_sequence {
            return Err(SequencerError::insufficient_capacity(n));
        }

        self.cached_gating_sequence.set(min_sequence);
        self.next_value.set(next_sequence);
        Ok(next_sequence)
    }

    fn publish(&self, seq: i64) {
        self.cursor.set(seq);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }

    fn is_available(&self, seq: i64) -> bool {
        seq <= self.cursor.get()
    }

    fn get_highest_published_sequence(&self, _next_sequence: i64, available_sequence: i64) -> i64 {
        // A single publisher can never create a gap: the cursor only ever
        // advances to a value it has fully published.
        available_sequence
    }

    fn has_available_capacity(&self, n: usize) -> bool {
        let next_value = self.next_value.get();
        let wrap_point = next_value + n as i64 - self.buffer_size;
        let cached_gating_sequence = self.cached_gating_sequence.get();
        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            let min_sequence = self.min_gating(next_value);
            self.cached_gating_sequence.set(min_sequence);
            wrap_point <= min_sequence
        } else {
            true
        }
    }

    fn remaining_capacity(&self) -> i64 {
        let consumed = self.min_gating(self.next_value.get());
        self.buffer_size - (self.next_value.get() - consumed)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.min_gating(self.cursor.get())
    }

    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }

    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        self.gating_sequences.add(sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating_sequences.remove(sequence)
    }

    fn claim(&self, seq: i64) {
        self.next_value.set(seq);
        self.cursor.set(seq);
    }

    fn cursor_handle(&self) -> Arc<Sequence> {
        self.cursor.clone()
    }
}
