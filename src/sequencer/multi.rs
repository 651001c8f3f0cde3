//! Claim protocol for any number of concurrent producer threads.

use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;

use super::{log2, validate_capacity, GatingSequences, Sequencer};
use crate::error::{Result, SequencerError};
use crate::sequence::Sequence;
use crate::wait_strategy::WaitStrategy;

/// Per-slot publication flag, one entry per ring buffer slot. A slot's
/// flag equals `sequence >> log2(size)` once that sequence has been
/// published; every slot starts at `-1`, a value no real flag can ever
/// take, so a freshly-constructed or not-yet-wrapped-to slot always reads
/// as unpublished.
struct AvailabilityBuffer {
    mask: i64,
    flag_shift: u32,
    slots: Box<[AtomicI32]>,
}

impl AvailabilityBuffer {
    fn new(size: usize) -> Self {
        let slots = (0..size).map(|_| AtomicI32::new(-1)).collect();
        Self {
            mask: (size - 1) as i64,
            flag_shift: log2(size),
            slots,
        }
    }

    #[inline]
    fn flag_for(&self, sequence: i64) -> i32 {
        (sequence >> self.flag_shift) as i32
    }

    #[inline]
    fn index_for(&self, sequence: i64) -> usize {
        (sequence & self.mask) as usize
    }

    fn set(&self, sequence: i64) {
        let index = self.index_for(sequence);
        let flag = self.flag_for(sequence);
        self.slots[index].store(flag, Ordering::Release);
    }

    fn set_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set(sequence);
        }
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.index_for(sequence);
        let flag = self.flag_for(sequence);
        self.slots[index].load(Ordering::Acquire) == flag
    }

    fn highest_published(&self, next_sequence: i64, available_sequence: i64) -> i64 {
        let mut sequence = next_sequence;
        while sequence <= available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
            sequence += 1;
        }
        available_sequence
    }
}

/// Multi-producer claim protocol: any number of threads may claim and
/// publish sequences concurrently.
pub struct MultiProducerSequencer {
    buffer_size: i64,
    cursor: Arc<Sequence>,
    gating_sequence_cache: AtomicI64,
    gating_sequences: GatingSequences,
    availability: AvailabilityBuffer,
    wait_strategy: Arc<dyn WaitStrategy>,
}

impl MultiProducerSequencer {
    /// Create a sequencer for a `buffer_size`-slot ring buffer (must be a
    /// non-zero power of two).
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        validate_capacity(buffer_size)?;
        Ok(Self {
            buffer_size: buffer_size as i64,
            cursor: Arc::new(Sequence::new()),
            gating_sequence_cache: AtomicI64::new(crate::sequence::INITIAL_VALUE),
            gating_sequences: GatingSequences::new(),
            availability: AvailabilityBuffer::new(buffer_size),
            wait_strategy,
        })
    }

    fn min_gating(&self, fallback: i64) -> i64 {
        self.gating_sequences.minimum(fallback)
    }
}

impl Sequencer for MultiProducerSequencer {
    fn next_n(&self, n: usize) -> i64 {
        let n = n as i64;
        loop {
            let current = self.cursor.get();
            let next = current + n;
            let wrap_point = next - self.buffer_size;
            let cached_gating = self.gating_sequence_cache.load(Ordering::Acquire);

            if wrap_point > cached_gating || cached_gating > current {
                let gating_sequence = self.min_gating(current);
                if wrap_point > gating_sequence {
                    self.wait_strategy.signal_all_when_blocking();
                    super::park_briefly();
                    continue;
                }
                self.gating_sequence_cache
                    .store(gating_sequence, Ordering::Release);
                continue;
            }

            if self
                .cursor
                .compare_and_set(current, next)
                .is_ok()
            {
                return next;
            }
        }
    }

    fn try_next_n(&self, n: usize) -> Result<i64> {
        let n_i64 = n as i64;
        loop {
            let current = self.cursor.get();
            let next = current + n_i64;
            let wrap_point = next - self.buffer_size;
            let gating_sequence = self.min_gating(current);

            if wrap_point > gating_sequence {
                return Err(SequencerError::insufficient_capacity(n));
            }

            if self.cursor.compare_and_set(current, next).is_ok() {
                return Ok(next);
            }
        }
    }

    fn publish(&self, seq: i64) {
        self.availability.set(seq);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        self.availability.set_range(lo, hi);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn is_available(&self, seq: i64) -> bool {
        self.availability.is_available(seq)
    }

    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64 {
        self.availability
            .highest_published(next_sequence, available_sequence)
    }

    fn has_available_capacity(&self, n: usize) -> bool {
        let current = self.cursor.get();
        let wrap_point = current + n as i64 - self.buffer_size;
        let cached_gating = self.gating_sequence_cache.load(Ordering::Acquire);
        if wrap_point > cached_gating || cached_gating > current {
            let gating_sequence = self.min_gating(current);
            self.gating_sequence_cache
                .store(gating_sequence, Ordering::Release);
            wrap_point <= gating_sequence
        } else {
            true
        }
    }

    fn remaining_capacity(&self) -> i64 {
        let consumed = self.min_gating(self.cursor.get());
        self.buffer_size - (self.cursor.get() - consumed)
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
        self.cursor.set(seq);
    }

    fn cursor_handle(&self) -> Arc<Sequence> {
        self.cursor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait_strategy::BusySpinWaitStrategy;
    use std::thread;

    fn sequencer(size: usize) -> Arc<MultiProducerSequencer> {
        Arc::new(MultiProducerSequencer::new(size, Arc::new(BusySpinWaitStrategy::new())).unwrap())
    }

    #[test]
    fn rejects_non_power_of_two_capacity() {
        assert!(MultiProducerSequencer::new(5, Arc::new(BusySpinWaitStrategy::new())).is_err());
    }

    #[test]
    fn claims_are_globally_ordered_by_cas() {
        let seq = sequencer(1024);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let seq = seq.clone();
            handles.push(thread::spawn(move || {
                let mut claimed = Vec::with_capacity(100);
                for _ in 0..100 {
                    claimed.push(seq.next());
                }
                claimed
            }));
        }

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        let expected: Vec<i64> = (0..400).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn out_of_order_publish_reports_only_the_contiguous_prefix() {
        let seq = sequencer(8);
        let a = seq.next();
        let b = seq.next();
        let c = seq.next();
        assert_eq!((a, b, c), (0, 1, 2));

        // Publish the middle and last slot before the first.
        seq.publish(b);
        seq.publish(c);
        assert_eq!(seq.get_highest_published_sequence(0, 2), -1);

        seq.publish(a);
        assert_eq!(seq.get_highest_published_sequence(0, 2), 2);
    }

    #[test]
    fn try_next_fails_without_blocking_when_full() {
        let seq = sequencer(2);
        let consumed = Arc::new(Sequence::new());
        seq.add_gating_sequences(&[consumed]);

        assert_eq!(seq.try_next().unwrap(), 0);
        assert_eq!(seq.try_next().unwrap(), 1);
        assert!(seq.try_next().is_err());
    }

    #[test]
    fn is_available_distinguishes_wrapped_generations() {
        let seq = sequencer(2);
        seq.publish(0);
        assert!(seq.is_available(0));
        assert!(!seq.is_available(2));
        seq.publish(2);
        assert!(seq.is_available(2));
        // Slot 0 (index 0) has been overwritten by generation 1 (sequence 2);
        // the stale flag for sequence 0 must not satisfy is_available(0).
        assert!(!seq.is_available(0));
    }
}
