//! Slot storage plus the sequencer that arbitrates access to it.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::barrier::SequenceBarrier;
use crate::error::{Result, SequencerError};
use crate::sequence::Sequence;
use crate::sequencer::{MultiProducerSequencer, ProducerType, Sequencer, SingleProducerSequencer};
use crate::translator::{
    EventFactory, EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg,
    EventTranslatorTwoArg, EventTranslatorVararg,
};
use crate::wait_strategy::WaitStrategy;

/// Fixed-size, pre-allocated slot array coordinated by a [`Sequencer`].
///
/// Slot access is `unsafe` internally: the sequencer's claim protocol
/// guarantees a slot for sequence `s` is written by exactly one producer
/// before `publish(s)`, and read by consumers only after their barrier has
/// ratified `s` as available, so no two threads ever touch the same slot
/// concurrently. The public API never exposes that unsafety.
pub struct RingBuffer<E> {
    slots: Box<[UnsafeCell<E>]>,
    mask: i64,
    sequencer: Arc<dyn Sequencer>,
    wait_strategy: Arc<dyn WaitStrategy>,
}

// Safety: see the struct-level note. The claim/publish protocol enforces
// exclusive access to each slot.
unsafe impl<E: Send> Sync for RingBuffer<E> {}

impl<E> RingBuffer<E> {
    /// Build a ring buffer of `size` pre-allocated slots (a non-zero power
    /// of two), constructed via `factory`, coordinated by a sequencer of
    /// `producer_type` driven by `wait_strategy`.
    pub fn new(
        size: usize,
        factory: impl EventFactory<E>,
        producer_type: ProducerType,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(SequencerError::invalid_capacity(size));
        }

        let slots: Box<[UnsafeCell<E>]> = (0..size)
            .map(|_| UnsafeCell::new(factory.new_instance()))
            .collect();

        let sequencer: Arc<dyn Sequencer> = match producer_type {
            ProducerType::Single => {
                Arc::new(SingleProducerSequencer::new(size, wait_strategy.clone())?)
            }
            ProducerType::Multi => {
                Arc::new(MultiProducerSequencer::new(size, wait_strategy.clone())?)
            }
        };

        Ok(Self {
            slots,
            mask: (size - 1) as i64,
            sequencer,
            wait_strategy,
        })
    }

    #[inline]
    fn slot_ptr(&self, seq: i64) -> *mut E {
        let index = (seq & self.mask) as usize;
        self.slots[index].get()
    }

    /// The pre-allocated slot for `seq`. Safe to call for reads once a
    /// barrier has certified `seq` as available; `get(s)` and
    /// `get(s + buffer_size)` alias the same slot.
    ///
    /// # Safety
    /// The caller must not hold this reference across a point where
    /// another producer could claim and overwrite the same slot (i.e. past
    /// `min(gatingSequences) crossing s` again).
    pub unsafe fn get(&self, seq: i64) -> &E {
        &*self.slot_ptr(seq)
    }

    /// Mutable access to the pre-allocated slot for `seq`, for producer use
    /// between claim and publish.
    ///
    /// # Safety
    /// Only valid for a sequence the caller has exclusively claimed and not
    /// yet published.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, seq: i64) -> &mut E {
        &mut *self.slot_ptr(seq)
    }

    /// Claim the next sequence, blocking if necessary.
    pub fn next(&self) -> i64 {
        self.sequencer.next()
    }

    /// Claim the next `n` sequences, returning the highest claimed.
    pub fn next_n(&self, n: usize) -> i64 {
        self.sequencer.next_n(n)
    }

    /// Non-blocking variant of [`Self::next`].
    pub fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    /// Non-blocking variant of [`Self::next_n`]. Returns
    /// [`SequencerError::InsufficientCapacity`] immediately, without
    /// claiming anything, if `n` exceeds the buffer size outright.
    pub fn try_next_n(&self, n: usize) -> Result<i64> {
        if n as i64 > self.mask + 1 {
            return Err(SequencerError::insufficient_capacity(n));
        }
        self.sequencer.try_next_n(n)
    }

    /// Mark `seq` published.
    pub fn publish(&self, seq: i64) {
        self.sequencer.publish(seq);
    }

    /// Mark `[lo, hi]` published as one batch.
    pub fn publish_range(&self, lo: i64, hi: i64) {
        self.sequencer.publish_range(lo, hi);
    }

    /// Busy-waits for `seq` to become available, then returns its slot.
    /// Used rarely; consumers normally wait on a [`SequenceBarrier`]
    /// instead, which can park rather than spin.
    pub fn get_published(&self, seq: i64) -> &E {
        while !self.sequencer.is_available(seq) {
            std::hint::spin_loop();
        }
        // Safety: `is_available` returning true means the publishing
        // producer has finished writing this slot and will not touch it
        // again until it wraps back around, which cannot happen until a
        // gating consumer (including this read) advances past `seq`.
        unsafe { self.get(seq) }
    }

    /// Claim one slot, run `translator` against it, and publish. Even if
    /// `translator` panics, the slot is still published, so the ring never
    /// stalls waiting on a caller that failed mid-mutation.
    pub fn publish_event(&self, translator: impl EventTranslator<E>) {
        let seq = self.next();
        self.fill_and_publish(seq, seq, |buf| translator.translate_to(buf, seq));
    }

    /// Non-blocking variant of [`Self::publish_event`].
    pub fn try_publish_event(&self, translator: impl EventTranslator<E>) -> Result<()> {
        let seq = self.try_next()?;
        self.fill_and_publish(seq, seq, |buf| translator.translate_to(buf, seq));
        Ok(())
    }

    /// [`Self::publish_event`] with one user-supplied argument.
    pub fn publish_event_one_arg<A>(&self, translator: impl EventTranslatorOneArg<E, A>, arg: A) {
        let seq = self.next();
        self.fill_and_publish(seq, seq, |buf| translator.translate_to(buf, seq, arg));
    }

    /// [`Self::publish_event_one_arg`], non-blocking.
    pub fn try_publish_event_one_arg<A>(
        &self,
        translator: impl EventTranslatorOneArg<E, A>,
        arg: A,
    ) -> Result<()> {
        let seq = self.try_next()?;
        self.fill_and_publish(seq, seq, |buf| translator.translate_to(buf, seq, arg));
        Ok(())
    }

    /// [`Self::publish_event`] with two user-supplied arguments.
    pub fn publish_event_two_arg<A, B>(
        &self,
        translator: impl EventTranslatorTwoArg<E, A, B>,
        arg0: A,
        arg1: B,
    ) {
        let seq = self.next();
        self.fill_and_publish(seq, seq, |buf| translator.translate_to(buf, seq, arg0, arg1));
    }

    /// [`Self::publish_event`] with three user-supplied arguments.
    pub fn publish_event_three_arg<A, B, C>(
        &self,
        translator: impl EventTranslatorThreeArg<E, A, B, C>,
        arg0: A,
        arg1: B,
        arg2: C,
    ) {
        let seq = self.next();
        self.fill_and_publish(seq, seq, |buf| {
            translator.translate_to(buf, seq, arg0, arg1, arg2)
        });
    }

    /// Claims `args.len()` contiguous sequences with a single `next(n)`,
    /// fills each from the corresponding element of `args`, and commits them
    /// with one range publish.
    pub fn publish_events_vararg<A>(
        &self,
        translator: impl EventTranslatorVararg<E, A>,
        args: &[A],
    ) {
        let n = args.len();
        if n == 0 {
            return;
        }
        let hi = self.next_n(n);
        let lo = hi - n as i64 + 1;
        let guard = PublishGuard {
            sequencer: &*self.sequencer,
            lo,
            hi,
        };
        for (offset, index) in (lo..=hi).enumerate() {
            let slot = unsafe { self.get_mut(index) };
            translator.translate_to(slot, index, args, offset);
        }
        drop(guard);
    }

    fn fill_and_publish(&self, lo: i64, hi: i64, body: impl FnOnce(&mut E)) {
        let guard = PublishGuard {
            sequencer: &*self.sequencer,
            lo,
            hi,
        };
        let slot = unsafe { self.get_mut(lo) };
        body(slot);
        drop(guard);
    }

    /// Register additional gating (consumer) sequences.
    pub fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(sequences);
    }

    /// Remove a previously-registered gating sequence.
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    /// Build a barrier over this ring buffer's sequencer.
    pub fn new_barrier(&self, dependents: Vec<Arc<Sequence>>) -> SequenceBarrier {
        let cursor = self.sequencer.cursor_handle();
        let sequencer = self.sequencer.clone();
        SequenceBarrier::new(cursor, dependents, self.wait_strategy.clone(), move |next_sequence, available_sequence| {
            let highest = sequencer.get_highest_published_sequence(next_sequence, available_sequence);
            if highest >= next_sequence {
                Some(highest)
            } else {
                None
            }
        })
    }

    /// Current cursor value.
    pub fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }

    /// Number of pre-allocated slots.
    pub fn get_buffer_size(&self) -> usize {
        (self.mask + 1) as usize
    }

    /// Whether `n` more sequences could be claimed right now without
    /// blocking.
    pub fn has_available_capacity(&self, n: usize) -> bool {
        self.sequencer.has_available_capacity(n)
    }

    /// Slots not currently claimed by any producer.
    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    /// The slowest gating sequence, or the cursor if there are none.
    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.sequencer.get_minimum_sequence()
    }

    /// Force the cursor to `seq` and publish it. Initialization-time only:
    /// valid only before any gating sequence is registered and before any
    /// producer/consumer thread has started. Racy by design; callers must
    /// not invoke this concurrently with any other access.
    pub fn reset_to(&self, seq: i64) {
        self.sequencer.claim(seq);
        self.sequencer.publish(seq);
    }

    /// Claims and immediately publishes `seq`, returning its slot for
    /// initialization-time pre-filling. Same racy-by-design contract as
    /// [`Self::reset_to`].
    pub fn claim_and_get_preallocated(&self, seq: i64) -> &E {
        self.sequencer.claim(seq);
        self.sequencer.publish(seq);
        unsafe { self.get(seq) }
    }
}

/// Publishes `[lo, hi]` on drop so a slot is always marked published, even
/// when the body between claim and publish panics.
struct PublishGuard<'a> {
    sequencer: &'a dyn Sequencer,
    lo: i64,
    hi: i64,
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.sequencer.publish_range(self.lo, self.hi);
    }
}
