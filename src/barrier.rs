//! Consumer-side view of "which sequence is safe to read right now",
//! resolved against a producer cursor, a set of upstream dependent
//! sequences, and a cooperative alert flag for shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::sequence::{minimum_sequence, Sequence};
use crate::wait_strategy::WaitStrategy;

/// Resolves the highest sequence a consumer may safely process, blocking
/// (per the configured [`WaitStrategy`]) until one is available or the
/// barrier is alerted.
///
/// A barrier with no dependent sequences tracks the producer cursor
/// directly (the "depend on the cursor" case). A barrier
/// with dependents tracks the slowest of those instead, so a consumer never
/// runs ahead of the consumers it depends on.
pub struct SequenceBarrier {
    cursor: Arc<Sequence>,
    dependents: Vec<Arc<Sequence>>,
    wait_strategy: Arc<dyn WaitStrategy>,
    alerted: AtomicBool,
    highest_published: Box<dyn Fn(i64, i64) -> Option<i64> + Send + Sync>,
}

impl SequenceBarrier {
    /// Build a barrier gated on `cursor` when `dependents` is empty, or on
    /// the minimum of `dependents` otherwise.
    ///
    /// `highest_published` resolves "what's the highest contiguously
    /// published sequence no greater than `available_sequence`, given the
    /// claimed upper bound `claimed`". This is
    /// `Sequencer::get_highest_published_sequence`, injected here rather
    /// than depending on the sequencer trait directly so the barrier stays
    /// usable against any publisher.
    pub fn new(
        cursor: Arc<Sequence>,
        dependents: Vec<Arc<Sequence>>,
        wait_strategy: Arc<dyn WaitStrategy>,
        highest_published: impl Fn(i64, i64) -> Option<i64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            cursor,
            dependents,
            wait_strategy,
            alerted: AtomicBool::new(false),
            highest_published: Box::new(highest_published),
        }
    }

    /// Block until `sequence` is available to read, or the barrier is
    /// alerted. Returns the highest available sequence, which may be
    /// greater than `sequence`.
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        let gating = || -> i64 {
            if self.dependents.is_empty() {
                self.cursor.get()
            } else {
                minimum_sequence(&self.dependents, i64::MAX)
            }
        };

        let is_available = || -> Option<i64> {
            let claimed = gating();
            if claimed < sequence {
                return None;
            }
            (self.highest_published)(sequence, claimed)
        };

        self.wait_strategy
            .wait_for(sequence, &self.alerted, &is_available)
    }

    /// The producer cursor this barrier was built against.
    pub fn cursor_value(&self) -> i64 {
        self.cursor.get()
    }

    /// Signal any thread parked in [`Self::wait_for`] to wake and return
    /// [`crate::error::SequencerError::Alerted`].
    pub fn alert(&self) {
        tracing::debug!("sequence barrier alerted");
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Clear a previously-raised alert, allowing [`Self::wait_for`] to block
    /// again.
    pub fn clear_alert(&self) {
        tracing::debug!("sequence barrier alert cleared");
        self.alerted.store(false, Ordering::Release);
    }

    /// Whether the barrier is currently alerted.
    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// Return `Err(Alerted)` if alerted, else `Ok(())`. Consumers call this
    /// between batch items to react to shutdown without waiting on
    /// `wait_for`'s next sequence.
    pub fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(crate::error::SequencerError::Alerted)
        } else {
            Ok(())
        }
    }
}
