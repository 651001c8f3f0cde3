//! The monotonic 64-bit counter used as both a claim token and a
//! producer/consumer visibility cursor.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};

/// Value a freshly-constructed [`Sequence`] holds: "nothing published yet".
pub const INITIAL_VALUE: i64 = -1;

/// A cache-line-padded atomic counter.
///
/// Wrapping the atomic in [`CachePadded`] keeps it on its own cache line so a
/// hot producer sequence and a hot consumer sequence living in neighboring
/// fields don't ping-pong between cores. Once a thread observes this sequence
/// reach value `v` it must never observe it below `v` again; callers that
/// need that guarantee should only ever read via [`Sequence::get`].
#[derive(Debug)]
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// A new sequence initialized to [`INITIAL_VALUE`].
    pub fn new() -> Self {
        Self::with_value(INITIAL_VALUE)
    }

    /// A new sequence initialized to `value`.
    pub fn with_value(value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(value)),
        }
    }

    /// Acquire-load the current value.
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Relaxed-load the current value. Use only where the caller already
    /// establishes ordering through some other acquire/release pair (e.g. a
    /// producer reading its own single-threaded cursor).
    #[inline]
    pub fn get_relaxed(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Release-store `value`.
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Fully-fenced store: forces immediate visibility to any subsequent
    /// load on another core, including loads that would otherwise be
    /// satisfied by a relaxed/acquire read. Used where a StoreLoad fence is
    /// required, e.g. publishing claim-intent inside the single-producer
    /// claim-wait loop.
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Compare-and-swap. Returns `Ok(new)` on success or `Err(actual)` on
    /// failure, following the same convention as
    /// [`AtomicI64::compare_exchange`].
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> std::result::Result<i64, i64> {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| new)
    }

    /// Atomically add `delta` and return the resulting value.
    #[inline]
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Atomically increment by one and return the resulting value.
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the minimum of `sequences` together with `fallback` when the set
/// is empty. This is the "no upstream dependency" case: an empty dependent
/// set means "depend on the cursor", represented here by the caller passing
/// the cursor's value as `fallback`.
pub fn minimum_sequence(sequences: &[std::sync::Arc<Sequence>], fallback: i64) -> i64 {
    sequences
        .iter()
        .map(|s| s.get())
        .fold(fallback, i64::min)
}
