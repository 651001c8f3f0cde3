//! Pluggable policies for how a blocked consumer waits for a sequence to
//! become available.
//!
//! Each strategy trades latency against CPU usage differently. All of them
//! must observe the barrier's alert flag on every iteration and return
//! `Err(SequencerError::Alerted)` promptly once it is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, SequencerError};

/// Blocks until `sequence` is available according to the dependency graph,
/// or returns promptly when alerted.
pub trait WaitStrategy: Send + Sync {
    /// Wait until a sequence `>= sequence` is available, re-checking
    /// `is_available` and `alerted` on every iteration. Returns the highest
    /// available sequence observed.
    fn wait_for(
        &self,
        sequence: i64,
        alerted: &AtomicBool,
        is_available: &dyn Fn() -> Option<i64>,
    ) -> Result<i64>;

    /// Called by producers after publish to wake any parked waiters. A no-op
    /// for strategies that never park.
    fn signal_all_when_blocking(&self);
}

fn check_alert(alerted: &AtomicBool) -> Result<()> {
    if alerted.load(Ordering::Acquire) {
        Err(SequencerError::Alerted)
    } else {
        Ok(())
    }
}

/// Pure spin, lowest latency, highest CPU cost. Best when a dedicated core
/// is available for the consumer and sub-microsecond latency matters.
#[derive(Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy-spin wait strategy.
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        alerted: &AtomicBool,
        is_available: &dyn Fn() -> Option<i64>,
    ) -> Result<i64> {
        loop {
            check_alert(alerted)?;
            if let Some(available) = is_available() {
                if available >= sequence {
                    return Ok(available);
                }
            }
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op: nothing parks under busy-spin.
    }
}

/// Spin for a fixed budget, then yield the thread. A middle ground between
/// busy-spin and blocking.
pub struct YieldingWaitStrategy {
    spin_tries: usize,
}

impl YieldingWaitStrategy {
    /// Spin up to 100 times before yielding.
    pub fn new() -> Self {
        Self { spin_tries: 100 }
    }

    /// Create a yielding wait strategy with a custom spin budget.
    pub fn with_spin_tries(spin_tries: usize) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        alerted: &AtomicBool,
        is_available: &dyn Fn() -> Option<i64>,
    ) -> Result<i64> {
        let mut counter = 0usize;
        loop {
            check_alert(alerted)?;
            if let Some(available) = is_available() {
                if available >= sequence {
                    return Ok(available);
                }
            }

            if counter < self.spin_tries {
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
            counter += 1;
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op: yielding threads wake up on their own.
    }
}

/// Spin briefly, then progressively park for short intervals. Lowest CPU
/// cost while idle, at the expense of latency.
pub struct SleepingWaitStrategy {
    spin_tries: usize,
    sleep_duration: Duration,
}

impl SleepingWaitStrategy {
    /// A sleeping wait strategy with a 1ms park interval after a short spin.
    pub fn new() -> Self {
        Self::with_sleep_duration(Duration::from_millis(1))
    }

    /// Create a sleeping wait strategy with a custom park interval.
    pub fn with_sleep_duration(sleep_duration: Duration) -> Self {
        Self {
            spin_tries: 10,
            sleep_duration,
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        alerted: &AtomicBool,
        is_available: &dyn Fn() -> Option<i64>,
    ) -> Result<i64> {
        let mut counter = 0usize;
        loop {
            check_alert(alerted)?;
            if let Some(available) = is_available() {
                if available >= sequence {
                    return Ok(available);
                }
            }

            if counter < self.spin_tries {
                std::hint::spin_loop();
                counter += 1;
            } else {
                thread::sleep(self.sleep_duration);
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op: parked threads wake up on their own timer.
    }
}

/// Park on a condition variable; producers signal on publish. Lowest CPU
/// cost at low contention, since the thread is fully parked rather than
/// polling a timer.
pub struct BlockingWaitStrategy {
    mutex: parking_lot::Mutex<()>,
    condition: parking_lot::Condvar,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy.
    pub fn new() -> Self {
        Self {
            mutex: parking_lot::Mutex::new(()),
            condition: parking_lot::Condvar::new(),
        }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        alerted: &AtomicBool,
        is_available: &dyn Fn() -> Option<i64>,
    ) -> Result<i64> {
        let park_timeout = Duration::from_micros(100);
        loop {
            check_alert(alerted)?;
            if let Some(available) = is_available() {
                if available >= sequence {
                    return Ok(available);
                }
            }

            let mut guard = self.mutex.lock();
            check_alert(alerted)?;
            // Re-check under the lock: the producer may have published and
            // signaled between our last poll and taking the mutex.
            if let Some(available) = is_available() {
                if available >= sequence {
                    return Ok(available);
                }
            }
            self.condition.wait_for(&mut guard, park_timeout);
        }
    }

    fn signal_all_when_blocking(&self) {
        self.condition.notify_all();
    }
}

/// Wraps another strategy and bounds the total wait by `timeout`.
pub struct TimeoutWaitStrategy {
    timeout: Duration,
    base: Box<dyn WaitStrategy>,
}

impl TimeoutWaitStrategy {
    /// Wrap `base`, failing with [`SequencerError::Timeout`] after `timeout`.
    pub fn new(timeout: Duration, base: Box<dyn WaitStrategy>) -> Self {
        Self { timeout, base }
    }
}

impl WaitStrategy for TimeoutWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        alerted: &AtomicBool,
        is_available: &dyn Fn() -> Option<i64>,
    ) -> Result<i64> {
        let start = Instant::now();
        loop {
            if start.elapsed() > self.timeout {
                return Err(SequencerError::Timeout);
            }
            if let Some(available) = is_available() {
                if available >= sequence {
                    return Ok(available);
                }
            }
            check_alert(alerted)?;
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        self.base.signal_all_when_blocking();
    }
}

/// Construction-time selector for the wait strategy a sequencer/barrier uses.
/// Kept distinct from `Box<dyn WaitStrategy>` so configuration structs stay
/// `Clone`/`Copy` and callers don't need to allocate a trait object until
/// `into_strategy` is actually called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategyType {
    /// See [`BusySpinWaitStrategy`].
    BusySpin,
    /// See [`YieldingWaitStrategy`].
    Yielding,
    /// See [`SleepingWaitStrategy`].
    Sleeping,
    /// See [`BlockingWaitStrategy`].
    Blocking,
}

impl WaitStrategyType {
    /// Instantiate the concrete strategy this variant names.
    pub fn into_strategy(self) -> Box<dyn WaitStrategy> {
        match self {
            Self::BusySpin => Box::new(BusySpinWaitStrategy::new()),
            Self::Yielding => Box::new(YieldingWaitStrategy::new()),
            Self::Sleeping => Box::new(SleepingWaitStrategy::new()),
            Self::Blocking => Box::new(BlockingWaitStrategy::new()),
        }
    }
}
