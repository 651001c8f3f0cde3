//! A lock-free, pre-allocated ring buffer coordinated by monotonic sequence
//! counters, following the LMAX Disruptor pattern.
//!
//! Producers claim sequences from a [`sequencer::Sequencer`] (single- or
//! multi-producer), write into the corresponding [`ring_buffer::RingBuffer`]
//! slot, and publish. Consumers resolve "what's safe to read" through a
//! [`barrier::SequenceBarrier`], which in turn parks or spins according to a
//! configurable [`wait_strategy::WaitStrategy`].
//!
//! This crate is a coordination substrate, not a messaging framework: event
//! bodies, handler threads, and transport are the caller's responsibility.

pub mod barrier;
pub mod error;
pub mod ring_buffer;
pub mod sequence;
pub mod sequencer;
pub mod translator;
pub mod wait_strategy;

pub use barrier::SequenceBarrier;
pub use error::{Result, SequencerError};
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequencer::{MultiProducerSequencer, ProducerType, Sequencer, SingleProducerSequencer};
pub use translator::{
    EventFactory, EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg,
    EventTranslatorTwoArg, EventTranslatorVararg,
};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, TimeoutWaitStrategy,
    WaitStrategy, WaitStrategyType, YieldingWaitStrategy,
};
