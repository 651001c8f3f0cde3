//! Error taxonomy for the sequencing and coordination substrate.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Errors raised by the ring buffer's claim/publish/wait machinery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// A non-blocking claim (`try_next` / `try_publish_event`) would have had
    /// to wait for gating consumers to advance.
    #[error("insufficient capacity to claim {requested} sequence(s)")]
    InsufficientCapacity {
        /// Number of sequences the caller tried to claim.
        requested: usize,
    },

    /// A `SequenceBarrier::wait_for` call was interrupted because the barrier
    /// was alerted while waiting.
    #[error("wait interrupted: barrier alerted")]
    Alerted,

    /// A wait strategy that enforces a bound exceeded it.
    #[error("wait timed out")]
    Timeout,

    /// Construction-time failure: buffer size must be a non-zero power of two.
    #[error("invalid ring buffer capacity {size}: must be a non-zero power of two")]
    InvalidCapacity {
        /// The rejected size.
        size: usize,
    },
}

impl SequencerError {
    /// Construct an [`SequencerError::InsufficientCapacity`] for `requested` slots.
    pub fn insufficient_capacity(requested: usize) -> Self {
        Self::InsufficientCapacity { requested }
    }

    /// Construct an [`SequencerError::InvalidCapacity`] for `size`.
    pub fn invalid_capacity(size: usize) -> Self {
        Self::InvalidCapacity { size }
    }

    /// Whether a caller can reasonably retry after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCapacity { .. } | Self::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_capacity_is_recoverable() {
        let err = SequencerError::insufficient_capacity(4);
        assert!(err.is_recoverable());
    }

    #[test]
    fn alerted_is_not_recoverable() {
        assert!(!SequencerError::Alerted.is_recoverable());
    }

    #[test]
    fn invalid_capacity_reports_size() {
        let err = SequencerError::invalid_capacity(3);
        assert!(matches!(err, SequencerError::InvalidCapacity { size: 3 }));
    }
}
