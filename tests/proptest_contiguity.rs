//! Property tests for two invariants: construction-time power-of-two
//! validation, and the multi-producer contiguity guarantee under arbitrary
//! publish orderings.

use std::sync::Arc;

use disruptor_rb::sequencer::{MultiProducerSequencer, ProducerType, Sequencer};
use disruptor_rb::{BusySpinWaitStrategy, RingBuffer};
use proptest::prelude::*;

fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

proptest! {
    #[test]
    fn ring_buffer_construction_accepts_only_powers_of_two(size in 0usize..4096) {
        let result = RingBuffer::new(
            size,
            || 0i64,
            ProducerType::Single,
            Arc::new(BusySpinWaitStrategy::new()),
        );
        prop_assert_eq!(result.is_ok(), is_power_of_two(size));
    }

    /// However a batch of claims is permuted before being published, the
    /// highest contiguously-published sequence never exceeds the number of
    /// sequences that were actually published in order from zero, and never
    /// jumps past a gap.
    #[test]
    fn multi_producer_contiguity_holds_under_any_publish_permutation(
        permutation in prop::collection::vec(0usize..16, 16..17)
    ) {
        let sequencer = MultiProducerSequencer::new(32, Arc::new(BusySpinWaitStrategy::new())).unwrap();
        let hi = sequencer.next_n(16) ;
        let lo = hi - 15;

        // `permutation` is 16 draws from 0..16; turn it into an actual
        // permutation of [lo, hi] by deduplicating while preserving first
        // occurrence order, then publish in that order.
        let mut seen = std::collections::HashSet::new();
        let mut order: Vec<i64> = Vec::new();
        for p in &permutation {
            let seq = lo + *p as i64;
            if seen.insert(seq) {
                order.push(seq);
            }
        }
        for seq in lo..=hi {
            if seen.insert(seq) {
                order.push(seq);
            }
        }

        for &seq in &order {
            sequencer.publish(seq);

            let highest = sequencer.get_highest_published_sequence(lo, hi);
            if highest >= lo {
                // Everything from lo..=highest must actually have been
                // published by now.
                for s in lo..=highest {
                    prop_assert!(sequencer.is_available(s));
                }
            }
        }

        // Once every sequence has been published, the full range reports
        // as the highest published sequence.
        prop_assert_eq!(sequencer.get_highest_published_sequence(lo, hi), hi);
    }
}
