//! Exhaustive interleaving model of the claim/publish protocol.
//!
//! Run with: RUSTFLAGS="--cfg loom" cargo test --test loom_sequencer --release
//!
//! loom substitutes its own atomics/thread primitives so it can explore
//! every legal interleaving rather than relying on luck to hit a race. The
//! protocol here mirrors `SingleProducerSequencer`/`MultiProducerSequencer`
//! but is re-expressed against `loom::sync` directly, since loom requires
//! its own atomic types rather than `std`'s.

#[cfg(loom)]
mod loom_tests {
    use loom::sync::atomic::{AtomicI32, AtomicI64, Ordering};
    use loom::sync::Arc;
    use loom::thread;

    /// Single producer claims sequences gated by one consumer sequence,
    /// publishing with a release store the consumer reads with acquire.
    #[test]
    fn single_producer_never_overtakes_its_gating_consumer() {
        loom::model(|| {
            let buffer_size: i64 = 2;
            let cursor = Arc::new(AtomicI64::new(-1));
            let gating = Arc::new(AtomicI64::new(-1));

            let producer_cursor = cursor.clone();
            let producer_gating = gating.clone();
            let producer = thread::spawn(move || {
                let mut next_value = -1i64;
                for _ in 0..3 {
                    let next_sequence = next_value + 1;
                    let wrap_point = next_sequence - buffer_size;
                    loop {
                        let observed = producer_gating.load(Ordering::Acquire);
                        if wrap_point <= observed {
                            break;
                        }
                        loom::thread::yield_now();
                    }
                    producer_cursor.store(next_sequence, Ordering::Release);
                    next_value = next_sequence;
                }
            });

            let consumer_cursor = cursor.clone();
            let consumer_gating = gating.clone();
            let consumer = thread::spawn(move || {
                let mut consumed = -1i64;
                while consumed < 2 {
                    let available = consumer_cursor.load(Ordering::Acquire);
                    if available > consumed {
                        consumed = available;
                        consumer_gating.store(consumed, Ordering::Release);
                    } else {
                        loom::thread::yield_now();
                    }
                }
            });

            producer.join().unwrap();
            consumer.join().unwrap();
            assert_eq!(cursor.load(Ordering::Acquire), 2);
        });
    }

    /// Two producers race to claim disjoint sequences via CAS; both must
    /// make progress and claims must never overlap.
    #[test]
    fn multi_producer_cas_claims_are_disjoint() {
        loom::model(|| {
            let cursor = Arc::new(AtomicI64::new(-1));

            let claim = |cursor: Arc<AtomicI64>| -> i64 {
                loop {
                    let current = cursor.load(Ordering::Acquire);
                    let next = current + 1;
                    if cursor
                        .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return next;
                    }
                }
            };

            let c1 = cursor.clone();
            let p1 = thread::spawn(move || claim(c1));
            let c2 = cursor.clone();
            let p2 = thread::spawn(move || claim(c2));

            let a = p1.join().unwrap();
            let b = p2.join().unwrap();
            assert_ne!(a, b);
            assert_eq!(cursor.load(Ordering::Acquire), 1);
        });
    }

    /// The per-slot availability flag must never read as published before
    /// its release store, even when a second producer is concurrently
    /// publishing into a different slot.
    #[test]
    fn availability_flag_publish_is_visible_after_acquire_load() {
        loom::model(|| {
            let flag_a = Arc::new(AtomicI32::new(-1));
            let flag_b = Arc::new(AtomicI32::new(-1));

            let fa = flag_a.clone();
            let publisher_a = thread::spawn(move || {
                fa.store(0, Ordering::Release);
            });
            let fb = flag_b.clone();
            let publisher_b = thread::spawn(move || {
                fb.store(0, Ordering::Release);
            });

            publisher_a.join().unwrap();
            publisher_b.join().unwrap();

            assert_eq!(flag_a.load(Ordering::Acquire), 0);
            assert_eq!(flag_b.load(Ordering::Acquire), 0);
        });
    }
}
