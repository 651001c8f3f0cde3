//! Criterion benchmark for claim+publish throughput.
//!
//! Run: cargo bench --bench bench_sequencer

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use disruptor_rb::{BusySpinWaitStrategy, ProducerType, RingBuffer, Sequence};

const RING_SIZE: usize = 1 << 16;

fn single_producer_single_consumer(events: u64) -> u64 {
    let rb = Arc::new(
        RingBuffer::new(
            RING_SIZE,
            || 0u64,
            ProducerType::Single,
            Arc::new(BusySpinWaitStrategy::new()),
        )
        .unwrap(),
    );
    let consumer_sequence = Arc::new(Sequence::new());
    rb.add_gating_sequences(&[consumer_sequence.clone()]);
    let barrier = rb.new_barrier(Vec::new());

    let ring_consumer = rb.clone();
    let consumer = thread::spawn(move || {
        let mut next = 0i64;
        while (next as u64) < events {
            let available = barrier.wait_for(next).unwrap();
            while next <= available {
                black_box(*unsafe { ring_consumer.get(next) });
                next += 1;
            }
            consumer_sequence.set(available);
        }
    });

    for i in 0..events {
        rb.publish_event(move |slot: &mut u64, _seq: i64| *slot = i);
    }
    consumer.join().unwrap();
    events
}

fn multi_producer_contention(events_per_producer: u64, producers: u64) -> u64 {
    let rb = Arc::new(
        RingBuffer::new(
            RING_SIZE,
            || 0u64,
            ProducerType::Multi,
            Arc::new(BusySpinWaitStrategy::new()),
        )
        .unwrap(),
    );
    let consumer_sequence = Arc::new(Sequence::new());
    rb.add_gating_sequences(&[consumer_sequence.clone()]);
    let barrier = rb.new_barrier(Vec::new());
    let total = events_per_producer * producers;

    let ring_consumer = rb.clone();
    let consumed = Arc::new(AtomicUsize::new(0));
    let consumed2 = consumed.clone();
    let consumer = thread::spawn(move || {
        let mut next = 0i64;
        while (next as u64) < total {
            let available = barrier.wait_for(next).unwrap();
            while next <= available {
                black_box(*unsafe { ring_consumer.get(next) });
                consumed2.fetch_add(1, Ordering::Release);
                next += 1;
            }
            consumer_sequence.set(available);
        }
    });

    let mut handles = Vec::new();
    for p in 0..producers {
        let rb = rb.clone();
        handles.push(thread::spawn(move || {
            for i in 0..events_per_producer {
                rb.publish_event(move |slot: &mut u64, _seq: i64| *slot = p * events_per_producer + i);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    consumer.join().unwrap();
    total
}

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_claim_publish");
    for events in [10_000u64, 100_000] {
        group.throughput(Throughput::Elements(events));
        group.bench_with_input(BenchmarkId::from_parameter(events), &events, |b, &events| {
            b.iter(|| single_producer_single_consumer(events));
        });
    }
    group.finish();
}

fn bench_mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc_claim_publish");
    for producers in [2u64, 4] {
        let events_per_producer = 25_000u64;
        group.throughput(Throughput::Elements(events_per_producer * producers));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| multi_producer_contention(events_per_producer, producers));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_spsc, bench_mpsc);
criterion_main!(benches);
