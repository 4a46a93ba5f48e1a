//! # CSIS Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | RSI | generate, resolve against a list of known sets |
//! | Lock | evaluate a write |
//! | Registry | subscriber scan at capacity |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use csis_server::domain::{ClientRegistry, LockManager};
use csis_server::{RsiCodec, Sirk};
use csis_types::{Characteristic, ConnectionId, PeerAddress, ServiceHandle};
use std::time::Duration;

// ============================================================================
// RSI
// ============================================================================

fn bench_rsi(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsi");
    group.measurement_time(Duration::from_secs(5));

    let codec = RsiCodec::new();
    let sirk = Sirk::from_le_bytes(rand::random());

    group.bench_function("generate", |b| b.iter(|| black_box(codec.generate(&sirk))));

    let rsi = codec.generate(&sirk);
    group.bench_function("resolve_match", |b| {
        b.iter(|| black_box(codec.resolve(&rsi, &sirk)))
    });

    // A scanner checks every advertiser against each set it knows
    for known_sets in [1usize, 8, 32] {
        let sirks: Vec<Sirk> = (0..known_sets)
            .map(|_| Sirk::from_le_bytes(rand::random()))
            .collect();

        group.throughput(Throughput::Elements(known_sets as u64));
        group.bench_with_input(
            BenchmarkId::new("resolve_scan", known_sets),
            &sirks,
            |b, sirks| b.iter(|| black_box(sirks.iter().any(|s| codec.resolve(&rsi, s)))),
        );
    }

    group.finish();
}

// ============================================================================
// LOCK
// ============================================================================

fn bench_lock(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock");

    let mut manager = LockManager::new(60);
    let owner = Some(PeerAddress::public([1, 2, 3, 4, 5, 6]));
    let _ = manager.write(ServiceHandle(1), ConnectionId(1), owner, &[1]);

    let other = Some(PeerAddress::public([6, 5, 4, 3, 2, 1]));
    group.bench_function("evaluate_denied", |b| {
        b.iter(|| black_box(manager.evaluate_write(ConnectionId(2), other, &[1])))
    });
    group.bench_function("evaluate_reconnect", |b| {
        b.iter(|| black_box(manager.evaluate_write(ConnectionId(3), owner, &[1])))
    });

    group.finish();
}

// ============================================================================
// REGISTRY
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    for capacity in [3usize, 16, 64] {
        let mut registry = ClientRegistry::new(capacity);
        for i in 1..=capacity {
            let connection = ConnectionId(i as u32);
            registry.add_client(connection);
            if i % 2 == 0 {
                let _ = registry.set_notify_flag(connection, Characteristic::Sirk, &[1, 0]);
            }
        }

        group.bench_with_input(
            BenchmarkId::new("subscribed_scan", capacity),
            &registry,
            |b, registry| b.iter(|| black_box(registry.subscribed(Characteristic::Sirk).count())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_rsi, bench_lock, bench_registry);
criterion_main!(benches);
