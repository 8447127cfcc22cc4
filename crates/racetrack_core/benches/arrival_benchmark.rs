//! Benchmark for arrival register contention.
//!
//! Run with: cargo bench --package racetrack_core --bench arrival_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use racetrack_core::{ArrivalRegister, CancelToken, PauseGate, RaceConfig, RaceCoordinator};
use std::sync::{Arc, Barrier};
use std::thread;

fn benchmark_uncontended_rank(c: &mut Criterion) {
    let register = ArrivalRegister::new();

    c.bench_function("take_next_rank_uncontended", |b| {
        b.iter(|| black_box(register.take_next_rank()));
    });
}

fn benchmark_contended_ranks(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_arrivals");

    for threads in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let register = Arc::new(ArrivalRegister::with_capacity(threads));
                let barrier = Arc::new(Barrier::new(threads));
                let handles: Vec<_> = (0..threads)
                    .map(|lane| {
                        let register = Arc::clone(&register);
                        let barrier = Arc::clone(&barrier);
                        thread::spawn(move || {
                            barrier.wait();
                            let rank = register.take_next_rank();
                            register.record_arrival(lane, rank);
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
                black_box(register.winner())
            });
        });
    }

    group.finish();
}

fn benchmark_open_gate(c: &mut Criterion) {
    let gate = PauseGate::new();
    let token = CancelToken::new();

    c.bench_function("await_if_paused_open", |b| {
        b.iter(|| black_box(gate.await_if_paused(&token)));
    });
}

fn benchmark_full_race(c: &mut Criterion) {
    let coordinator = RaceCoordinator::new(RaceConfig {
        step_interval_ms: 0,
        ..RaceConfig::default()
    });

    c.bench_function("race_8_lanes_100_steps", |b| {
        b.iter(|| black_box(coordinator.run_race(8, 100).unwrap()));
    });
}

criterion_group!(
    benches,
    benchmark_uncontended_rank,
    benchmark_contended_ranks,
    benchmark_open_gate,
    benchmark_full_race
);
criterion_main!(benches);
