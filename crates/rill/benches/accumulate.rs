// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accumulator hot-path benchmarks.
//!
//! The record path runs once per measured iteration in every driver
//! loop; the median path runs once per report window over the retained
//! samples.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rill::{SequenceMonitor, TimeStats};

fn bench_record(c: &mut Criterion) {
    c.bench_function("time_stats_record", |b| {
        let mut stats = TimeStats::new();
        let mut v = 0u64;
        b.iter(|| {
            // Bound the retained sample list across iterations.
            if stats.count() == 1_000_000 {
                stats.reset();
            }
            v = v.wrapping_add(37) % 10_000;
            stats.record(black_box(v));
        });
    });
}

fn bench_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_stats_median");
    for size in [100usize, 1_000, 10_000] {
        let mut stats = TimeStats::new();
        let mut v = 0u64;
        for _ in 0..size {
            v = v.wrapping_add(7919) % 100_000;
            stats.record(v);
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &stats, |b, stats| {
            b.iter(|| black_box(stats.median()));
        });
    }
    group.finish();
}

fn bench_sequence_observe(c: &mut Criterion) {
    c.bench_function("sequence_observe", |b| {
        let mut monitor = SequenceMonitor::new();
        let mut seq = 0u64;
        b.iter(|| {
            seq += 1;
            monitor.observe(black_box(seq));
        });
    });
}

criterion_group!(benches, bench_record, bench_median, bench_sequence_observe);
criterion_main!(benches);
