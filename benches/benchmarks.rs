//! Criterion benchmarks for columnar-exec core operations.
//!
//! Benchmarks cover:
//! - Key hashing throughput (hash32 / hash64)
//! - Column write + typed extraction round trip
//! - The three join strategies over multi-page key columns

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use colex::exec::column::{Column, FixedColumnBuilder};
use colex::exec::executor::{execute, Context, JoinStrategy};
use colex::exec::hash::{hash32, hash64};
use colex::exec::plan::Plan;
use colex::exec::reader::extract;
use colex::exec::types::DataType;

const JOIN_ROWS: usize = 100_000;
const KEY_DOMAIN: i32 = 20_000;

/// Deterministic pseudo-random keys with ~5% nulls.
fn synthetic_keys(len: usize) -> Vec<Option<i32>> {
    let mut state = 0x2545_F491u32;
    (0..len)
        .map(|_| {
            // xorshift32 keeps the bench input reproducible.
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if state % 20 == 0 {
                None
            } else {
                Some((state % KEY_DOMAIN as u32) as i32)
            }
        })
        .collect()
}

fn int_column(values: &[Option<i32>]) -> Column {
    let mut builder = FixedColumnBuilder::<i32>::new();
    for v in values {
        builder.push(*v);
    }
    builder.finish()
}

fn join_plan(rows: usize) -> Plan {
    let keys = synthetic_keys(rows);
    let table = colex::ColumnarTable {
        num_rows: rows,
        columns: vec![int_column(&keys)],
    };
    let mut plan = Plan::new();
    plan.inputs.push(table.clone());
    plan.inputs.push(table);
    let left = plan.add_scan(0, vec![(0, DataType::Int32)]);
    let right = plan.add_scan(1, vec![(0, DataType::Int32)]);
    plan.root = plan.add_join(
        true,
        left,
        right,
        0,
        0,
        vec![(0, DataType::Int32), (1, DataType::Int32)],
    );
    plan
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("hash32_10k", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for key in 0..10_000u32 {
                acc ^= hash32(black_box(key));
            }
            acc
        })
    });
    group.bench_function("hash64_10k", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for key in 0..10_000u64 {
                acc ^= hash64(black_box(key));
            }
            acc
        })
    });
    group.finish();
}

fn bench_codec_roundtrip(c: &mut Criterion) {
    let keys = synthetic_keys(JOIN_ROWS);
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(JOIN_ROWS as u64));
    group.bench_function("write_100k_i32", |b| {
        b.iter(|| int_column(black_box(&keys)))
    });
    let column = int_column(&keys);
    group.bench_function("extract_100k_i32", |b| {
        b.iter(|| extract::<i32>(black_box(&column), JOIN_ROWS).unwrap())
    });
    group.finish();
}

fn bench_join_strategies(c: &mut Criterion) {
    let plan = join_plan(JOIN_ROWS);
    let mut group = c.benchmark_group("join");
    group.sample_size(10);
    group.throughput(Throughput::Elements(JOIN_ROWS as u64));
    for (name, ctx) in [
        ("simple", Context::sequential(JoinStrategy::Simple)),
        ("unchained", Context::sequential(JoinStrategy::Unchained)),
        ("partitioned", Context::new()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &ctx, |b, ctx| {
            b.iter(|| execute(black_box(&plan), ctx).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_hashing,
    bench_codec_roundtrip,
    bench_join_strategies
);
criterion_main!(benches);
