//! Criterion micro-benchmarks for the wire decoder.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use strand_arena::Arena;
use strand_bench::{person_payload, scalar_payload, tree_payload};
use strand_codec::{DecodeOptions, Decoder};
use strand_test_utils::fixtures;

/// Benchmark: decode a Person with 32 phones/tags/scores.
fn bench_decode_person(c: &mut Criterion) {
    let f = fixtures::standard();
    let input = person_payload(32);
    let decoder = Decoder::new(&f.schema);
    let mut arena = Arena::new();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("person_32", |b| {
        b.iter(|| {
            arena.reset();
            black_box(decoder.decode(black_box(&input), f.person, &mut arena).unwrap());
        });
    });

    let shared = bytes::Bytes::from(input.clone());
    let aliasing = Decoder::new(&f.schema).with_options(DecodeOptions::default().with_alias(true));
    group.bench_function("person_32_alias", |b| {
        b.iter(|| {
            arena.reset();
            black_box(aliasing.decode_shared(&shared, f.person, &mut arena).unwrap());
        });
    });
    group.finish();
}

/// Benchmark: decode every scalar type once.
fn bench_decode_scalars(c: &mut Criterion) {
    let f = fixtures::standard();
    let input = scalar_payload();
    let decoder = Decoder::new(&f.schema);
    let mut arena = Arena::new();

    c.bench_function("decode_scalars", |b| {
        b.iter(|| {
            arena.reset();
            black_box(decoder.decode(black_box(&input), f.scalars, &mut arena).unwrap());
        });
    });
}

/// Benchmark: decode a 4-ary tree of depth 5 (1365 nodes).
fn bench_decode_tree(c: &mut Criterion) {
    let f = fixtures::standard();
    let input = tree_payload(5, 4);
    let decoder = Decoder::new(&f.schema);
    let mut arena = Arena::new();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("tree_d5_f4", |b| {
        b.iter(|| {
            arena.reset();
            black_box(decoder.decode(black_box(&input), f.node, &mut arena).unwrap());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_decode_person,
    bench_decode_scalars,
    bench_decode_tree
);
criterion_main!(benches);
