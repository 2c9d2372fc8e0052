#[macro_use]
extern crate criterion;

use anchordb_accumulator::{Hash, HashAccumulator, PathTracker};
use criterion::{BenchmarkId, Criterion};

fn leaf(i: u64) -> Hash {
    Hash::digest(&i.to_be_bytes())
}

fn prepare(count: u64) -> HashAccumulator {
    let mut acc = HashAccumulator::new();
    for i in 0..count {
        acc.append(leaf(i));
    }
    acc.clear_hash_list();
    acc
}

fn bench(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("accumulator append");
        for size in [1_000u64, 10_000, 100_000] {
            group.bench_with_input(BenchmarkId::new("leaves", size), &size, |b, &size| {
                b.iter(|| prepare(size));
            });
        }
    }

    c.bench_function("accumulator marshal round trip", |b| {
        let acc = prepare(100_000);
        b.iter(|| HashAccumulator::unmarshal(&acc.marshal()).expect("unmarshal"));
    });

    c.bench_function("accumulator tracked path", |b| {
        let base = prepare(4_096);
        b.iter(|| {
            let mut acc = base.clone();
            let mut tracker = PathTracker::new(leaf(4_096));
            for i in 4_096..5_120 {
                acc.append_tracking(leaf(i), &mut tracker);
            }
            acc.fold_tracking(&mut tracker).expect("fold")
        });
    });
}

criterion_group!(benches, bench);
criterion_main!(benches);
