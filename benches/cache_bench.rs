//! Benchmarks for the two interesting acquire paths: a hit on a resident
//! block, and a miss that has to run the cross-shard victim scan.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use shardcache::{BlockCache, BlockId, MemDevice, DEFAULT_NBUCKET};

fn bench_acquire_hit(c: &mut Criterion) {
    let cache = BlockCache::new(64, DEFAULT_NBUCKET, MemDevice::new());
    drop(cache.acquire(BlockId::new(0, 1)).unwrap());

    c.bench_function("acquire_hit", |b| {
        b.iter(|| {
            let guard = cache.acquire(black_box(BlockId::new(0, 1))).unwrap();
            black_box(guard.as_slice()[0]);
        })
    });
}

fn bench_acquire_miss_with_eviction(c: &mut Criterion) {
    // Small pool, ever-growing block numbers: every acquire is a miss and
    // most run the eviction scan.
    let cache = BlockCache::new(8, 3, MemDevice::new());
    let mut n = 0u32;

    c.bench_function("acquire_miss_evict", |b| {
        b.iter(|| {
            n = n.wrapping_add(1);
            let guard = cache.acquire(black_box(BlockId::new(0, n))).unwrap();
            black_box(guard.as_slice()[0]);
        })
    });
}

criterion_group!(benches, bench_acquire_hit, bench_acquire_miss_with_eviction);
criterion_main!(benches);
