//! Criterion benchmarks for rank/select operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use trie_substrate::{BitVector, BuildFlags, Mapper, PopCount};

/// Generate a built bit vector with specified size and density.
fn generate_bit_vector(size: usize, density: f64, seed: u64) -> BitVector<'static> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bv = BitVector::new();
    bv.extend_bits((0..size).map(|_| rng.gen_bool(density))).unwrap();
    bv.build(BuildFlags::SELECT_1 | BuildFlags::SELECT_0).unwrap();
    bv
}

/// Generate random query positions.
fn generate_queries(count: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(0..max)).collect()
}

fn label(size: usize, density: f64) -> String {
    format!("{:.0}M/{:.0}%", size as f64 / 1e6, density * 100.0)
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_1");

    for size in [1_000_000, 10_000_000] {
        for density in [0.01, 0.1, 0.5, 0.9] {
            let bv = generate_bit_vector(size, density, 42);
            let queries = generate_queries(10000, size, 123);

            group.bench_with_input(
                BenchmarkId::new(label(size, density), ""),
                &(&bv, &queries),
                |b, (bv, queries)| {
                    b.iter(|| {
                        let mut sum = 0usize;
                        for &q in queries.iter() {
                            sum += bv.rank_1(black_box(q));
                        }
                        sum
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for size in [1_000_000, 10_000_000] {
        for density in [0.1, 0.5, 0.9] {
            let bv = generate_bit_vector(size, density, 42);
            let ones = generate_queries(10000, bv.num_1s(), 123);
            let zeros = generate_queries(10000, bv.num_0s(), 321);

            group.bench_with_input(
                BenchmarkId::new("select_1", label(size, density)),
                &(&bv, &ones),
                |b, (bv, queries)| {
                    b.iter(|| {
                        let mut sum = 0usize;
                        for &q in queries.iter() {
                            sum += bv.select_1(black_box(q)).unwrap_or(0);
                        }
                        sum
                    })
                },
            );
            group.bench_with_input(
                BenchmarkId::new("select_0", label(size, density)),
                &(&bv, &zeros),
                |b, (bv, queries)| {
                    b.iter(|| {
                        let mut sum = 0usize;
                        for &q in queries.iter() {
                            sum += bv.select_0(black_box(q)).unwrap_or(0);
                        }
                        sum
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for size in [1_000_000usize, 10_000_000] {
        let bits: Vec<bool> = (0..size)
            .map(|i| (i as u64).wrapping_mul(0x1234_5678_9ABC_DEF0) >> 63 == 1)
            .collect();

        for (name, flags) in [
            ("rank", BuildFlags::RANK),
            ("rank+select", BuildFlags::all()),
        ] {
            group.bench_with_input(
                BenchmarkId::new(name, format!("{:.0}M", size as f64 / 1e6)),
                &bits,
                |b, bits| {
                    b.iter(|| {
                        let mut bv = BitVector::new();
                        bv.extend_bits(black_box(bits).iter().copied()).unwrap();
                        bv.build(flags).unwrap();
                        bv
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    let bv = generate_bit_vector(10_000_000, 0.5, 7);
    let mut bytes = Vec::<u8>::new();
    bv.write(&mut bytes).unwrap();
    // 8-byte aligned copy so packs are borrowed in place.
    let mut words = vec![0u64; bytes.len().div_ceil(8)];
    bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(&bytes);

    group.bench_function("read_10M", |b| {
        b.iter(|| BitVector::read(&mut black_box(bytes.as_slice())).unwrap())
    });
    group.bench_function("map_10M", |b| {
        b.iter(|| {
            let mapper = Mapper::from_bytes(bytemuck::cast_slice(&words)).unwrap();
            BitVector::map(&mapper).unwrap().size()
        })
    });
    group.finish();
}

/// Benchmark popcount performance.
///
/// Run with different features to compare:
/// - Default: `cargo bench --bench rank_select popcount`
/// - Portable: `cargo bench --bench rank_select popcount --features portable-popcount`
fn bench_popcount(c: &mut Criterion) {
    let mut group = c.benchmark_group("popcount");

    let words: Vec<u64> = (0u64..156250) // ~10M bits
        .map(|i| i.wrapping_mul(0x1234_5678_9ABC_DEF0))
        .collect();

    group.bench_function("10M_bits_words", |b| {
        b.iter(|| trie_substrate::popcount_words(black_box(&words)))
    });

    group.bench_function("10M_bits_prefixes", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for &w in words.iter() {
                sum = sum.wrapping_add(PopCount::new(black_box(w)).prefix_count(3));
            }
            sum
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_rank,
    bench_select,
    bench_construction,
    bench_load,
    bench_popcount
);
criterion_main!(benches);
