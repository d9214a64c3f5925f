//! Index structure benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use libris_bench::{random_title, rng};
use libris_core::index::{OrderedKeyIndex, PrefixIndex};
use libris_core::BookId;
use rand::Rng;

/// Benchmark indexing titles into the prefix trie.
fn bench_prefix_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("prefix_insert");

    for count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut rng = rng();
            let titles: Vec<_> = (0..count)
                .map(|n| (random_title(&mut rng), BookId::new(format!("B{n}"))))
                .collect();

            b.iter(|| {
                let mut index = PrefixIndex::new();
                for (title, id) in &titles {
                    index.index_term(black_box(title), id);
                }
                black_box(index.term_count());
            });
        });
    }
    group.finish();
}

/// Benchmark prefix lookups of growing length.
fn bench_prefix_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("prefix_search");

    let mut rng = rng();
    let mut index = PrefixIndex::new();
    for n in 0..10000 {
        index.index_term(&random_title(&mut rng), &BookId::new(format!("B{n}")));
    }

    for prefix in ["a", "co", "dra", "lunmor"].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(prefix), prefix, |b, prefix| {
            b.iter(|| {
                let terms = index.prefix_search(black_box(prefix));
                black_box(terms);
            });
        });
    }
    group.finish();
}

/// Benchmark ordered index inserts in ascending and random key order.
fn bench_ordered_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_insert");

    for count in [1000, 10000].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        let ascending: Vec<i64> = (1..=*count as i64).collect();
        let mut rng = rng();
        let random: Vec<i64> = (0..*count).map(|_| rng.gen_range(1..1_000_000)).collect();

        for (name, keys) in [("ascending", ascending), ("random", random)] {
            group.bench_with_input(BenchmarkId::new(name, count), &keys, |b, keys| {
                b.iter(|| {
                    let mut index = OrderedKeyIndex::new();
                    for key in keys {
                        index.insert(*key, BookId::new("B"));
                    }
                    black_box(index.height());
                });
            });
        }
    }
    group.finish();
}

/// Benchmark in-order traversal.
fn bench_ordered_scan(c: &mut Criterion) {
    let mut index = OrderedKeyIndex::new();
    for key in 1..=10000 {
        index.insert(key, BookId::new(format!("B{key}")));
    }

    c.bench_function("ordered_scan_10000", |b| {
        b.iter(|| black_box(index.in_order()));
    });
}

criterion_group!(
    benches,
    bench_prefix_insert,
    bench_prefix_search,
    bench_ordered_insert,
    bench_ordered_scan,
);
criterion_main!(benches);
