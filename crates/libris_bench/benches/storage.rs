//! Table persistence benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use libris_bench::{populated_library, simulate_history};
use libris_core::{Config, LibraryService, Persistence, SequentialIdGenerator, TablePersistence};
use libris_storage::{FileBackend, InMemoryBackend};
use tempfile::tempdir;

/// Benchmark writing all four tables to memory and to disk.
fn bench_save_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_tables");

    for count in [100, 1000].iter() {
        let (mut library, books, users) = populated_library(*count, *count / 10);
        simulate_history(&mut library, &books, &users, 5);
        let catalog = library.catalog().clone();

        group.bench_with_input(BenchmarkId::new("memory", count), &catalog, |b, catalog| {
            let mut persistence = TablePersistence::new(InMemoryBackend::new());
            b.iter(|| {
                persistence.save_books(catalog).unwrap();
                persistence.save_users(catalog).unwrap();
                persistence.save_loans(catalog).unwrap();
                persistence.save_waitlists(catalog).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("file", count), &catalog, |b, catalog| {
            let dir = tempdir().unwrap();
            let backend = FileBackend::open(dir.path()).unwrap().with_extension("json");
            let mut persistence = TablePersistence::new(backend);
            b.iter(|| {
                persistence.save_books(catalog).unwrap();
                persistence.save_users(catalog).unwrap();
                persistence.save_loans(catalog).unwrap();
                persistence.save_waitlists(catalog).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark opening a catalog, which reloads tables and rebuilds indexes.
fn bench_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("open");

    for count in [100, 1000].iter() {
        let (mut library, books, users) = populated_library(*count, *count / 10);
        simulate_history(&mut library, &books, &users, 5);
        let backend = InMemoryBackend::new();
        let mut persistence = TablePersistence::new(backend.clone());
        let catalog = library.catalog();
        persistence.save_books(catalog).unwrap();
        persistence.save_users(catalog).unwrap();
        persistence.save_loans(catalog).unwrap();
        persistence.save_waitlists(catalog).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &backend, |b, backend| {
            b.iter(|| {
                LibraryService::open(
                    Config::default(),
                    TablePersistence::new(backend.clone()),
                    SequentialIdGenerator::new(),
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_save_tables, bench_open);
criterion_main!(benches);
