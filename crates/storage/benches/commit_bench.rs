//! Benchmarks for store commits and handler dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lookout_core::{Row, Value};
use lookout_storage::{observer_fn, Store, TableSchema};

fn populated_store(rows: u64) -> Store {
    let store = Store::in_memory();
    store
        .create_table(TableSchema::new("quotes", ["id", "price", "symbol"]))
        .unwrap();
    store
        .write(|tx| {
            for i in 1..=rows {
                tx.insert("quotes", quote(i, 100.0))?;
            }
            Ok(())
        })
        .unwrap();
    store
}

fn quote(id: u64, price: f64) -> Row {
    Row::new(
        id,
        vec![
            Value::Int64(id as i64),
            Value::Float64(price),
            Value::String(format!("SYM{}", id)),
        ],
    )
}

/// Single-row update commits as the table grows
fn commit_update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_update");

    for rows in [100u64, 1_000, 10_000] {
        let store = populated_store(rows);
        let mut price = 100.0;
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            b.iter(|| {
                price += 0.01;
                store
                    .write(|tx| tx.update("quotes", quote(black_box(rows / 2), price)))
                    .unwrap()
            })
        });
    }

    group.finish();
}

/// Commit cost with an increasing number of registered handlers
fn commit_dispatch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_dispatch");

    for handlers in [0usize, 10, 100] {
        let store = populated_store(1_000);
        let subscriptions: Vec<_> = (0..handlers)
            .map(|_| {
                store
                    .on_commit(observer_fn(|commit| {
                        black_box(commit.changes().len());
                    }))
                    .unwrap()
            })
            .collect();
        let mut price = 100.0;

        group.bench_with_input(
            BenchmarkId::new("handlers", handlers),
            &handlers,
            |b, _| {
                b.iter(|| {
                    price += 0.01;
                    store.write(|tx| tx.update("quotes", quote(1, price))).unwrap()
                })
            },
        );
        drop(subscriptions);
    }

    group.finish();
}

criterion_group!(benches, commit_update_benchmark, commit_dispatch_benchmark);
criterion_main!(benches);
