use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gaitfog::optimize::reduce_memory_usage;
use gaitfog::table::{Column, ColumnData, Table};

const ROW_COUNT: usize = 100_000;

/// Synthetic recording shaped like a defog file before optimization.
fn sensor_table() -> Table {
    let wave = |phase: f64| -> Vec<f64> {
        (0..ROW_COUNT)
            .map(|i| ((i as f64) * 0.01 + phase).sin())
            .collect()
    };
    let flag = |period: usize| -> Vec<i64> {
        (0..ROW_COUNT).map(|i| i64::from(i % period == 0)).collect()
    };
    Table::new(vec![
        Column::new("Time", ColumnData::Int64((0..ROW_COUNT as i64).collect())),
        Column::new("AccV", ColumnData::Float64(wave(0.0))),
        Column::new("AccML", ColumnData::Float64(wave(1.0))),
        Column::new("AccAP", ColumnData::Float64(wave(2.0))),
        Column::new("StartHesitation", ColumnData::Int64(flag(97))),
        Column::new("Turn", ColumnData::Int64(flag(13))),
        Column::new("Walking", ColumnData::Int64(flag(29))),
        Column::new(
            "Valid",
            ColumnData::Bool((0..ROW_COUNT).map(|i| i % 7 != 0).collect()),
        ),
        Column::new(
            "file",
            ColumnData::Text(
                (0..ROW_COUNT)
                    .map(|i| Some(format!("rec{}", i / 10_000)))
                    .collect(),
            ),
        ),
    ])
    .expect("sensor table")
}

fn bench_reduce_memory(c: &mut Criterion) {
    let table = sensor_table();
    c.bench_with_input(
        BenchmarkId::new("reduce_memory_usage", ROW_COUNT),
        &table,
        |b, table| {
            b.iter(|| reduce_memory_usage(black_box(table)));
        },
    );
}

criterion_group!(benches, bench_reduce_memory);
criterion_main!(benches);
