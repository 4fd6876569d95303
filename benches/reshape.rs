use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hydat::{reshape, Cell, ColumnSpec, Subfield, WideRow};

fn daily_rows(count: usize) -> Vec<WideRow> {
    (0..count)
        .map(|i| {
            let mut row = WideRow::new()
                .with("STATION_NUMBER", format!("08MF{:03}", i % 50))
                .with("YEAR", 1950 + (i / 12) as i64)
                .with("MONTH", 1 + (i % 12) as i64);
            for day in 1..=31 {
                row.insert(format!("FLOW{}", day), Cell::Float(day as f64 * 1.5));
                row.insert(format!("FLOW_SYMBOL{}", day), Cell::Null);
            }
            row
        })
        .collect()
}

fn bench_reshape(c: &mut Criterion) {
    let rows = daily_rows(1200);
    let spec = ColumnSpec::day_columns("FLOW", &[Subfield::Value, Subfield::Symbol]);
    let ids = ["STATION_NUMBER", "YEAR", "MONTH"];
    c.bench_function("reshape_daily_flows", |b| {
        b.iter(|| reshape(black_box(&rows), &ids, &spec))
    });
    c.bench_function("column_spec_from_names", |b| {
        b.iter(|| ColumnSpec::from_column_names(black_box(rows[0].columns()), &ids))
    });
}

criterion_group!(benches, bench_reshape);
criterion_main!(benches);
