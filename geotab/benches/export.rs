//! Benchmarks pour la normalisation et l'export

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geotab::{export_to_writer, normalize, Cell, Column, ColumnType, ExportFormat, ExportOptions, ResultSet};
use serde_json::json;

fn synthetic(rows: usize) -> ResultSet {
    let columns = vec![
        Column::new("id", ColumnType::Real),
        Column::new("name", ColumnType::Text),
        Column::new("area", ColumnType::Real),
        Column::new("geometry", ColumnType::Json),
    ];
    let data = (0..rows)
        .map(|i| {
            vec![
                Cell::Float(i as f64),
                Cell::Text(format!("parcelle-{}", i)),
                Cell::Float(i as f64 * 0.37),
                Cell::Json(json!({"type": "Point", "coordinates": [5.0 + i as f64 * 1e-4, 45.0]})),
            ]
        })
        .collect();
    ResultSet::with_rows(columns, data)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for rows in [1_000usize, 10_000] {
        let data = synthetic(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| black_box(normalize(data.clone())))
        });
    }
    group.finish();
}

fn bench_formats(c: &mut Criterion) {
    let data = synthetic(10_000);
    let options = ExportOptions::new();

    let mut group = c.benchmark_group("export_10k");
    group.throughput(Throughput::Elements(data.row_count() as u64));
    for format in ExportFormat::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(format), &format, |b, format| {
            b.iter(|| {
                let mut out = Vec::with_capacity(1 << 20);
                export_to_writer(black_box(&data), *format, &mut out, &options).unwrap();
                black_box(out)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_formats);
criterion_main!(benches);
