use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use ontree_core::{MatchKey, MeasurementRow, MeasurementTable, Ontology, aggregate, annotate};
use serde_json::{Value, json};

fn synthetic_tree(depth: usize, fanout: usize, prefix: &str) -> Value {
    if depth == 0 {
        return json!({ "name": prefix });
    }
    let children: Vec<Value> = (0..fanout)
        .map(|i| synthetic_tree(depth - 1, fanout, &format!("{prefix}.{i}")))
        .collect();
    json!({ "name": prefix, "children": children })
}

fn fixtures() -> Vec<(&'static str, Ontology, MeasurementTable)> {
    let mut out = Vec::new();
    for (name, depth, fanout) in [("small", 3, 4), ("medium", 5, 4), ("wide", 3, 12)] {
        let ontology = Ontology::from_value(&synthetic_tree(depth, fanout, "n")).unwrap();
        let rows: Vec<MeasurementRow> = ontology
            .ids()
            .filter(|&id| !ontology[id].has_children())
            .step_by(3)
            .enumerate()
            .map(|(i, id)| MeasurementRow {
                group_value: ontology[id].name().to_string(),
                group_size: 10.0 + i as f64,
                matched_size: (i % 7) as f64,
                occurrence_fraction: 0.01 * (i % 50) as f64,
                metadata_column: "sample_type".to_string(),
            })
            .collect();
        out.push((name, ontology, MeasurementTable::from_rows(rows)));
    }
    out
}

fn bench_aggregate(c: &mut Criterion) {
    let key = MatchKey::default();
    let mut group = c.benchmark_group("aggregate");
    for (name, ontology, table) in fixtures() {
        group.bench_function(name, |b| {
            b.iter_batched(
                || ontology.clone(),
                |mut tree| aggregate(&mut tree, &table, &key),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_annotate(c: &mut Criterion) {
    let key = MatchKey::default();
    let mut group = c.benchmark_group("annotate");
    for (name, ontology, table) in fixtures() {
        group.bench_function(name, |b| {
            b.iter_batched(
                || ontology.clone(),
                |mut tree| annotate(&mut tree, &table, &key),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_annotate);
criterion_main!(benches);
