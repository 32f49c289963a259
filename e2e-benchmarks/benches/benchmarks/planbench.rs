use common::testutil::sample_plan;
use criterion::{black_box, criterion_group, Criterion};
use queryexe::query::plan::{extract_hint, extract_timings};
use serde_json::Value;

fn nested_plan(depth: usize) -> Value {
    let mut plan = sample_plan(1234.5, 12.25, Some("3"));
    let mut node = serde_json::json!({"Node Type": "Seq Scan", "Relation Name": "title"});
    for _ in 0..depth {
        node = serde_json::json!({"Node Type": "Hash Join", "Plans": [node.clone(), node]});
    }
    plan[0]["Plan"] = node;
    plan
}

fn bench_extract_small(c: &mut Criterion) {
    let plan = nested_plan(1);
    c.bench_function("extract_small", |b| {
        b.iter(|| {
            let timings = extract_timings(black_box(&plan));
            let hint = extract_hint(black_box(&plan));
            (timings, hint)
        })
    });
}

fn bench_extract_deep(c: &mut Criterion) {
    let plan = nested_plan(10);
    c.bench_function("extract_deep", |b| {
        b.iter(|| {
            let timings = extract_timings(black_box(&plan));
            let hint = extract_hint(black_box(&plan));
            (timings, hint)
        })
    });
}

criterion_group!(planbench, bench_extract_small, bench_extract_deep);
