use criterion::{criterion_group, Criterion};

use crate::benchmarks::benchtemplate::WorkloadTemplate;

fn bench_run_single_chunk(c: &mut Criterion) {
    let mut bt = WorkloadTemplate::new(10, 25, 1);
    bt.bench_workload(c, "run_single_chunk");
}

fn bench_run_many_chunks(c: &mut Criterion) {
    let mut bt = WorkloadTemplate::new(50, 5, 1);
    bt.bench_workload(c, "run_many_chunks");
}

fn bench_run_repeated(c: &mut Criterion) {
    let mut bt = WorkloadTemplate::new(20, 5, 3);
    bt.bench_workload(c, "run_repeated");
}

criterion_group! {
    name = runbench;
    config = Criterion::default().sample_size(10);
    targets = bench_run_single_chunk, bench_run_many_chunks, bench_run_repeated
}
