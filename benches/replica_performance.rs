//! Replica performance benchmarks
//!
//! Exercises the two hot paths a host application hits on every
//! invocation: replaying the operation log into task state and rebuilding
//! the working set (§4.6).

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use replitask::{Configuration, Replica, TaskEdits, TaskStatus};

fn open_bench_replica(n_tasks: usize) -> Replica {
    let dir = tempfile::tempdir().unwrap().into_path();
    let replica = Replica::open(Configuration::new(dir)).unwrap();
    for i in 0..n_tasks {
        let task = replica.new_task(TaskStatus::Pending, format!("task {i}")).unwrap();
        replica.modify(task.uuid(), TaskEdits::new().project("bench").add_tag("generated")).unwrap();
    }
    replica
}

fn benchmark_all_tasks(c: &mut Criterion) {
    let replica = open_bench_replica(500);
    c.bench_function("all_tasks_500", |b| {
        b.iter(|| black_box(replica.all_tasks().unwrap()));
    });
}

fn benchmark_rebuild_working_set(c: &mut Criterion) {
    let replica = open_bench_replica(500);
    c.bench_function("rebuild_working_set_500", |b| {
        b.iter(|| {
            replica.rebuild_working_set(true).unwrap();
            black_box(replica.working_set_len().unwrap())
        });
    });
}

criterion_group!(benches, benchmark_all_tasks, benchmark_rebuild_working_set);
criterion_main!(benches);
