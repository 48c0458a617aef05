use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use graphlet_adapters::LocalEngine;
use graphlet_engine::LeaseManager;
use tempfile::TempDir;

const RANGE: u64 = 64;

fn lease(c: &mut Criterion) {
    let mut group = c.benchmark_group("lease");
    for batch in [100u64, 10_000] {
        let harness = LeaseHarness::new(batch);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("next_uid", batch), &batch, |b, _| {
            b.iter(|| black_box(harness.leases.next_uid().expect("uid")));
        });
        group.bench_with_input(BenchmarkId::new("next_ts", batch), &batch, |b, _| {
            b.iter(|| black_box(harness.leases.next_ts().expect("ts")));
        });
        group.throughput(Throughput::Elements(RANGE));
        group.bench_with_input(BenchmarkId::new("next_uids", batch), &batch, |b, _| {
            b.iter(|| black_box(harness.leases.next_uids(RANGE, false).expect("range")));
        });
    }
    group.finish();
}

/// Leases against a WAL-backed engine so batch extensions hit the disk.
struct LeaseHarness {
    _tmpdir: TempDir,
    leases: LeaseManager,
}

impl LeaseHarness {
    fn new(batch: u64) -> Self {
        let tmpdir = tempfile::tempdir().expect("tmpdir");
        let engine = LocalEngine::open(tmpdir.path()).expect("engine");
        let leases = LeaseManager::open(Arc::new(engine), batch, batch).expect("leases");
        Self {
            _tmpdir: tmpdir,
            leases,
        }
    }
}

criterion_group!(benches, lease);
criterion_main!(benches);
