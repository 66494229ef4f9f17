use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use ringlog_store::{HeapStore, MappedStore};

const PAYLOAD: &[u8] = b"The cat went up the hill. The cat went up the hill.";

fn bench_heap_insert(c: &mut Criterion) {
    let store = HeapStore::new(2_000_000);
    let mut seq = 0i64;

    let mut group = c.benchmark_group("heap");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert", |b| {
        b.iter(|| {
            store.insert(black_box(PAYLOAD), seq).unwrap();
            seq += 1;
        });
    });
}

fn bench_heap_get(c: &mut Criterion) {
    let store = HeapStore::new(2_000_000);
    for seq in 0..20_000 {
        store.insert(PAYLOAD, seq).unwrap();
    }

    let mut group = c.benchmark_group("heap");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get (newest)", |b| {
        b.iter(|| black_box(store.get(black_box(19_999))));
    });
    group.bench_function("get (8 back)", |b| {
        b.iter(|| black_box(store.get(black_box(19_991))));
    });
    group.bench_function("get (miss)", |b| {
        b.iter(|| black_box(store.get(black_box(-1))));
    });
}

fn bench_mapped_insert(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = MappedStore::create(1_000_000, dir.path().join("bench.ring"), "bench")
        .expect("failed to create mapped store");
    let mut seq = 0i64;

    let mut group = c.benchmark_group("mapped");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert", |b| {
        b.iter(|| {
            store.insert(black_box(PAYLOAD), seq).unwrap();
            seq += 1;
        });
    });

    drop(group);
    drop(store);
}

fn bench_mapped_recover(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("recover.ring");
    {
        let store = MappedStore::create(1_000_000, &path, "recover").expect("create");
        // Most of one pass, so the scan walks nearly the whole file.
        for seq in 0..13_000 {
            store.insert(PAYLOAD, seq).unwrap();
        }
    }

    let mut group = c.benchmark_group("mapped");
    group.bench_function("open (recovery scan)", |b| {
        b.iter(|| black_box(MappedStore::open(1_000_000, &path, "recover").expect("open")));
    });
}

criterion_group!(
    benches,
    bench_heap_insert,
    bench_heap_get,
    bench_mapped_insert,
    bench_mapped_recover
);
criterion_main!(benches);
