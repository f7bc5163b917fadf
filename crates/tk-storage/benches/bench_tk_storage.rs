use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tempfile::TempDir;
use tk_storage::{FileKvStore, KvStore, MemoryKvStore};

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn bench_memory_store(c: &mut Criterion) {
    let store = MemoryKvStore::new();
    let token = random_token(512);

    c.bench_function("memory_set_get_remove_1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                store.set("token", &token).unwrap();
                black_box(store.get("token").unwrap());
                store.remove("token").unwrap();
            }
        })
    });
}

fn bench_file_store(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = FileKvStore::open(tmp.path().join("session.json")).unwrap();
    let token = random_token(512);

    c.bench_function("file_set_remove_x10", |b| {
        b.iter(|| {
            for _ in 0..10 {
                store.set("token", &token).unwrap();
                store.set("expirationTime", "1700000000000").unwrap();
                store.remove("token").unwrap();
                store.remove("expirationTime").unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_memory_store, bench_file_store);
criterion_main!(benches);
