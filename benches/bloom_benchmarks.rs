use backed_bloom_rs::{
    BitArrayBackend, BloomFilter, BloomFilterConfigBuilder, BloomFilterOps,
    Crc32HashFunction, FnvHashFunction, HashFunction, Murmur3HashFunction,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, distr::Alphanumeric};
use std::hint::black_box;
use std::sync::Arc;
use tempfile::TempDir;

// Helper function to generate random string data
fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_test_data(count: usize) -> Vec<String> {
    (0..count).map(|_| generate_random_string(32)).collect()
}

fn backend_for(name: &str, dir: &TempDir) -> BitArrayBackend {
    let path = dir.path().join(format!("bench_{}.bits", rand::random::<u64>()));
    match name {
        "file" => BitArrayBackend::FileBacked(path),
        "mmap" => BitArrayBackend::MemoryMapped(path),
        _ => BitArrayBackend::InMemory,
    }
}

fn create_filter(
    capacity: usize,
    backend: BitArrayBackend,
) -> BloomFilter<str> {
    let config = BloomFilterConfigBuilder::default()
        .expected_insertions(capacity)
        .false_positive_probability(0.01)
        .backend(backend)
        .build()
        .expect("Failed to build filter config");
    BloomFilter::new(config).expect("Failed to create filter")
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_operations");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    for capacity in [1_000, 10_000] {
        let test_data = generate_test_data(capacity);

        for backend in ["memory", "mmap", "file"] {
            group.bench_with_input(
                BenchmarkId::new(backend, capacity),
                &test_data,
                |b, data| {
                    let mut filter =
                        create_filter(capacity, backend_for(backend, &dir));
                    b.iter(|| {
                        for item in data {
                            filter.add(black_box(item.as_str())).unwrap();
                        }
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_operations");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let capacity = 10_000;
    let inserted = generate_test_data(capacity);
    let absent = generate_test_data(capacity);

    for backend in ["memory", "mmap", "file"] {
        let mut filter = create_filter(capacity, backend_for(backend, &dir));
        for item in &inserted {
            filter.add(item.as_str()).unwrap();
        }

        group.bench_function(BenchmarkId::new(backend, "present"), |b| {
            b.iter(|| {
                for item in &inserted {
                    black_box(filter.contains(item.as_str()).unwrap());
                }
            });
        });
        group.bench_function(BenchmarkId::new(backend, "absent"), |b| {
            b.iter(|| {
                for item in &absent {
                    black_box(filter.contains(item.as_str()).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_hash_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_functions");
    let data = generate_test_data(1_000);
    let hashers: [(&str, Arc<dyn HashFunction>); 3] = [
        ("murmur3", Arc::new(Murmur3HashFunction)),
        ("crc32", Arc::new(Crc32HashFunction)),
        ("fnv", Arc::new(FnvHashFunction)),
    ];

    for (name, hasher) in hashers {
        group.bench_function(name, |b| {
            b.iter(|| {
                for item in &data {
                    black_box(
                        backed_bloom_rs::hash::seed_hash(
                            hasher.as_ref(),
                            item.as_bytes(),
                        )
                        .unwrap(),
                    );
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_hash_functions);
criterion_main!(benches);
