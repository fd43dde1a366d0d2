//! Segment write benchmarks.

use arenaq_bench::utils::random_data;
use arenaq_storage::{InMemorySegment, MmapSegment, Segment};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

const CAPACITY: usize = 1024 * 1024;

/// Benchmark writes into an in-memory segment.
fn bench_memory_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_segment_write");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut segment = InMemorySegment::new(0, CAPACITY);
            let data = random_data(size);
            let mut offset = 0;

            b.iter(|| {
                if offset + size > CAPACITY {
                    offset = 0;
                }
                let n = segment.write_at(black_box(offset), black_box(&data)).unwrap();
                offset += n;
            });
        });
    }

    group.finish();
}

/// Benchmark writes into a memory-mapped arena file.
fn bench_mmap_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("mmap_segment_write");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("arena_0.dat");
            let mut segment = MmapSegment::open(&path, 0, CAPACITY).unwrap();
            let data = random_data(size);
            let mut offset = 0;

            b.iter(|| {
                if offset + size > CAPACITY {
                    offset = 0;
                }
                let n = segment.write_at(black_box(offset), black_box(&data)).unwrap();
                offset += n;
            });

            segment.unmap().unwrap();
        });
    }

    group.finish();
}

/// Benchmark reading a length header back.
fn bench_read_u64(c: &mut Criterion) {
    let mut segment = InMemorySegment::new(0, CAPACITY);
    segment.write_u64(128, 42).unwrap();

    c.bench_function("memory_segment_read_u64", |b| {
        b.iter(|| black_box(segment.read_u64(black_box(128)).unwrap()));
    });
}

criterion_group!(benches, bench_memory_write, bench_mmap_write, bench_read_u64);
criterion_main!(benches);
