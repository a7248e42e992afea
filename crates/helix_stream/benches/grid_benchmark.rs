//! Benchmark for streaming grid updates.
//!
//! TARGET: a full camera step (evict + load + budget) inside the 16 ms
//! frame budget, with loads dominated by the loader, not the grid.
//!
//! Run with: cargo bench --package helix_stream --bench grid_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use helix_core::{ParticleStore, VoxelPool};
use helix_shared::Vec3;
use helix_stream::{StreamConfig, StreamingGrid, SyntheticLoader};

fn bench_config() -> StreamConfig {
    StreamConfig {
        voxel_size: 100.0,
        stream_radius: 250.0,
        unload_radius: 375.0,
        max_loaded_voxels: 1000,
    }
}

fn build_grid(config: StreamConfig, particles_per_voxel: usize) -> StreamingGrid {
    let pool = Arc::new(VoxelPool::with_capacity(config.max_loaded_voxels));
    let store = Arc::new(ParticleStore::new(4_000_000));
    let loader = Arc::new(SyntheticLoader::new(
        Arc::clone(&store),
        config.voxel_size,
        particles_per_voxel,
        42,
    ));
    StreamingGrid::new(config, pool, store, loader).expect("valid config")
}

fn benchmark_cold_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_load");
    // The stream sphere at this configuration is 123 cells.
    group.throughput(Throughput::Elements(123));

    group.bench_function("sphere_from_empty", |b| {
        b.iter(|| {
            let grid = build_grid(bench_config(), 64);
            grid.update_camera(black_box(Vec3::ZERO)).unwrap();
            black_box(grid.loaded_count())
        });
    });

    group.finish();
}

fn benchmark_gated_update(c: &mut Criterion) {
    let grid = build_grid(bench_config(), 64);
    grid.update_camera(Vec3::ZERO).unwrap();

    c.bench_function("gated_update", |b| {
        b.iter(|| {
            // 10 < voxel_size / 2: the movement gate makes this free.
            grid.update_camera(black_box(Vec3::new(10.0, 0.0, 0.0)))
                .unwrap()
        });
    });
}

fn benchmark_camera_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("camera_sweep");
    group.sample_size(20);

    group.bench_function("fly_40_steps", |b| {
        let grid = build_grid(bench_config(), 64);
        let mut step = 0i64;
        b.iter(|| {
            step += 1;
            let pos = Vec3::new((step * 150) as f32, 0.0, 0.0);
            grid.update_camera(black_box(pos)).unwrap();
            black_box(grid.loaded_count())
        });
    });

    group.finish();
}

fn benchmark_budget_eviction(c: &mut Criterion) {
    let config = StreamConfig {
        max_loaded_voxels: 50,
        ..bench_config()
    };

    c.bench_function("budget_eviction_123_to_50", |b| {
        b.iter(|| {
            let grid = build_grid(config, 16);
            grid.update_camera(black_box(Vec3::ZERO)).unwrap();
            black_box(grid.stats().evicted)
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_cold_load,
              benchmark_gated_update,
              benchmark_camera_sweep,
              benchmark_budget_eviction
}

criterion_main!(benches);
