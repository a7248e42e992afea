//! Benchmark for frustum culling throughput.
//!
//! TARGET: a full residency set (50,000 voxels) culled well inside the
//! frame budget; the per-voxel test is six plane evaluations.
//!
//! Run with: cargo bench --package helix_render --bench culling_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use helix_core::CompactVoxel;
use helix_render::FrustumCuller;
use helix_shared::{CameraPose, Vec3};

/// A deterministic cloud of voxels around the origin.
fn voxel_cloud(count: usize) -> Vec<CompactVoxel> {
    let mut voxels = Vec::with_capacity(count);
    let side = (count as f64).cbrt().ceil() as i64;
    for i in 0..count as i64 {
        let x = (i % side - side / 2) as f32 * 100.0;
        let y = ((i / side) % side - side / 2) as f32 * 100.0;
        let z = (i / (side * side) - side / 2) as f32 * 100.0;
        voxels.push(CompactVoxel::with_bounds(
            Vec3::new(x, y, z),
            Vec3::new(x + 100.0, y + 100.0, z + 100.0),
        ));
    }
    voxels
}

fn benchmark_cull_residency_set(c: &mut Criterion) {
    let mut culler = FrustumCuller::new();
    culler.update(&CameraPose::looking_along_x(Vec3::ZERO));

    let mut group = c.benchmark_group("frustum_cull");
    for &count in &[1_000usize, 10_000, 50_000] {
        let mut voxels = voxel_cloud(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("{count}_voxels"), |b| {
            b.iter(|| black_box(culler.cull(black_box(&mut voxels))));
        });
    }
    group.finish();
}

fn benchmark_single_aabb_test(c: &mut Criterion) {
    let mut culler = FrustumCuller::new();
    culler.update(&CameraPose::looking_along_x(Vec3::ZERO));
    let voxel = CompactVoxel::with_bounds(
        Vec3::new(400.0, -50.0, -50.0),
        Vec3::new(500.0, 50.0, 50.0),
    );

    c.bench_function("single_aabb_test", |b| {
        b.iter(|| black_box(culler.test_voxel(black_box(&voxel))));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_cull_residency_set, benchmark_single_aabb_test
}

criterion_main!(benches);
