//! # Orbit Camera Demo
//!
//! Flies a camera around a synthetic genomic dataset and prints what the
//! streaming core does each frame:
//!
//! ```text
//! pose -> residency update -> frustum cull -> LOD select -> frame output
//! ```
//!
//! Run with: cargo run --example orbit_camera

use helix::{CameraPose, Engine, EngineConfig, LodLevel, Vec3};

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("   HELIX - Orbit Camera Streaming Demo");
    println!("═══════════════════════════════════════════════════════════════");
    println!();

    let config = EngineConfig::default();
    let mut engine =
        Engine::with_synthetic_dataset(config, 512, 42).expect("default config is valid");

    println!(
        "voxel {}  stream {}  unload {}  budget {} voxels",
        config.stream.voxel_size,
        config.stream.stream_radius,
        config.stream.unload_radius,
        config.stream.max_loaded_voxels
    );
    println!();

    // One orbit around the dataset origin, looking inward.
    let orbit_radius = 800.0;
    let frames = 24;
    for frame in 0..frames {
        let angle = frame as f32 / frames as f32 * std::f32::consts::TAU;
        let position = Vec3::new(
            orbit_radius * angle.cos(),
            150.0,
            orbit_radius * angle.sin(),
        );
        let forward = (Vec3::ZERO - position).normalized();

        let pose = CameraPose::new(
            position,
            forward,
            Vec3::Y,
            std::f32::consts::FRAC_PI_3,
            16.0 / 9.0,
            0.1,
            10_000.0,
        );
        let output = engine.update_camera(&pose).expect("finite pose");

        let full = output
            .entries
            .iter()
            .filter(|e| e.level == LodLevel::Full)
            .count();
        println!(
            "frame {frame:>2}  resident {:>4}  visible {:>4}  emitted {:>4} ({full} full)  {:.2} ms{}",
            output.stats.resident,
            output.stats.visible,
            output.stats.emitted,
            output.stats.frame_time_ms,
            if output.stats.gated { "  [gated]" } else { "" },
        );
    }

    println!();
    let streaming = engine.streaming_stats();
    let pool = engine.pool().stats();
    println!("── streaming ─────────────────────────────────────────────────");
    println!(
        "streamed in {}  evicted {}  cache {}/{} ({:.0}% hit)",
        streaming.streamed_in,
        streaming.evicted,
        streaming.cache_hits,
        streaming.cache_hits + streaming.cache_misses,
        streaming.hit_rate() * 100.0
    );
    println!(
        "memory {:.1} MB of ~2048 MB envelope",
        streaming.memory_used_bytes as f64 / (1024.0 * 1024.0)
    );
    println!(
        "pool reuse rate {:.1}% ({} allocations, {} reuses)",
        pool.reuse_rate * 100.0,
        pool.allocations,
        pool.reuses
    );
}
