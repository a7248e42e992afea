//! Engine-wide default constants.
//!
//! Tuned for a ~2 GB resident budget over datasets of up to three billion
//! particles. All of these are defaults; the config layer can override them.

/// Default voxel edge length in world units.
pub const DEFAULT_VOXEL_SIZE: f32 = 100.0;

/// Default streaming radius: voxels inside this distance are loaded.
pub const DEFAULT_STREAM_RADIUS: f32 = 250.0;

/// Default unload radius: voxels beyond this distance are evicted.
///
/// Kept at 1.5x the stream radius; the gap is the hysteresis band that
/// prevents load/evict flapping at the boundary.
pub const DEFAULT_UNLOAD_RADIUS: f32 = 375.0;

/// Default residency cap (maximum simultaneously loaded voxels).
pub const DEFAULT_MAX_LOADED_VOXELS: usize = 50_000;

/// Default LOD band: full detail below this camera distance.
pub const DEFAULT_LOD_CLOSE: f32 = 100.0;

/// Default LOD band: half detail below this camera distance.
pub const DEFAULT_LOD_FAR: f32 = 500.0;

/// Default LOD band: tenth detail below this distance, dropped beyond it.
pub const DEFAULT_LOD_CULLED: f32 = 2_000.0;

/// Default particle store capacity (in particles, not bytes).
pub const DEFAULT_STORE_CAPACITY: usize = 8_000_000;

/// Hard cap the particle store may grow to under fragmentation pressure.
pub const DEFAULT_STORE_HARD_CAP: usize = 16_000_000;

/// Hard upper bound on particles per voxel (the count field is 16 bits).
pub const MAX_PARTICLES_PER_VOXEL: usize = u16::MAX as usize;
