//! # HELIX Core
//!
//! Compact records and recycled memory for streaming billions of particles
//! through a ~2 GB resident budget:
//!
//! - 32-byte particle and voxel records, `bytemuck`-castable for direct
//!   upload by the rendering collaborator
//! - A thread-safe voxel pool with constant-time reuse
//! - A particle store arena with a best-fit freelist
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in the per-frame hot path** - Records are
//!    recycled, never reallocated
//! 2. **Fixed layouts** - Both records are exactly 32 bytes, verified by test
//! 3. **Reported errors** - Arena exhaustion is an error value, never a panic

pub mod memory;
pub mod particle;
pub mod voxel;

pub use memory::{ParticleSpan, ParticleStore, PoolStats, StoreError, VoxelPool};
pub use particle::Particle;
pub use voxel::{CompactVoxel, LodLevel};
