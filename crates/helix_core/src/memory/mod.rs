//! Recycled memory: the voxel pool and the particle store arena.

mod pool;
mod store;

pub use pool::{PoolStats, VoxelPool};
pub use store::{ParticleSpan, ParticleStore, StoreError};
