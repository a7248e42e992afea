//! # HELIX Stream
//!
//! Camera-driven residency over a sparse voxel grid.
//!
//! The dataset is 100-1000x larger than RAM and 99%+ of it is off-screen
//! on any given frame. This crate keeps exactly the voxels near the camera
//! resident: each `update_camera` evicts cells beyond the unload radius,
//! loads cells inside the stream radius, and enforces a hard residency
//! budget - recycling every voxel record through the pool and every
//! particle slice through the store's freelist.
//!
//! ## Per-frame control flow
//!
//! ```text
//! camera pose -> movement gate -> evict far -> load near -> enforce budget
//!             -> (frustum cull, LOD select - see helix_render)
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod loader;
pub mod stats;

pub use config::{ConfigError, StreamConfig};
pub use error::GridError;
pub use grid::{FrameEntry, StreamingGrid, VoxelCoord};
pub use loader::{LoadError, ParticleLoader, SyntheticLoader, ThreadedLoader};
pub use stats::StreamingStats;
