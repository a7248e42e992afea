//! # HELIX
//!
//! A streaming particle engine for interactive visualization of very large
//! genomic datasets - up to ~3 billion particles, one per base pair or
//! short read, through a ~2 GB resident budget at 60 fps.
//!
//! The dataset never fits in memory and 99%+ of it is off-screen on any
//! frame, so everything hangs off one pipeline, driven once per frame by
//! the camera pose:
//!
//! ```text
//! pose -> StreamingGrid::update_camera   (load near, evict far, budget)
//!      -> FrustumCuller                  (mark visible voxels)
//!      -> LodSelector                    (distance band per voxel)
//!      -> FrameOutput                    (voxel, LOD, particle sub-range)
//! ```
//!
//! [`Engine`] owns that wiring. Collaborators plug in at two seams: a
//! [`ParticleLoader`] maps voxel coordinates to particle data (synthetic,
//! disk, network), and the rendering back-end consumes [`FrameOutput`]
//! and reads particle slices from the [`ParticleStore`].
//!
//! ```rust
//! use helix::{CameraPose, Engine, EngineConfig, Vec3};
//!
//! let mut engine = Engine::with_synthetic_dataset(EngineConfig::default(), 256, 42).unwrap();
//! let frame = engine.update_camera(&CameraPose::looking_along_x(Vec3::ZERO)).unwrap();
//! assert!(!frame.entries.is_empty());
//! ```

pub mod config;
pub mod engine;

pub use config::{EngineConfig, EngineError, StoreConfig};
pub use engine::{Engine, FrameOutput, FrameStats};

pub use helix_core::{CompactVoxel, LodLevel, Particle, ParticleSpan, ParticleStore, VoxelPool};
pub use helix_render::{FrustumCuller, LodConfig, LodSelector};
pub use helix_shared::{CameraPose, Vec3};
pub use helix_stream::{
    FrameEntry, ParticleLoader, StreamConfig, StreamingGrid, StreamingStats, SyntheticLoader,
    ThreadedLoader, VoxelCoord,
};
