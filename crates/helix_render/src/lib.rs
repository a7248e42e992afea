//! # HELIX Render Selection
//!
//! The view-dependent half of the per-frame pipeline: frustum culling and
//! level-of-detail selection.
//!
//! Both components are pure functions of the camera pose and the voxel set.
//! They mark flags in place and never touch particles, locks, or threads;
//! the GPU back-end consuming their output is an external collaborator.

pub mod culling;
pub mod lod;

pub use culling::{Frustum, FrustumCuller, Plane};
pub use lod::{LodConfig, LodConfigError, LodSelector};
