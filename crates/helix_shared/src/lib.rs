//! # HELIX Shared Types
//!
//! Math and camera primitives used by every crate in the workspace.
//!
//! ## Architecture Rules
//!
//! 1. **No engine logic** - Only plain data and pure functions
//! 2. **Deterministic** - Same inputs produce bit-identical outputs
//! 3. **Pod everywhere** - All math types are `bytemuck`-castable

pub mod camera;
pub mod constants;
pub mod math;

pub use camera::CameraPose;
pub use math::{Mat4, Vec3};
