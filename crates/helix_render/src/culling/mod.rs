//! Frustum culling.

mod frustum;

pub use frustum::{Frustum, FrustumCuller, Plane};
