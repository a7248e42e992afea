//! Camera pose and projection math.
//!
//! A pose is immutable within a frame; the streaming grid, frustum culler
//! and LOD selector all consume the same snapshot.

use crate::math::{Mat4, Vec3};

/// A camera pose for one frame.
///
/// Coordinates are in a right-handed world frame. Units are whatever the
/// dataset uses; the engine only requires them to be consistent with the
/// configured voxel size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// World-space camera position.
    pub position: Vec3,
    /// Viewing direction (need not be normalized).
    pub forward: Vec3,
    /// Up reference (need not be normalized, must not be parallel to forward).
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl CameraPose {
    /// Creates a new pose.
    #[must_use]
    pub const fn new(
        position: Vec3,
        forward: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            forward,
            up,
            fov_y,
            aspect,
            near,
            far,
        }
    }

    /// A pose looking down +X with sane defaults, used by tests and demos.
    #[must_use]
    pub fn looking_along_x(position: Vec3) -> Self {
        Self::new(
            position,
            Vec3::X,
            Vec3::Y,
            std::f32::consts::FRAC_PI_3,
            1.0,
            0.1,
            10_000.0,
        )
    }

    /// Returns true if every component of the pose is finite and the
    /// direction vectors are non-degenerate.
    ///
    /// A pose failing this check must be rejected before it mutates any
    /// engine state.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.forward.is_finite()
            && self.up.is_finite()
            && self.fov_y.is_finite()
            && self.aspect.is_finite()
            && self.near.is_finite()
            && self.far.is_finite()
            && self.forward.length_squared() > 0.0
            && self.up.length_squared() > 0.0
            && self.fov_y > 0.0
            && self.aspect > 0.0
            && self.near > 0.0
            && self.far > self.near
    }

    /// World-to-view matrix for this pose.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// View-to-clip perspective matrix for this pose.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Combined view-projection matrix (`projection * view`).
    ///
    /// This is the matrix frustum planes are extracted from.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix().mul(&self.view_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_pose() {
        let pose = CameraPose::looking_along_x(Vec3::ZERO);
        assert!(pose.is_valid());
    }

    #[test]
    fn test_nan_position_rejected() {
        let mut pose = CameraPose::looking_along_x(Vec3::ZERO);
        pose.position.x = f32::NAN;
        assert!(!pose.is_valid());
    }

    #[test]
    fn test_infinite_far_rejected() {
        let mut pose = CameraPose::looking_along_x(Vec3::ZERO);
        pose.far = f32::INFINITY;
        assert!(!pose.is_valid());
    }

    #[test]
    fn test_zero_forward_rejected() {
        let mut pose = CameraPose::looking_along_x(Vec3::ZERO);
        pose.forward = Vec3::ZERO;
        assert!(!pose.is_valid());
    }

    #[test]
    fn test_view_projection_is_finite() {
        let pose = CameraPose::looking_along_x(Vec3::new(100.0, 50.0, -20.0));
        let vp = pose.view_projection();
        for col in &vp.cols {
            for v in col {
                assert!(v.is_finite());
            }
        }
    }
}
