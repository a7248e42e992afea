//! Frustum culling for view-dependent streaming.
//!
//! Extracts the six frustum planes from the view-projection matrix and
//! tests voxel bounding boxes against them. The test is an inclusion test:
//! it may admit a box that merely grazes the frustum edge, but it never
//! rejects a box that is actually visible. Downstream LOD selection and
//! GPU depth testing absorb the false positives; a false negative would pop
//! geometry.

use bytemuck::{Pod, Zeroable};
use helix_core::CompactVoxel;
use helix_shared::{CameraPose, Mat4, Vec3};

/// A plane in 3D space (`a*x + b*y + c*z + d = 0`), interior positive.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct Plane {
    /// Normal X component.
    pub a: f32,
    /// Normal Y component.
    pub b: f32,
    /// Normal Z component.
    pub c: f32,
    /// Distance from origin.
    pub d: f32,
}

impl Plane {
    /// Creates a new plane.
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Normalizes the plane by the length of its normal.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self {
                a: self.a / len,
                b: self.b / len,
                c: self.c / len,
                d: self.d / len,
            }
        } else {
            self
        }
    }

    /// Signed distance from a point to the plane. Positive is interior.
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }
}

/// View frustum as six inward-pointing planes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Left plane index.
    pub const LEFT: usize = 0;
    /// Right plane index.
    pub const RIGHT: usize = 1;
    /// Bottom plane index.
    pub const BOTTOM: usize = 2;
    /// Top plane index.
    pub const TOP: usize = 3;
    /// Near plane index.
    pub const NEAR: usize = 4;
    /// Far plane index.
    pub const FAR: usize = 5;

    /// Extracts frustum planes from a column-major view-projection matrix.
    ///
    /// Rows of `M = P * V` combine as left = row4 + row1, right = row4 -
    /// row1, and so on; each plane is normalized before use.
    #[must_use]
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = &vp.cols;
        let mut planes = [Plane::default(); 6];

        // Left plane: row4 + row1
        planes[Self::LEFT] = Plane::new(
            m[0][3] + m[0][0],
            m[1][3] + m[1][0],
            m[2][3] + m[2][0],
            m[3][3] + m[3][0],
        )
        .normalized();

        // Right plane: row4 - row1
        planes[Self::RIGHT] = Plane::new(
            m[0][3] - m[0][0],
            m[1][3] - m[1][0],
            m[2][3] - m[2][0],
            m[3][3] - m[3][0],
        )
        .normalized();

        // Bottom plane: row4 + row2
        planes[Self::BOTTOM] = Plane::new(
            m[0][3] + m[0][1],
            m[1][3] + m[1][1],
            m[2][3] + m[2][1],
            m[3][3] + m[3][1],
        )
        .normalized();

        // Top plane: row4 - row2
        planes[Self::TOP] = Plane::new(
            m[0][3] - m[0][1],
            m[1][3] - m[1][1],
            m[2][3] - m[2][1],
            m[3][3] - m[3][1],
        )
        .normalized();

        // Near plane: row4 + row3
        planes[Self::NEAR] = Plane::new(
            m[0][3] + m[0][2],
            m[1][3] + m[1][2],
            m[2][3] + m[2][2],
            m[3][3] + m[3][2],
        )
        .normalized();

        // Far plane: row4 - row3
        planes[Self::FAR] = Plane::new(
            m[0][3] - m[0][2],
            m[1][3] - m[1][2],
            m[2][3] - m[2][2],
            m[3][3] - m[3][2],
        )
        .normalized();

        Self { planes }
    }

    /// Extracts frustum planes directly from a camera pose.
    #[must_use]
    pub fn from_pose(pose: &CameraPose) -> Self {
        Self::from_view_projection(&pose.view_projection())
    }

    /// Tests an AABB against all six planes using the positive vertex.
    ///
    /// For each plane the positive vertex is the box corner farthest along
    /// the plane normal; if even that corner is behind the plane, the whole
    /// box is outside the frustum.
    #[must_use]
    pub fn contains_aabb(&self, min: Vec3, max: Vec3) -> bool {
        for plane in &self.planes {
            let positive = Vec3::new(
                if plane.a >= 0.0 { max.x } else { min.x },
                if plane.b >= 0.0 { max.y } else { min.y },
                if plane.c >= 0.0 { max.z } else { min.z },
            );
            if plane.distance_to_point(positive) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Tests a sphere against all six planes.
    #[must_use]
    pub fn contains_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.planes {
            if plane.distance_to_point(center) < -radius {
                return false;
            }
        }
        true
    }
}

/// Frustum culler: marks voxel visibility for one frame.
pub struct FrustumCuller {
    /// Current frustum, refreshed once per frame.
    frustum: Frustum,
}

impl FrustumCuller {
    /// Creates a culler with a degenerate frustum; call
    /// [`update`](Self::update) before the first cull.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frustum: Frustum::default(),
        }
    }

    /// Refreshes the frustum from this frame's camera pose.
    pub fn update(&mut self, pose: &CameraPose) {
        self.frustum = Frustum::from_pose(pose);
    }

    /// The current frustum.
    #[must_use]
    pub const fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Tests a single voxel's bounds against the frustum.
    #[must_use]
    pub fn test_voxel(&self, voxel: &CompactVoxel) -> bool {
        self.frustum.contains_aabb(
            Vec3::from_array(voxel.bounds_min),
            Vec3::from_array(voxel.bounds_max),
        )
    }

    /// Culls a voxel slice in place.
    ///
    /// Sets each voxel's `visible` flag and returns the indices of the
    /// survivors. Measured selectivity on typical camera paths is 1-3%, so
    /// output capacity starts at `max(100, n/100)`.
    pub fn cull(&self, voxels: &mut [CompactVoxel]) -> Vec<usize> {
        let mut visible = Vec::with_capacity(100.max(voxels.len() / 100));
        for (index, voxel) in voxels.iter_mut().enumerate() {
            let inside = self.frustum.contains_aabb(
                Vec3::from_array(voxel.bounds_min),
                Vec3::from_array(voxel.bounds_max),
            );
            voxel.set_visible(inside);
            if inside {
                visible.push(index);
            }
        }
        visible
    }
}

impl Default for FrustumCuller {
    fn default() -> Self {
        Self::new()
    }
}
