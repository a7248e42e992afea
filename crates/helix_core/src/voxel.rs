//! The compact voxel record.
//!
//! A voxel is one cubic cell of the world grid plus the slice of the
//! particle store that falls inside it. The record is exactly 32 bytes so a
//! full residency set of 50,000 voxels costs ~1.5 MB.

use bytemuck::{Pod, Zeroable};
use helix_shared::Vec3;

/// Visible flag bit.
const FLAG_VISIBLE: u8 = 1 << 0;
/// Dirty flag bit (particle data changed, GPU upload pending).
const FLAG_DIRTY: u8 = 1 << 1;
/// Streaming flag bit (load in flight).
const FLAG_STREAMING: u8 = 1 << 2;
/// Evicted flag bit (returned or returning to the pool).
const FLAG_EVICTED: u8 = 1 << 3;
/// Shift of the 2-bit LOD field.
const LOD_SHIFT: u8 = 4;
/// Mask of the 2-bit LOD field.
const LOD_MASK: u8 = 0b0011_0000;

/// Level of detail for a voxel, selected by camera distance.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LodLevel {
    /// Every particle is rendered.
    #[default]
    Full = 0,
    /// Every other particle is rendered.
    Half = 1,
    /// Every tenth particle is rendered.
    Tenth = 2,
    /// The voxel is dropped from the frame entirely.
    Culled = 3,
}

impl LodLevel {
    /// Decodes a level from the low two bits of `bits`.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Full,
            1 => Self::Half,
            2 => Self::Tenth,
            _ => Self::Culled,
        }
    }

    /// Particle sampling stride for this level, or `None` when culled.
    ///
    /// The stride is deterministic: the same voxel at the same level always
    /// renders the same subset, which keeps the image stable frame to frame.
    #[inline]
    #[must_use]
    pub const fn stride(self) -> Option<usize> {
        match self {
            Self::Full => Some(1),
            Self::Half => Some(2),
            Self::Tenth => Some(10),
            Self::Culled => None,
        }
    }
}

/// The compact voxel record.
///
/// Layout (32 bytes, `#[repr(C)]`):
///
/// | Offset | Field             | Size |
/// |--------|-------------------|------|
/// | 0      | `bounds_min`      | 12   |
/// | 12     | `bounds_max`      | 12   |
/// | 24     | `particle_offset` | 4    |
/// | 28     | `particle_count`  | 2    |
/// | 30     | `flags`           | 1    |
/// | 31     | reserved          | 1    |
///
/// A voxel is owned by exactly one thread at any time: the loader while the
/// `streaming` flag is set, the render thread otherwise. Concurrent mutation
/// of the same record is a bug.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CompactVoxel {
    /// Minimum corner of the world-space bounding box.
    pub bounds_min: [f32; 3],
    /// Maximum corner of the world-space bounding box.
    pub bounds_max: [f32; 3],
    /// Absolute offset of this voxel's slice in the particle store.
    particle_offset: u32,
    /// Number of particles in the slice (at most 65,535).
    particle_count: u16,
    /// Flag bitfield: visible, dirty, streaming, evicted + 2-bit LOD level.
    flags: u8,
    /// Reserved padding for alignment.
    _reserved: u8,
}

impl CompactVoxel {
    /// Size of the record in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a voxel with the given bounds and everything else zeroed.
    #[must_use]
    pub fn with_bounds(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self {
            bounds_min: min.to_array(),
            bounds_max: max.to_array(),
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    /// Returns the visible flag.
    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.flags & FLAG_VISIBLE != 0
    }

    /// Sets the visible flag.
    #[inline]
    pub fn set_visible(&mut self, visible: bool) {
        if visible {
            self.flags |= FLAG_VISIBLE;
        } else {
            self.flags &= !FLAG_VISIBLE;
        }
    }

    /// Returns the dirty flag (particle data changed, GPU upload pending).
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.flags & FLAG_DIRTY != 0
    }

    /// Sets the dirty flag.
    #[inline]
    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.flags |= FLAG_DIRTY;
        } else {
            self.flags &= !FLAG_DIRTY;
        }
    }

    /// Returns the streaming flag (load in flight).
    #[inline]
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.flags & FLAG_STREAMING != 0
    }

    /// Sets the streaming flag.
    ///
    /// `streaming` and `evicted` are mutually exclusive. Attempting to mark
    /// an evicted voxel as streaming is a bug: debug builds panic, release
    /// builds keep the evicted state and log.
    #[inline]
    pub fn set_streaming(&mut self, streaming: bool) {
        if streaming {
            debug_assert!(!self.is_evicted(), "streaming set on an evicted voxel");
            if self.is_evicted() {
                tracing::warn!("streaming requested on an evicted voxel; clamped to evicted");
                return;
            }
            self.flags |= FLAG_STREAMING;
        } else {
            self.flags &= !FLAG_STREAMING;
        }
    }

    /// Returns the evicted flag.
    #[inline]
    #[must_use]
    pub const fn is_evicted(&self) -> bool {
        self.flags & FLAG_EVICTED != 0
    }

    /// Sets the evicted flag.
    ///
    /// Marking a voxel evicted also clears the streaming flag and the
    /// particle range, so the flag invariants hold by construction.
    #[inline]
    pub fn set_evicted(&mut self, evicted: bool) {
        if evicted {
            self.flags = (self.flags & !FLAG_STREAMING) | FLAG_EVICTED;
            self.particle_offset = 0;
            self.particle_count = 0;
        } else {
            self.flags &= !FLAG_EVICTED;
        }
    }

    /// Returns the LOD level field.
    #[inline]
    #[must_use]
    pub const fn lod_level(&self) -> LodLevel {
        LodLevel::from_bits((self.flags & LOD_MASK) >> LOD_SHIFT)
    }

    /// Sets the LOD level field.
    #[inline]
    pub fn set_lod_level(&mut self, level: LodLevel) {
        self.flags = (self.flags & !LOD_MASK) | ((level as u8) << LOD_SHIFT);
    }

    // -------------------------------------------------------------------------
    // Particle slice
    // -------------------------------------------------------------------------

    /// Absolute offset of this voxel's slice in the particle store.
    #[inline]
    #[must_use]
    pub const fn particle_offset(&self) -> u32 {
        self.particle_offset
    }

    /// Number of particles in the slice.
    #[inline]
    #[must_use]
    pub const fn particle_count(&self) -> u16 {
        self.particle_count
    }

    /// Points the voxel at a slice of the particle store.
    ///
    /// Also sets the dirty flag: the downstream GPU uploader must refresh
    /// this voxel's particle data.
    #[inline]
    pub fn set_particle_range(&mut self, offset: u32, count: u16) {
        debug_assert!(
            !self.is_evicted() || count == 0,
            "non-empty range set on an evicted voxel"
        );
        self.particle_offset = offset;
        self.particle_count = count;
        self.set_dirty(true);
    }

    /// Clears the particle range without touching any flags.
    #[inline]
    pub fn clear_particle_range(&mut self) {
        self.particle_offset = 0;
        self.particle_count = 0;
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Center of the bounding box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (Vec3::from_array(self.bounds_min) + Vec3::from_array(self.bounds_max)) * 0.5
    }

    /// Extent of the bounding box along each axis.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Vec3 {
        Vec3::from_array(self.bounds_max) - Vec3::from_array(self.bounds_min)
    }

    /// Radius of the bounding sphere (half the box diagonal).
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// Returns true if the point lies inside the box (inclusive).
    #[inline]
    #[must_use]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.bounds_min[0]
            && p.x <= self.bounds_max[0]
            && p.y >= self.bounds_min[1]
            && p.y <= self.bounds_max[1]
            && p.z >= self.bounds_min[2]
            && p.z <= self.bounds_max[2]
    }

    /// Returns true if the box overlaps `[min, max]`.
    #[inline]
    #[must_use]
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.bounds_min[0] <= max.x
            && self.bounds_max[0] >= min.x
            && self.bounds_min[1] <= max.y
            && self.bounds_max[1] >= min.y
            && self.bounds_min[2] <= max.z
            && self.bounds_max[2] >= min.z
    }

    /// Returns true if the box overlaps the sphere.
    #[inline]
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.distance_to_point(center) <= radius
    }

    /// Distance from the point to the box surface (zero when inside).
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        let clamped = p
            .max(Vec3::from_array(self.bounds_min))
            .min(Vec3::from_array(self.bounds_max));
        clamped.distance(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_is_32_bytes() {
        assert_eq!(CompactVoxel::SIZE, 32);

        // Bounds occupy the first 24 bytes; the slice handle starts at 24.
        let mut v = CompactVoxel::default();
        v.set_particle_range(0x0102_0304, 0x0506);
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(&bytes[24..28], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(&bytes[28..30], &0x0506u16.to_ne_bytes());
    }

    #[test]
    fn test_flag_roundtrip() {
        let mut v = CompactVoxel::default();
        assert!(!v.is_visible());

        v.set_visible(true);
        v.set_dirty(true);
        assert!(v.is_visible());
        assert!(v.is_dirty());
        assert!(!v.is_streaming());

        v.set_visible(false);
        assert!(!v.is_visible());
        assert!(v.is_dirty());
    }

    #[test]
    fn test_lod_field_does_not_disturb_flags() {
        let mut v = CompactVoxel::default();
        v.set_visible(true);
        v.set_lod_level(LodLevel::Tenth);

        assert_eq!(v.lod_level(), LodLevel::Tenth);
        assert!(v.is_visible());

        v.set_lod_level(LodLevel::Culled);
        assert_eq!(v.lod_level(), LodLevel::Culled);
        assert!(v.is_visible());
    }

    #[test]
    fn test_evicted_clears_streaming_and_range() {
        let mut v = CompactVoxel::default();
        v.set_streaming(true);
        v.set_particle_range(128, 64);

        v.set_evicted(true);
        assert!(v.is_evicted());
        assert!(!v.is_streaming());
        assert_eq!(v.particle_count(), 0);
        assert_eq!(v.particle_offset(), 0);
    }

    #[test]
    fn test_set_particle_range_marks_dirty() {
        let mut v = CompactVoxel::default();
        assert!(!v.is_dirty());
        v.set_particle_range(10, 5);
        assert!(v.is_dirty());
        assert_eq!(v.particle_offset(), 10);
        assert_eq!(v.particle_count(), 5);
    }

    #[test]
    fn test_geometry_queries() {
        let v = CompactVoxel::with_bounds(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 100.0, 100.0));

        assert_eq!(v.center(), Vec3::new(50.0, 50.0, 50.0));
        assert_eq!(v.size(), Vec3::new(100.0, 100.0, 100.0));
        assert!((v.radius() - (3.0f32).sqrt() * 50.0).abs() < 1e-4);

        assert!(v.contains_point(Vec3::new(50.0, 50.0, 50.0)));
        assert!(v.contains_point(Vec3::new(0.0, 0.0, 0.0)));
        assert!(!v.contains_point(Vec3::new(-0.1, 50.0, 50.0)));

        assert!(v.intersects_aabb(Vec3::new(90.0, 90.0, 90.0), Vec3::new(200.0, 200.0, 200.0)));
        assert!(!v.intersects_aabb(Vec3::new(101.0, 0.0, 0.0), Vec3::new(200.0, 100.0, 100.0)));

        assert!(v.intersects_sphere(Vec3::new(150.0, 50.0, 50.0), 60.0));
        assert!(!v.intersects_sphere(Vec3::new(150.0, 50.0, 50.0), 40.0));

        assert_eq!(v.distance_to_point(Vec3::new(50.0, 50.0, 50.0)), 0.0);
        assert_eq!(v.distance_to_point(Vec3::new(150.0, 50.0, 50.0)), 50.0);
    }

    #[test]
    fn test_lod_stride() {
        assert_eq!(LodLevel::Full.stride(), Some(1));
        assert_eq!(LodLevel::Half.stride(), Some(2));
        assert_eq!(LodLevel::Tenth.stride(), Some(10));
        assert_eq!(LodLevel::Culled.stride(), None);
    }
}
