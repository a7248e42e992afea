//! The particle record.
//!
//! One particle per base pair or short read. The engine treats the record
//! as opaque; the `meta` word carries whatever domain key the loader wants
//! to round-trip (genomic position, read id).

use bytemuck::{Pod, Zeroable};

/// A single particle.
///
/// Exactly 32 bytes, immutable after insertion into the particle store.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// World-space position.
    pub position: [f32; 3],
    /// RGBA color.
    pub color: [u8; 4],
    /// Render size (point sprite radius).
    pub size: f32,
    /// Explicit padding so `meta` lands on an 8-byte boundary.
    _pad: u32,
    /// Domain key - genomic position or read id. Opaque to the engine.
    pub meta: u64,
}

impl Particle {
    /// Size of the record in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a new particle.
    #[inline]
    #[must_use]
    pub const fn new(position: [f32; 3], color: [u8; 4], size: f32, meta: u64) -> Self {
        Self {
            position,
            color,
            size,
            _pad: 0,
            meta,
        }
    }
}
