//! Streaming grid configuration.

use serde::Deserialize;
use thiserror::Error;

use helix_shared::constants;

/// Invalid streaming configuration, rejected at grid construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The unload radius must be strictly larger than the stream radius;
    /// the gap is the hysteresis band that prevents load/evict flapping.
    #[error("unload radius {unload} must exceed stream radius {stream} (hysteresis)")]
    NoHysteresis {
        /// Configured stream radius.
        stream: f32,
        /// Configured unload radius.
        unload: f32,
    },
    /// Voxel edge length must be positive and finite.
    #[error("voxel size must be positive and finite, got {0}")]
    BadVoxelSize(f32),
    /// Stream radius must be positive and finite.
    #[error("stream radius must be positive and finite, got {0}")]
    BadStreamRadius(f32),
    /// The residency budget must allow at least one voxel.
    #[error("max loaded voxels must be non-zero")]
    ZeroResidency,
}

/// Streaming grid configuration, loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Voxel edge length in world units.
    pub voxel_size: f32,
    /// Cells whose centre lies inside this radius are loaded.
    pub stream_radius: f32,
    /// Resident cells whose centre lies beyond this radius are evicted.
    /// Must exceed `stream_radius`; 1.5x is the tuned default.
    pub unload_radius: f32,
    /// Hard cap on simultaneously resident voxels.
    pub max_loaded_voxels: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            voxel_size: constants::DEFAULT_VOXEL_SIZE,
            stream_radius: constants::DEFAULT_STREAM_RADIUS,
            unload_radius: constants::DEFAULT_UNLOAD_RADIUS,
            max_loaded_voxels: constants::DEFAULT_MAX_LOADED_VOXELS,
        }
    }
}

impl StreamConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Rejects non-finite or non-positive sizes, a zero residency budget,
    /// and any configuration without hysteresis (`unload <= stream`) - an
    /// implementation running without the gap will thrash at the radius
    /// boundary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.voxel_size.is_finite() || self.voxel_size <= 0.0 {
            return Err(ConfigError::BadVoxelSize(self.voxel_size));
        }
        if !self.stream_radius.is_finite() || self.stream_radius <= 0.0 {
            return Err(ConfigError::BadStreamRadius(self.stream_radius));
        }
        if !self.unload_radius.is_finite() || self.unload_radius <= self.stream_radius {
            return Err(ConfigError::NoHysteresis {
                stream: self.stream_radius,
                unload: self.unload_radius,
            });
        }
        if self.max_loaded_voxels == 0 {
            return Err(ConfigError::ZeroResidency);
        }
        Ok(())
    }
}
