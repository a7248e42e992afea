//! Level-of-detail selection.
//!
//! Visible voxels are classified into four bands by the distance from
//! their centre to the camera. Each band maps to a deterministic particle
//! stride, so the same voxel at the same level renders the same subset
//! frame after frame - random sampling here would scintillate.

use serde::Deserialize;
use thiserror::Error;

use helix_core::{CompactVoxel, LodLevel};
use helix_shared::{constants, Vec3};

/// Invalid LOD band configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LodConfigError {
    /// Thresholds must satisfy `0 < close < far < culled`.
    #[error("LOD thresholds must be increasing: close {close}, far {far}, culled {culled}")]
    NotIncreasing {
        /// Full-detail threshold.
        close: f32,
        /// Half-detail threshold.
        far: f32,
        /// Drop threshold.
        culled: f32,
    },
    /// A threshold was NaN or infinite.
    #[error("LOD thresholds must be finite")]
    NotFinite,
}

/// LOD band thresholds, in world units from the camera.
///
/// | Band                  | Level | Particles        |
/// |-----------------------|-------|------------------|
/// | `[0, close)`          | 0     | 100% (stride 1)  |
/// | `[close, far)`        | 1     | 50% (stride 2)   |
/// | `[far, culled)`       | 2     | 10% (stride 10)  |
/// | `[culled, inf)`       | 3     | dropped          |
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Upper bound of the full-detail band.
    pub close: f32,
    /// Upper bound of the half-detail band.
    pub far: f32,
    /// Upper bound of the tenth-detail band; beyond it voxels are dropped.
    pub culled: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            close: constants::DEFAULT_LOD_CLOSE,
            far: constants::DEFAULT_LOD_FAR,
            culled: constants::DEFAULT_LOD_CULLED,
        }
    }
}

impl LodConfig {
    /// Validates the band ordering.
    ///
    /// # Errors
    ///
    /// Returns an error when a threshold is non-finite or the bands are not
    /// strictly increasing.
    pub fn validate(&self) -> Result<(), LodConfigError> {
        if !(self.close.is_finite() && self.far.is_finite() && self.culled.is_finite()) {
            return Err(LodConfigError::NotFinite);
        }
        if !(0.0 < self.close && self.close < self.far && self.far < self.culled) {
            return Err(LodConfigError::NotIncreasing {
                close: self.close,
                far: self.far,
                culled: self.culled,
            });
        }
        Ok(())
    }
}

/// Classifies visible voxels into LOD bands.
pub struct LodSelector {
    config: LodConfig,
}

impl LodSelector {
    /// Creates a selector from validated thresholds.
    ///
    /// # Errors
    ///
    /// Rejects configurations whose bands are not strictly increasing.
    pub fn new(config: LodConfig) -> Result<Self, LodConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active thresholds.
    #[must_use]
    pub const fn config(&self) -> &LodConfig {
        &self.config
    }

    /// Classifies a camera distance into a LOD level.
    ///
    /// Comparisons are `<` against each band's upper bound, so a distance
    /// exactly on a threshold falls into the farther band.
    #[inline]
    #[must_use]
    pub fn classify(&self, distance: f32) -> LodLevel {
        if distance < self.config.close {
            LodLevel::Full
        } else if distance < self.config.far {
            LodLevel::Half
        } else if distance < self.config.culled {
            LodLevel::Tenth
        } else {
            LodLevel::Culled
        }
    }

    /// Classifies a voxel by the distance from its centre to the camera.
    #[inline]
    #[must_use]
    pub fn classify_voxel(&self, voxel: &CompactVoxel, camera: Vec3) -> LodLevel {
        self.classify(voxel.center().distance(camera))
    }

    /// Deterministic particle indices for a slice of `count` particles at
    /// the given level: `[0, stride, 2*stride, ...]`.
    ///
    /// Empty for the culled level.
    pub fn sample_indices(count: usize, level: LodLevel) -> impl Iterator<Item = usize> {
        let (end, stride) = match level.stride() {
            Some(stride) => (count, stride),
            None => (0, 1),
        };
        (0..end).step_by(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_shared::Vec3;

    fn selector() -> LodSelector {
        LodSelector::new(LodConfig {
            close: 100.0,
            far: 500.0,
            culled: 2000.0,
        })
        .unwrap()
    }

    #[test]
    fn test_banding() {
        let lod = selector();
        let expected = [
            (50.0, LodLevel::Full),
            (150.0, LodLevel::Half),
            (800.0, LodLevel::Tenth),
            (1500.0, LodLevel::Tenth),
            (2500.0, LodLevel::Culled),
        ];
        for (distance, level) in expected {
            assert_eq!(lod.classify(distance), level, "distance {distance}");
        }
    }

    #[test]
    fn test_threshold_boundaries_fall_to_farther_band() {
        let lod = selector();
        assert_eq!(lod.classify(100.0), LodLevel::Half);
        assert_eq!(lod.classify(500.0), LodLevel::Tenth);
        assert_eq!(lod.classify(2000.0), LodLevel::Culled);
    }

    #[test]
    fn test_classify_voxel_uses_center() {
        let lod = selector();
        let voxel = CompactVoxel::with_bounds(
            Vec3::new(100.0, -50.0, -50.0),
            Vec3::new(200.0, 50.0, 50.0),
        );
        // Center is (150, 0, 0).
        assert_eq!(lod.classify_voxel(&voxel, Vec3::ZERO), LodLevel::Half);
    }

    #[test]
    fn test_deterministic_stride() {
        let half: Vec<_> = LodSelector::sample_indices(10, LodLevel::Half).collect();
        assert_eq!(half, vec![0, 2, 4, 6, 8]);

        let tenth: Vec<_> = LodSelector::sample_indices(35, LodLevel::Tenth).collect();
        assert_eq!(tenth, vec![0, 10, 20, 30]);

        let full: Vec<_> = LodSelector::sample_indices(3, LodLevel::Full).collect();
        assert_eq!(full, vec![0, 1, 2]);

        let culled: Vec<_> = LodSelector::sample_indices(100, LodLevel::Culled).collect();
        assert!(culled.is_empty());
    }

    #[test]
    fn test_rejects_non_increasing_bands() {
        assert!(LodSelector::new(LodConfig {
            close: 500.0,
            far: 500.0,
            culled: 2000.0,
        })
        .is_err());

        assert!(LodSelector::new(LodConfig {
            close: f32::NAN,
            far: 500.0,
            culled: 2000.0,
        })
        .is_err());
    }
}
