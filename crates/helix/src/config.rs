//! Engine configuration.
//!
//! One TOML file, loaded once at startup, covering the streaming grid,
//! the LOD bands and the particle store. Every section is optional and
//! falls back to the tuned defaults in `helix_shared::constants`.
//!
//! ```toml
//! [stream]
//! voxel_size = 100.0
//! stream_radius = 250.0
//! unload_radius = 375.0
//! max_loaded_voxels = 50000
//!
//! [lod]
//! close = 100.0
//! far = 500.0
//! culled = 2000.0
//!
//! [store]
//! capacity = 8000000
//! hard_cap = 16000000
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use helix_render::lod::LodConfigError;
use helix_render::LodConfig;
use helix_shared::constants;
use helix_stream::config::ConfigError;
use helix_stream::{GridError, StreamConfig};

/// Anything that can go wrong building an engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The streaming grid rejected its configuration or camera input.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The LOD bands were rejected.
    #[error(transparent)]
    Lod(#[from] LodConfigError),

    /// The particle store sizing was rejected.
    #[error("store hard cap {hard_cap} below capacity {capacity}")]
    BadStoreConfig {
        /// Configured initial capacity in particles.
        capacity: usize,
        /// Configured growth ceiling in particles.
        hard_cap: usize,
    },

    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for EngineError {
    fn from(error: ConfigError) -> Self {
        Self::Grid(GridError::Config(error))
    }
}

/// Particle store sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Initial arena capacity, in particles.
    pub capacity: usize,
    /// Growth ceiling under fragmentation pressure, in particles.
    pub hard_cap: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: constants::DEFAULT_STORE_CAPACITY,
            hard_cap: constants::DEFAULT_STORE_HARD_CAP,
        }
    }
}

impl StoreConfig {
    /// Validates the sizing.
    ///
    /// # Errors
    ///
    /// Rejects a hard cap below the initial capacity.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.hard_cap < self.capacity {
            return Err(EngineError::BadStoreConfig {
                capacity: self.capacity,
                hard_cap: self.hard_cap,
            });
        }
        Ok(())
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Streaming grid section.
    pub stream: StreamConfig,
    /// LOD band section.
    pub lod: LodConfig,
    /// Particle store section.
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns parse and validation errors.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns I/O, parse and validation errors.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first section error encountered.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.stream.validate()?;
        self.lod.validate()?;
        self.store.validate()?;
        Ok(())
    }
}
