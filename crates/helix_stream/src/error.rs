//! # Streaming Error Types
//!
//! The grid recognizes a small, closed set of error kinds. Loader failures
//! and arena exhaustion are reported through statistics and logs, not
//! raised - the grid stays consistent and the affected voxel simply isn't
//! resident.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the streaming grid itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// The camera position contained a NaN or non-finite component.
    /// Rejected with no state mutation.
    #[error("invalid camera position (NaN or non-finite component)")]
    InvalidCameraPose,

    /// The configuration was rejected at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;
