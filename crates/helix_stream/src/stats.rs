//! Residency statistics.
//!
//! Counters are observability data, not correctness: they are monotonic,
//! updated with relaxed ordering, and snapshot per call.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Internal atomic counters owned by the grid.
#[derive(Debug, Default)]
pub(crate) struct GridCounters {
    /// Voxels loaded over the grid's lifetime.
    pub streamed_in: AtomicU64,
    /// Voxels evicted over the grid's lifetime (radius and budget).
    pub evicted: AtomicU64,
    /// Cells requested while already resident.
    pub cache_hits: AtomicU64,
    /// Cells requested while absent (a load was attempted).
    pub cache_misses: AtomicU64,
    /// Bytes held by resident voxel records plus live particles.
    pub memory_used_bytes: AtomicUsize,
}

impl GridCounters {
    /// Resets every counter to zero (dataset switch).
    pub fn reset(&self) {
        self.streamed_in.store(0, Ordering::Relaxed);
        self.evicted.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.memory_used_bytes.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of the grid's residency statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Voxels currently resident.
    pub loaded: usize,
    /// Resident voxels with the visible flag set.
    pub visible: usize,
    /// Voxels loaded over the grid's lifetime.
    pub streamed_in: u64,
    /// Voxels evicted over the grid's lifetime.
    pub evicted: u64,
    /// Cells requested while already resident.
    pub cache_hits: u64,
    /// Cells requested while absent.
    pub cache_misses: u64,
    /// Bytes held by resident voxel records plus live particles.
    pub memory_used_bytes: usize,
}

impl StreamingStats {
    /// Cache hit rate over all cell requests, 0.0 when nothing was requested.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total > 0 {
            self.cache_hits as f64 / total as f64
        } else {
            0.0
        }
    }
}
