//! # Voxel Pool
//!
//! Thread-safe recycler for compact voxel records.
//!
//! Residency churn under camera motion would otherwise hit the allocator
//! once per voxel per update; the pool turns that into a constant-time
//! free-list pop. Under steady-state motion the reuse rate must exceed 95%.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::voxel::CompactVoxel;
use helix_shared::Vec3;

/// Snapshot of pool counters.
///
/// Counters are monotonic and read with relaxed ordering; they are
/// observability data, not synchronization.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Voxels allocated fresh from the heap.
    pub allocations: u64,
    /// Voxels served from the free list.
    pub reuses: u64,
    /// Voxels returned to the pool.
    pub puts: u64,
    /// `reuses / (allocations + reuses)`, 0.0 when nothing was served yet.
    pub reuse_rate: f64,
}

/// A thread-safe pool of compact voxel records.
///
/// `get` and `put` are safe from any thread; ordering of puts relative to
/// gets is not guaranteed. The pool never caps its free list - the streaming
/// grid's residency budget is the authoritative bound on live voxels.
pub struct VoxelPool {
    /// Recycled records, ready for reuse.
    free: Mutex<Vec<Box<CompactVoxel>>>,
    /// Fresh heap allocations.
    allocations: AtomicU64,
    /// Records served from the free list.
    reuses: AtomicU64,
    /// Records returned to the pool.
    puts: AtomicU64,
}

impl VoxelPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            allocations: AtomicU64::new(0),
            reuses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
        }
    }

    /// Creates a pool pre-warmed with `count` records.
    ///
    /// Pre-warming moves the allocation cost out of the first camera update.
    #[must_use]
    pub fn with_capacity(count: usize) -> Self {
        let pool = Self::new();
        {
            let mut free = pool.free.lock();
            free.reserve(count);
            for _ in 0..count {
                free.push(Box::default());
            }
        }
        pool
    }

    /// Returns a voxel with every field zeroed.
    #[must_use]
    pub fn get(&self) -> Box<CompactVoxel> {
        if let Some(mut voxel) = self.free.lock().pop() {
            *voxel = CompactVoxel::default();
            self.reuses.fetch_add(1, Ordering::Relaxed);
            voxel
        } else {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            Box::default()
        }
    }

    /// Returns a voxel initialized with the given world bounds.
    #[must_use]
    pub fn get_with_bounds(&self, min: Vec3, max: Vec3) -> Box<CompactVoxel> {
        let mut voxel = self.get();
        *voxel = CompactVoxel::with_bounds(min, max);
        voxel
    }

    /// Returns a voxel to the pool.
    ///
    /// The particle range and all flags are cleared so a stale record can
    /// never leak state into its next user.
    pub fn put(&self, mut voxel: Box<CompactVoxel>) {
        *voxel = CompactVoxel::default();
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.free.lock().push(voxel);
    }

    /// Bulk return. One lock acquisition for the whole batch.
    pub fn put_batch<I: IntoIterator<Item = Box<CompactVoxel>>>(&self, voxels: I) {
        let mut free = self.free.lock();
        for mut voxel in voxels {
            *voxel = CompactVoxel::default();
            self.puts.fetch_add(1, Ordering::Relaxed);
            free.push(voxel);
        }
    }

    /// Number of records currently sitting in the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let allocations = self.allocations.load(Ordering::Relaxed);
        let reuses = self.reuses.load(Ordering::Relaxed);
        let served = allocations + reuses;
        PoolStats {
            allocations,
            reuses,
            puts: self.puts.load(Ordering::Relaxed),
            reuse_rate: if served > 0 {
                reuses as f64 / served as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for VoxelPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_zeroed_voxel() {
        let pool = VoxelPool::new();

        let mut v = pool.get();
        v.set_visible(true);
        v.set_particle_range(100, 50);
        pool.put(v);

        let v = pool.get();
        assert_eq!(*v, CompactVoxel::default());
        assert_eq!(v.particle_count(), 0);
        assert!(!v.is_visible());
    }

    #[test]
    fn test_put_then_get_is_a_reuse() {
        let pool = VoxelPool::new();

        let v = pool.get();
        pool.put(v);
        let _v = pool.get();

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 1);
        assert_eq!(stats.puts, 1);
        assert!((stats.reuse_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_put_get_is_noop_on_pool_content() {
        let pool = VoxelPool::with_capacity(4);
        assert_eq!(pool.free_count(), 4);

        pool.put(pool.get());
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn test_put_batch() {
        let pool = VoxelPool::new();
        let batch: Vec<_> = (0..8).map(|_| pool.get()).collect();

        pool.put_batch(batch);
        assert_eq!(pool.free_count(), 8);
        assert_eq!(pool.stats().puts, 8);
    }

    #[test]
    fn test_get_with_bounds() {
        let pool = VoxelPool::new();
        let v = pool.get_with_bounds(Vec3::ZERO, Vec3::new(100.0, 100.0, 100.0));
        assert_eq!(v.center(), Vec3::new(50.0, 50.0, 50.0));
        assert!(!v.is_streaming());
    }

    #[test]
    fn test_steady_state_reuse_rate() {
        let pool = VoxelPool::new();

        // Warm-up: one working set's worth of allocations.
        let warmup: Vec<_> = (0..100).map(|_| pool.get()).collect();
        pool.put_batch(warmup);

        // Steady state: every cycle recycles the same records.
        for _ in 0..50 {
            let cycle: Vec<_> = (0..100).map(|_| pool.get()).collect();
            pool.put_batch(cycle);
        }

        assert!(pool.stats().reuse_rate > 0.95);
    }

    #[test]
    fn test_concurrent_get_put() {
        use std::sync::Arc;

        let pool = Arc::new(VoxelPool::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    let v = pool.get();
                    pool.put(v);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.puts, 4000);
        assert_eq!(stats.allocations + stats.reuses, 4000);
    }
}
