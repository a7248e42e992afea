//! The streaming grid.
//!
//! Maps integer cell coordinates to resident voxels and keeps that mapping
//! aligned with the camera: cells entering the stream radius are loaded,
//! cells beyond the unload radius are evicted, and a hard residency budget
//! is enforced by evicting farthest-first. Voxel records recycle through
//! the pool; particle slices recycle through the store's freelist.
//!
//! The residency map is mutated only by the render thread inside
//! [`StreamingGrid::update_camera`]. Query methods snapshot under a read
//! lock and are safe from any thread.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use helix_core::{CompactVoxel, LodLevel, ParticleSpan, ParticleStore, VoxelPool};
use helix_shared::constants::MAX_PARTICLES_PER_VOXEL;
use helix_shared::Vec3;

use crate::config::StreamConfig;
use crate::error::{GridError, GridResult};
use crate::loader::ParticleLoader;
use crate::stats::{GridCounters, StreamingStats};

/// Integer grid coordinate of a voxel cell.
///
/// Cell `(i, j, k)` spans world positions `[i*s, (i+1)*s)` along X and
/// likewise per axis, where `s` is the voxel edge length. The derived
/// `Ord` is lexicographic, which is what eviction tie-breaking wants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelCoord {
    /// Cell index along X.
    pub x: i32,
    /// Cell index along Y.
    pub y: i32,
    /// Cell index along Z.
    pub z: i32,
}

impl VoxelCoord {
    /// Creates a new coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing a world position.
    #[inline]
    #[must_use]
    pub fn from_world_pos(pos: Vec3, voxel_size: f32) -> Self {
        Self {
            x: (pos.x / voxel_size).floor() as i32,
            y: (pos.y / voxel_size).floor() as i32,
            z: (pos.z / voxel_size).floor() as i32,
        }
    }

    /// This coordinate displaced by whole cells.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// World-space bounds of the cell.
    #[inline]
    #[must_use]
    pub fn bounds(self, voxel_size: f32) -> (Vec3, Vec3) {
        let min = Vec3::new(
            self.x as f32 * voxel_size,
            self.y as f32 * voxel_size,
            self.z as f32 * voxel_size,
        );
        let max = min + Vec3::new(voxel_size, voxel_size, voxel_size);
        (min, max)
    }

    /// World-space centre of the cell.
    #[inline]
    #[must_use]
    pub fn center(self, voxel_size: f32) -> Vec3 {
        Vec3::new(
            (self.x as f32 + 0.5) * voxel_size,
            (self.y as f32 + 0.5) * voxel_size,
            (self.z as f32 + 0.5) * voxel_size,
        )
    }
}

/// One voxel of the frame output: the handle data a renderer needs to draw
/// its particle sub-range at the selected level of detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    /// Grid coordinate of the voxel.
    pub coord: VoxelCoord,
    /// Selected level of detail (never `Culled`; those are dropped).
    pub level: LodLevel,
    /// Absolute offset of the voxel's slice in the particle store.
    pub particle_offset: u32,
    /// Number of particles in the slice.
    pub particle_count: u16,
}

/// The streaming spatial index.
pub struct StreamingGrid {
    config: StreamConfig,
    /// Residency map. Written only inside `update_camera` and the flag
    /// traversals; queries snapshot under the read side.
    voxels: RwLock<HashMap<VoxelCoord, Box<CompactVoxel>>>,
    /// Camera position at the last non-gated update. Also serializes
    /// updates: the lock is held across the whole mutation.
    last_pos: Mutex<Option<Vec3>>,
    pool: Arc<VoxelPool>,
    store: Arc<ParticleStore>,
    loader: Arc<dyn ParticleLoader>,
    counters: GridCounters,
}

impl StreamingGrid {
    /// Creates a grid over the given pool, store and loader.
    ///
    /// # Errors
    ///
    /// Rejects invalid configurations - in particular any without
    /// hysteresis (`unload_radius <= stream_radius`).
    pub fn new(
        config: StreamConfig,
        pool: Arc<VoxelPool>,
        store: Arc<ParticleStore>,
        loader: Arc<dyn ParticleLoader>,
    ) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            config,
            voxels: RwLock::new(HashMap::with_capacity(config.max_loaded_voxels)),
            last_pos: Mutex::new(None),
            pool,
            store,
            loader,
            counters: GridCounters::default(),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    // =========================================================================
    // CAMERA UPDATE
    // =========================================================================

    /// Realigns residency with a new camera position.
    ///
    /// Ordering within one update is fixed: evict beyond the unload radius,
    /// load inside the stream radius, then enforce the residency budget.
    /// Returns `Ok(false)` when the movement gate coalesced the update
    /// (camera moved less than half a voxel since the last mutation).
    ///
    /// # Errors
    ///
    /// Rejects a NaN or non-finite position with no state mutation.
    pub fn update_camera(&self, pos: Vec3) -> GridResult<bool> {
        if !pos.is_finite() {
            return Err(GridError::InvalidCameraPose);
        }

        let mut last_pos = self.last_pos.lock();
        if let Some(last) = *last_pos {
            if pos.distance(last) < self.config.voxel_size * 0.5 {
                return Ok(false);
            }
        }

        let mut voxels = self.voxels.write();
        self.evict_far(&mut voxels, pos);
        self.load_near(&mut voxels, pos);
        self.enforce_budget(&mut voxels, pos);

        *last_pos = Some(pos);
        self.refresh_memory(voxels.len());
        Ok(true)
    }

    /// Evicts every resident voxel whose centre lies beyond the unload
    /// radius. Runs before loading so the budget check is usually a no-op.
    fn evict_far(&self, voxels: &mut HashMap<VoxelCoord, Box<CompactVoxel>>, pos: Vec3) {
        let unload = self.config.unload_radius;
        let size = self.config.voxel_size;

        let far: Vec<VoxelCoord> = voxels
            .keys()
            .filter(|coord| coord.center(size).distance(pos) > unload)
            .copied()
            .collect();

        if !far.is_empty() {
            tracing::debug!(count = far.len(), "evicting voxels beyond unload radius");
        }
        for coord in far {
            self.evict_one(voxels, coord);
        }
    }

    /// Loads every absent cell of the stream sphere around `pos`.
    ///
    /// The candidate cube has half-extent `h = ceil(stream_radius /
    /// voxel_size)` cells around the camera's cell; a cell is admitted when
    /// its lattice distance satisfies `dx^2 + dy^2 + dz^2 <= h^2`. Load
    /// order is the natural cell-iteration order, but nothing may depend on
    /// that - a failed cell never affects its neighbours.
    fn load_near(&self, voxels: &mut HashMap<VoxelCoord, Box<CompactVoxel>>, pos: Vec3) {
        let size = self.config.voxel_size;
        let camera_cell = VoxelCoord::from_world_pos(pos, size);
        let h = (self.config.stream_radius / size).ceil() as i32;

        let mut missing = Vec::new();
        for dx in -h..=h {
            for dy in -h..=h {
                for dz in -h..=h {
                    let coord = camera_cell.offset(dx, dy, dz);
                    if voxels.contains_key(&coord) {
                        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    if dx * dx + dy * dy + dz * dz > h * h {
                        continue;
                    }
                    missing.push(coord);
                }
            }
        }
        if missing.is_empty() {
            return;
        }

        // Acquire records up front so the loader only ever hands back a
        // span; it never touches a voxel it does not own.
        let mut pending = Vec::with_capacity(missing.len());
        for &coord in &missing {
            let (min, max) = coord.bounds(size);
            let mut voxel = self.pool.get_with_bounds(min, max);
            voxel.set_streaming(true);
            pending.push(voxel);
        }

        let results = self.loader.load_batch(&missing);
        debug_assert_eq!(results.len(), missing.len());

        for ((coord, mut voxel), result) in missing.into_iter().zip(pending).zip(results) {
            self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
            match result {
                Ok(span) if span.len as usize > MAX_PARTICLES_PER_VOXEL => {
                    // Oversized spans cannot be addressed by the 16-bit
                    // count field; hand the slice straight back.
                    tracing::warn!(?coord, len = span.len, "loader span exceeds voxel limit");
                    self.loader.release(span);
                    voxel.set_evicted(true);
                    self.pool.put(voxel);
                }
                Ok(span) => {
                    voxel.set_particle_range(span.offset, span.len as u16);
                    voxel.set_streaming(false);
                    voxels.insert(coord, voxel);
                    self.counters.streamed_in.fetch_add(1, Ordering::Relaxed);
                }
                Err(error) => {
                    // Reported, not raised: the voxel goes back to the pool
                    // with `evicted` set and the cell simply isn't resident.
                    tracing::warn!(?coord, %error, "voxel load failed");
                    voxel.set_evicted(true);
                    self.pool.put(voxel);
                }
            }
        }
    }

    /// Evicts farthest-first until residency fits the configured budget.
    ///
    /// Uses partial selection rather than a full sort; only the boundary
    /// between keep and evict matters. Ties on distance break by
    /// lexicographic coordinate so tests see one deterministic outcome.
    fn enforce_budget(&self, voxels: &mut HashMap<VoxelCoord, Box<CompactVoxel>>, pos: Vec3) {
        let excess = voxels.len().saturating_sub(self.config.max_loaded_voxels);
        if excess == 0 {
            return;
        }
        tracing::debug!(excess, "residency budget exceeded; forcing eviction");

        let size = self.config.voxel_size;
        let mut by_priority: Vec<(f32, VoxelCoord)> = voxels
            .keys()
            .map(|&coord| (coord.center(size).distance_squared(pos), coord))
            .collect();

        // Highest eviction priority first: greater distance, then greater
        // coordinate.
        by_priority.select_nth_unstable_by(excess - 1, |a, b| {
            b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1))
        });

        for &(_, coord) in &by_priority[..excess] {
            self.evict_one(voxels, coord);
        }
    }

    /// Removes one voxel: releases its particle slice, returns the record
    /// to the pool, bumps the eviction counter.
    fn evict_one(&self, voxels: &mut HashMap<VoxelCoord, Box<CompactVoxel>>, coord: VoxelCoord) {
        if let Some(mut voxel) = voxels.remove(&coord) {
            let span = ParticleSpan::new(voxel.particle_offset(), u32::from(voxel.particle_count()));
            self.loader.release(span);
            voxel.set_evicted(true);
            self.pool.put(voxel);
            self.counters.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Refreshes the memory gauge: resident records plus live particles.
    fn refresh_memory(&self, resident: usize) {
        let bytes = resident * CompactVoxel::SIZE + self.store.used_bytes();
        self.counters
            .memory_used_bytes
            .store(bytes, Ordering::Relaxed);
    }

    // =========================================================================
    // PER-FRAME FLAG TRAVERSALS
    // =========================================================================

    /// Applies a visibility predicate to every resident voxel.
    ///
    /// Sets each voxel's `visible` flag from the predicate and returns the
    /// visible coordinates in lexicographic order, so the frame output is
    /// identical for identical camera input regardless of map iteration
    /// order. Output capacity starts at `max(100, n/100)` - measured
    /// selectivity on typical camera paths is 1-3%.
    pub fn apply_visibility<F>(&self, mut test: F) -> Vec<VoxelCoord>
    where
        F: FnMut(&CompactVoxel) -> bool,
    {
        let mut voxels = self.voxels.write();
        let mut visible = Vec::with_capacity(100.max(voxels.len() / 100));

        for (&coord, voxel) in voxels.iter_mut() {
            let inside = test(voxel);
            voxel.set_visible(inside);
            if inside {
                visible.push(coord);
            }
        }
        visible.sort_unstable();
        visible
    }

    /// Writes LOD levels for the given voxels and emits the frame entries.
    ///
    /// `classify` sees each voxel in input order; voxels classified
    /// [`LodLevel::Culled`] get the level recorded but are dropped from the
    /// output.
    pub fn apply_lod<F>(&self, coords: &[VoxelCoord], mut classify: F) -> Vec<FrameEntry>
    where
        F: FnMut(&CompactVoxel) -> LodLevel,
    {
        let mut voxels = self.voxels.write();
        let mut entries = Vec::with_capacity(coords.len());

        for &coord in coords {
            let Some(voxel) = voxels.get_mut(&coord) else {
                continue;
            };
            let level = classify(voxel);
            voxel.set_lod_level(level);
            if level != LodLevel::Culled {
                entries.push(FrameEntry {
                    coord,
                    level,
                    particle_offset: voxel.particle_offset(),
                    particle_count: voxel.particle_count(),
                });
            }
        }
        entries
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Voxel containing a world position, if resident. O(1) map lookup.
    #[must_use]
    pub fn get_voxel_at(&self, x: f32, y: f32, z: f32) -> Option<CompactVoxel> {
        let coord = VoxelCoord::from_world_pos(Vec3::new(x, y, z), self.config.voxel_size);
        self.get_voxel(coord)
    }

    /// Voxel at a grid coordinate, if resident.
    #[must_use]
    pub fn get_voxel(&self, coord: VoxelCoord) -> Option<CompactVoxel> {
        self.voxels.read().get(&coord).map(|voxel| **voxel)
    }

    /// Snapshot of every resident voxel.
    #[must_use]
    pub fn loaded_voxels(&self) -> Vec<(VoxelCoord, CompactVoxel)> {
        self.voxels
            .read()
            .iter()
            .map(|(&coord, voxel)| (coord, **voxel))
            .collect()
    }

    /// Snapshot of resident voxels with the visible flag set.
    #[must_use]
    pub fn visible_voxels(&self) -> Vec<(VoxelCoord, CompactVoxel)> {
        self.voxels
            .read()
            .iter()
            .filter(|(_, voxel)| voxel.is_visible())
            .map(|(&coord, voxel)| (coord, **voxel))
            .collect()
    }

    /// Number of resident voxels.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.voxels.read().len()
    }

    /// Snapshot of the residency statistics.
    #[must_use]
    pub fn stats(&self) -> StreamingStats {
        let (loaded, visible) = {
            let voxels = self.voxels.read();
            let visible = voxels.values().filter(|voxel| voxel.is_visible()).count();
            (voxels.len(), visible)
        };
        StreamingStats {
            loaded,
            visible,
            streamed_in: self.counters.streamed_in.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            memory_used_bytes: self.counters.memory_used_bytes.load(Ordering::Relaxed),
        }
    }

    /// Empties the grid for a dataset switch.
    ///
    /// Cancels in-flight loads, returns every resident voxel to the pool,
    /// releases every particle slice, and resets statistics and the
    /// movement gate.
    pub fn clear(&self) {
        self.loader.cancel_pending();

        let mut last_pos = self.last_pos.lock();
        let mut voxels = self.voxels.write();
        let count = voxels.len();

        let mut batch = Vec::with_capacity(count);
        for (_, mut voxel) in voxels.drain() {
            let span = ParticleSpan::new(voxel.particle_offset(), u32::from(voxel.particle_count()));
            self.loader.release(span);
            voxel.set_evicted(true);
            batch.push(voxel);
        }
        self.pool.put_batch(batch);

        *last_pos = None;
        self.counters.reset();
        self.refresh_memory(0);
        tracing::info!(released = count, "streaming grid cleared");
    }
}
