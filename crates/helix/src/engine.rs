//! The per-frame pipeline.

use std::sync::Arc;
use std::time::Instant;

use helix_core::{ParticleStore, VoxelPool};
use helix_render::{FrustumCuller, LodSelector};
use helix_shared::CameraPose;
use helix_stream::{
    FrameEntry, GridError, ParticleLoader, StreamingGrid, StreamingStats, SyntheticLoader,
};

use crate::config::{EngineConfig, EngineError};

/// Statistics for one rendered frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// Voxels resident after the streaming update.
    pub resident: usize,
    /// Voxels that survived frustum culling.
    pub visible: usize,
    /// Entries emitted to the renderer (visible minus LOD-culled).
    pub emitted: usize,
    /// True when the movement gate coalesced the streaming update.
    pub gated: bool,
    /// Wall-clock cost of the pipeline in milliseconds.
    pub frame_time_ms: f32,
}

impl FrameStats {
    /// Frustum selectivity: visible voxels over resident voxels.
    #[must_use]
    pub fn visibility_ratio(&self) -> f32 {
        if self.resident > 0 {
            self.visible as f32 / self.resident as f32
        } else {
            0.0
        }
    }
}

/// One frame's output: the ordered voxel entries a renderer draws, plus
/// the frame statistics.
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    /// Visible, non-culled voxels in lexicographic coordinate order.
    pub entries: Vec<FrameEntry>,
    /// Frame statistics.
    pub stats: FrameStats,
}

/// The engine facade: streaming grid, frustum culler and LOD selector
/// driven by one camera pose per frame.
pub struct Engine {
    pool: Arc<VoxelPool>,
    store: Arc<ParticleStore>,
    grid: StreamingGrid,
    culler: FrustumCuller,
    lod: LodSelector,
}

impl Engine {
    /// Builds an engine around a caller-supplied loader.
    ///
    /// The factory receives the engine's particle store so the loader can
    /// allocate spans from it.
    ///
    /// # Errors
    ///
    /// Rejects invalid configuration.
    pub fn new<F>(config: EngineConfig, make_loader: F) -> Result<Self, EngineError>
    where
        F: FnOnce(Arc<ParticleStore>) -> Arc<dyn ParticleLoader>,
    {
        config.validate()?;

        // Pre-warm one residency budget's worth of records so the first
        // camera update never touches the allocator.
        let pool = Arc::new(VoxelPool::with_capacity(config.stream.max_loaded_voxels));
        let store = Arc::new(ParticleStore::with_hard_cap(
            config.store.capacity,
            config.store.hard_cap,
        ));
        let loader = make_loader(Arc::clone(&store));
        let grid = StreamingGrid::new(
            config.stream,
            Arc::clone(&pool),
            Arc::clone(&store),
            loader,
        )?;
        let lod = LodSelector::new(config.lod)?;

        Ok(Self {
            pool,
            store,
            grid,
            culler: FrustumCuller::new(),
            lod,
        })
    }

    /// Builds an engine over the deterministic synthetic dataset.
    ///
    /// # Errors
    ///
    /// Rejects invalid configuration.
    pub fn with_synthetic_dataset(
        config: EngineConfig,
        particles_per_voxel: usize,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let voxel_size = config.stream.voxel_size;
        Self::new(config, |store| {
            Arc::new(SyntheticLoader::new(
                store,
                voxel_size,
                particles_per_voxel,
                seed,
            ))
        })
    }

    /// Runs the full pipeline for one frame.
    ///
    /// Streaming update, frustum cull, LOD select, emit - in that order.
    ///
    /// # Errors
    ///
    /// A NaN or non-finite pose is rejected with no state mutation.
    pub fn update_camera(&mut self, pose: &CameraPose) -> Result<FrameOutput, EngineError> {
        let start = Instant::now();
        if !pose.is_valid() {
            return Err(GridError::InvalidCameraPose.into());
        }

        let moved = self.grid.update_camera(pose.position)?;

        self.culler.update(pose);
        let culler = &self.culler;
        let visible = self.grid.apply_visibility(|voxel| culler.test_voxel(voxel));

        let lod = &self.lod;
        let camera = pose.position;
        let entries = self
            .grid
            .apply_lod(&visible, |voxel| lod.classify_voxel(voxel, camera));

        let stats = FrameStats {
            resident: self.grid.loaded_count(),
            visible: visible.len(),
            emitted: entries.len(),
            gated: !moved,
            frame_time_ms: start.elapsed().as_secs_f32() * 1000.0,
        };
        tracing::debug!(
            resident = stats.resident,
            visible = stats.visible,
            emitted = stats.emitted,
            gated = stats.gated,
            "frame"
        );

        Ok(FrameOutput { entries, stats })
    }

    /// Drops the whole dataset: cancels in-flight loads, empties the grid
    /// and the particle store. Used on dataset switch.
    pub fn clear(&self) {
        self.grid.clear();
    }

    /// The streaming grid (residency queries, statistics).
    #[must_use]
    pub const fn grid(&self) -> &StreamingGrid {
        &self.grid
    }

    /// Residency statistics snapshot.
    #[must_use]
    pub fn streaming_stats(&self) -> StreamingStats {
        self.grid.stats()
    }

    /// The particle store; renderers read emitted sub-ranges from it.
    #[must_use]
    pub const fn store(&self) -> &Arc<ParticleStore> {
        &self.store
    }

    /// The voxel pool; its reuse rate is the health metric for streaming.
    #[must_use]
    pub const fn pool(&self) -> &Arc<VoxelPool> {
        &self.pool
    }

    /// The LOD selector (band thresholds, stride iteration).
    #[must_use]
    pub const fn lod(&self) -> &LodSelector {
        &self.lod
    }
}
