//! Particle loading.
//!
//! The grid treats loading as an external collaborator behind the
//! [`ParticleLoader`] contract: given a voxel coordinate, produce the span
//! of that voxel's particles in the store, and reclaim spans on eviction.
//! What a "particle" is biologically - a base pair, a short read - is the
//! loader's business; the grid never looks inside the records.
//!
//! Two implementations ship with the engine: a deterministic synthetic
//! generator (tests, benches, demos) and a worker-pool adapter that fans a
//! batch of loads over threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use helix_core::{Particle, ParticleSpan, ParticleStore, StoreError};
use helix_shared::constants::MAX_PARTICLES_PER_VOXEL;

use crate::grid::VoxelCoord;

/// Golden angle in radians; successive particles advance by it around the
/// spiral so the cloud stays evenly distributed at every truncation.
const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Errors reported by a loader. Reported to the grid, never raised past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The particle store could not hold the voxel's particles.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The data source reported a permanent failure for this coordinate.
    #[error("load failed: {0}")]
    Failed(String),
    /// The load was discarded by a dataset switch.
    #[error("load cancelled by dataset switch")]
    Cancelled,
}

/// The loading contract consumed by the streaming grid.
///
/// Implementations may read disk, hit the network, or synthesize data; the
/// grid only requires that a span comes back (or an error) in bounded time
/// and that `release` makes the span reusable.
pub trait ParticleLoader: Send + Sync {
    /// Produces the particles belonging to a voxel and returns their span
    /// in the particle store. May return an empty span.
    ///
    /// # Errors
    ///
    /// Store exhaustion and data-source failures are reported here; the
    /// grid drops the affected voxel back to the pool and carries on.
    fn load(&self, coord: VoxelCoord) -> Result<ParticleSpan, LoadError>;

    /// Returns a span to the store's freelist. Must accept the empty span.
    fn release(&self, span: ParticleSpan);

    /// Loads a batch of coordinates, returning results in input order.
    ///
    /// The default runs loads sequentially; [`ThreadedLoader`] overrides
    /// this to fan out over its worker pool.
    fn load_batch(&self, coords: &[VoxelCoord]) -> Vec<Result<ParticleSpan, LoadError>> {
        coords.iter().map(|&coord| self.load(coord)).collect()
    }

    /// Discards work queued before this call (dataset switch). Loads
    /// completing afterwards for the old dataset must report
    /// [`LoadError::Cancelled`] instead of producing a span.
    fn cancel_pending(&self) {}
}

// =============================================================================
// SYNTHETIC GENERATOR
// =============================================================================

/// Deterministic synthetic dataset: a golden-angle spiral of particles per
/// voxel, keyed by a logical linear (genomic) coordinate.
///
/// Same voxel coordinate, same particles - always. Tests, benchmarks and
/// demos all rely on that.
pub struct SyntheticLoader {
    store: Arc<ParticleStore>,
    /// Voxel edge length; must match the grid's configuration.
    voxel_size: f32,
    /// Particles generated per voxel (clamped to the 16-bit record limit).
    particles_per_voxel: usize,
    /// Dataset seed folded into every cell's RNG stream.
    seed: u64,
    /// Reusable generation buffer; loads from worker threads take turns.
    scratch: Mutex<Vec<Particle>>,
}

impl SyntheticLoader {
    /// Creates a generator over the given store.
    ///
    /// `particles_per_voxel` is clamped to the per-voxel record limit.
    #[must_use]
    pub fn new(
        store: Arc<ParticleStore>,
        voxel_size: f32,
        particles_per_voxel: usize,
        seed: u64,
    ) -> Self {
        let clamped = particles_per_voxel.min(MAX_PARTICLES_PER_VOXEL);
        Self {
            store,
            voxel_size,
            particles_per_voxel: clamped,
            seed,
            scratch: Mutex::new(Vec::with_capacity(clamped)),
        }
    }

    /// Stable hash of a cell coordinate.
    fn cell_hash(&self, coord: VoxelCoord) -> u64 {
        let mixed = (coord.x.wrapping_mul(73_856_093))
            ^ (coord.y.wrapping_mul(19_349_663))
            ^ (coord.z.wrapping_mul(83_492_791));
        self.seed ^ (mixed as u32 as u64)
    }

    /// Base-class color palette: one color per residue class of the
    /// logical coordinate.
    const fn base_color(linear: u64) -> [u8; 4] {
        match linear % 4 {
            0 => [64, 200, 96, 255],  // adenine green
            1 => [72, 120, 255, 255], // cytosine blue
            2 => [255, 196, 48, 255], // guanine amber
            _ => [236, 64, 80, 255],  // thymine red
        }
    }

    /// Fills `out` with the spiral for one cell.
    fn generate_into(&self, coord: VoxelCoord, out: &mut Vec<Particle>) {
        out.clear();

        let hash = self.cell_hash(coord);
        let mut rng = ChaCha8Rng::seed_from_u64(hash);

        let center = coord.center(self.voxel_size);
        let half = self.voxel_size * 0.5;
        // Disjoint linear ranges per cell: 16 bits of headroom covers the
        // maximum per-voxel particle count.
        let linear_base = hash << 16;

        let count = self.particles_per_voxel;
        for i in 0..count {
            let t = (i as f32 + 0.5) / count as f32;
            let angle = i as f32 * GOLDEN_ANGLE;

            // Spiral sweeps the cell bottom to top while the radius walks
            // outward; sqrt keeps the area density uniform.
            let radius = half * 0.95 * t.sqrt();
            let position = [
                center.x + radius * angle.cos(),
                center.y + (t - 0.5) * self.voxel_size * 0.95,
                center.z + radius * angle.sin(),
            ];

            let linear = linear_base + i as u64;
            let size = 0.8 + 0.4 * rng.gen::<f32>();
            out.push(Particle::new(position, Self::base_color(linear), size, linear));
        }
    }
}

impl ParticleLoader for SyntheticLoader {
    fn load(&self, coord: VoxelCoord) -> Result<ParticleSpan, LoadError> {
        let mut scratch = self.scratch.lock();
        self.generate_into(coord, &mut scratch);
        Ok(self.store.alloc(&scratch)?)
    }

    fn release(&self, span: ParticleSpan) {
        self.store.free(span);
    }
}

// =============================================================================
// WORKER POOL ADAPTER
// =============================================================================

/// A load job travelling to a worker thread.
struct Job {
    /// Generation the job was submitted under.
    generation: u64,
    /// Position of the coordinate in its batch.
    index: usize,
    /// Cell to load.
    coord: VoxelCoord,
    /// Per-batch reply channel.
    reply: Sender<(usize, Result<ParticleSpan, LoadError>)>,
}

/// Fans batched loads over a bounded worker pool.
///
/// The grid still observes a synchronous `load_batch`; the workers only
/// bound its wall-clock time. A generation counter implements
/// cancellation: `cancel_pending` bumps it, and workers discard any job
/// submitted under an older generation instead of touching the store.
pub struct ThreadedLoader {
    inner: Arc<dyn ParticleLoader>,
    jobs: Option<Sender<Job>>,
    workers: Vec<std::thread::JoinHandle<()>>,
    generation: Arc<AtomicU64>,
}

impl ThreadedLoader {
    /// Spawns `workers` threads over the wrapped loader.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero.
    #[must_use]
    pub fn new(inner: Arc<dyn ParticleLoader>, workers: usize) -> Self {
        assert!(workers > 0, "worker pool needs at least one thread");

        let (tx, rx) = unbounded::<Job>();
        let generation = Arc::new(AtomicU64::new(0));

        let handles = (0..workers)
            .map(|_| {
                let rx = rx.clone();
                let inner = Arc::clone(&inner);
                let generation = Arc::clone(&generation);
                std::thread::spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let result = if job.generation == generation.load(Ordering::Acquire) {
                            inner.load(job.coord)
                        } else {
                            Err(LoadError::Cancelled)
                        };
                        // A dropped reply channel means the batch gave up;
                        // nothing to do with the result then.
                        let _ = job.reply.send((job.index, result));
                    }
                })
            })
            .collect();

        Self {
            inner,
            jobs: Some(tx),
            workers: handles,
            generation,
        }
    }
}

impl ParticleLoader for ThreadedLoader {
    fn load(&self, coord: VoxelCoord) -> Result<ParticleSpan, LoadError> {
        // Single loads skip the pool; there is nothing to overlap with.
        self.inner.load(coord)
    }

    fn release(&self, span: ParticleSpan) {
        self.inner.release(span);
    }

    fn load_batch(&self, coords: &[VoxelCoord]) -> Vec<Result<ParticleSpan, LoadError>> {
        let Some(jobs) = self.jobs.as_ref() else {
            return coords.iter().map(|_| Err(LoadError::Cancelled)).collect();
        };

        let generation = self.generation.load(Ordering::Acquire);
        let (reply_tx, reply_rx) = bounded(coords.len().max(1));

        let mut results: Vec<Result<ParticleSpan, LoadError>> =
            vec![Err(LoadError::Cancelled); coords.len()];

        let mut submitted = 0usize;
        for (index, &coord) in coords.iter().enumerate() {
            let job = Job {
                generation,
                index,
                coord,
                reply: reply_tx.clone(),
            };
            if jobs.send(job).is_ok() {
                submitted += 1;
            }
        }
        drop(reply_tx);

        for _ in 0..submitted {
            let Ok((index, result)) = reply_rx.recv() else {
                break;
            };
            results[index] = result;
        }
        results
    }

    fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::Release);
        self.inner.cancel_pending();
    }
}

impl Drop for ThreadedLoader {
    fn drop(&mut self) {
        // Disconnect the job channel so workers drain and exit.
        self.jobs = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_over(store: &Arc<ParticleStore>, per_voxel: usize) -> SyntheticLoader {
        SyntheticLoader::new(Arc::clone(store), 100.0, per_voxel, 42)
    }

    #[test]
    fn test_synthetic_load_is_deterministic() {
        let store = Arc::new(ParticleStore::new(10_000));
        let loader = loader_over(&store, 100);
        let coord = VoxelCoord::new(3, -1, 7);

        let a = loader.load(coord).unwrap();
        let b = loader.load(coord).unwrap();
        assert_ne!(a.offset, b.offset);

        let first = store.with_slice(a, <[Particle]>::to_vec).unwrap();
        let second = store.with_slice(b, <[Particle]>::to_vec).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_synthetic_particles_stay_inside_cell() {
        let store = Arc::new(ParticleStore::new(10_000));
        let loader = loader_over(&store, 500);
        let coord = VoxelCoord::new(-2, 0, 5);

        let span = loader.load(coord).unwrap();
        assert_eq!(span.len, 500);

        let (min, max) = coord.bounds(100.0);
        store
            .with_slice(span, |particles| {
                for p in particles {
                    assert!(p.position[0] >= min.x && p.position[0] <= max.x);
                    assert!(p.position[1] >= min.y && p.position[1] <= max.y);
                    assert!(p.position[2] >= min.z && p.position[2] <= max.z);
                }
            })
            .unwrap();
    }

    #[test]
    fn test_synthetic_linear_coordinates_increase() {
        let store = Arc::new(ParticleStore::new(10_000));
        let loader = loader_over(&store, 64);

        let span = loader.load(VoxelCoord::new(0, 0, 0)).unwrap();
        store
            .with_slice(span, |particles| {
                for pair in particles.windows(2) {
                    assert_eq!(pair[1].meta, pair[0].meta + 1);
                }
            })
            .unwrap();
    }

    #[test]
    fn test_release_recycles_span() {
        let store = Arc::new(ParticleStore::new(200));
        let loader = loader_over(&store, 100);

        let a = loader.load(VoxelCoord::new(0, 0, 0)).unwrap();
        loader.release(a);
        let b = loader.load(VoxelCoord::new(1, 0, 0)).unwrap();
        assert_eq!(a.offset, b.offset);
    }

    #[test]
    fn test_per_voxel_count_is_clamped() {
        let store = Arc::new(ParticleStore::new(100_000));
        let loader = loader_over(&store, 1_000_000);
        let span = loader.load(VoxelCoord::new(0, 0, 0)).unwrap();
        assert_eq!(span.len as usize, MAX_PARTICLES_PER_VOXEL);
    }

    #[test]
    fn test_store_exhaustion_is_reported() {
        let store = Arc::new(ParticleStore::new(50));
        let loader = loader_over(&store, 100);
        let err = loader.load(VoxelCoord::new(0, 0, 0)).unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Exhausted { .. })));
    }

    #[test]
    fn test_threaded_batch_matches_sequential() {
        let store = Arc::new(ParticleStore::new(100_000));
        let synthetic = Arc::new(loader_over(&store, 50));
        let threaded = ThreadedLoader::new(synthetic.clone(), 4);

        let coords: Vec<_> = (0..16).map(|i| VoxelCoord::new(i, 0, -i)).collect();
        let results = threaded.load_batch(&coords);
        assert_eq!(results.len(), coords.len());

        for (coord, result) in coords.iter().zip(&results) {
            let span = result.as_ref().unwrap();
            assert_eq!(span.len, 50);

            // Contents must match a direct load of the same cell.
            let direct = synthetic.load(*coord).unwrap();
            let batched = store.with_slice(*span, <[Particle]>::to_vec).unwrap();
            let expected = store.with_slice(direct, <[Particle]>::to_vec).unwrap();
            assert_eq!(batched, expected);
        }
    }

    #[test]
    fn test_cancel_then_new_batch_still_loads() {
        let store = Arc::new(ParticleStore::new(10_000));
        let threaded = ThreadedLoader::new(Arc::new(loader_over(&store, 20)), 2);

        threaded.cancel_pending();

        let results = threaded.load_batch(&[VoxelCoord::new(1, 2, 3)]);
        assert!(results[0].is_ok());
    }
}
