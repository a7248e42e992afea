//! # Particle Store
//!
//! A single contiguous arena of particle records. Voxels never own
//! particles; they hold an `(offset, count)` span into this store.
//!
//! Allocation is best-fit from a freelist ordered by `(size, offset)`;
//! spans freed by eviction are handed back verbatim. Defragmentation is
//! deliberately absent - if fragmentation traps capacity the arena grows,
//! up to a configured hard cap, and exhaustion beyond that is a reported
//! error rather than a panic.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use thiserror::Error;

use crate::particle::Particle;

/// Errors reported by the particle store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The arena cannot satisfy an allocation even after honouring the
    /// freelist and growing to the hard cap.
    #[error("particle store exhausted: requested {requested}, live {live}, hard cap {hard_cap}")]
    Exhausted {
        /// Particles requested by the failed allocation.
        requested: usize,
        /// Particles currently live in the arena.
        live: usize,
        /// The configured growth ceiling, in particles.
        hard_cap: usize,
    },
}

/// A slice of the particle store: absolute offset plus length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParticleSpan {
    /// Absolute offset of the first particle.
    pub offset: u32,
    /// Number of particles.
    pub len: u32,
}

impl ParticleSpan {
    /// The empty span.
    pub const EMPTY: Self = Self { offset: 0, len: 0 };

    /// Creates a span.
    #[must_use]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Returns true if the span holds no particles.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Arena bookkeeping, guarded by the store's lock.
struct Inner {
    /// Backing storage. `0..particles.len()` is the live region.
    particles: Vec<Particle>,
    /// Freed spans as `(len, offset)`, ordered for best-fit lookup.
    free: BTreeSet<(u32, u32)>,
    /// Total particles sitting in the freelist.
    free_total: usize,
    /// Current soft capacity in particles; grows toward the hard cap.
    capacity: usize,
}

/// The particle store arena.
///
/// Loaders write (alloc), the streaming grid frees on eviction, and the
/// rendering collaborator reads. Reads borrow under the read lock, so a
/// span can never be reused out from under an in-progress read.
pub struct ParticleStore {
    inner: RwLock<Inner>,
    hard_cap: usize,
}

impl ParticleStore {
    /// Creates a store with the given capacity (in particles) and no
    /// headroom for growth.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_hard_cap(capacity, capacity)
    }

    /// Creates a store that may grow from `capacity` up to `hard_cap`
    /// particles when fragmentation traps capacity.
    ///
    /// # Panics
    ///
    /// Panics if `hard_cap < capacity`.
    #[must_use]
    pub fn with_hard_cap(capacity: usize, hard_cap: usize) -> Self {
        assert!(hard_cap >= capacity, "hard cap below initial capacity");
        Self {
            inner: RwLock::new(Inner {
                particles: Vec::with_capacity(capacity),
                free: BTreeSet::new(),
                free_total: 0,
                capacity,
            }),
            hard_cap,
        }
    }

    /// Copies `data` into the arena and returns its span.
    ///
    /// Order of attempts: best-fit freelist entry, then append into spare
    /// capacity, then growth toward the hard cap.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Exhausted`] when no strategy can place the data.
    pub fn alloc(&self, data: &[Particle]) -> Result<ParticleSpan, StoreError> {
        if data.is_empty() {
            return Ok(ParticleSpan::EMPTY);
        }

        let n = u32::try_from(data.len()).map_err(|_| StoreError::Exhausted {
            requested: data.len(),
            live: self.live_particles(),
            hard_cap: self.hard_cap,
        })?;

        let mut inner = self.inner.write();

        // Best fit: the smallest freed span that holds `n` particles.
        // Entries are not coalesced; steady-state eviction churn frees and
        // reacquires same-sized spans, which best-fit reuses exactly.
        if let Some(&(len, offset)) = inner.free.range((n, 0)..).next() {
            inner.free.remove(&(len, offset));
            inner.free_total -= n as usize;

            let leftover = len - n;
            if leftover > 0 {
                inner.free.insert((leftover, offset + n));
            }

            let start = offset as usize;
            inner.particles[start..start + data.len()].copy_from_slice(data);
            return Ok(ParticleSpan::new(offset, n));
        }

        // Append into spare capacity, growing if the hard cap allows.
        let live_end = inner.particles.len();
        let needed = live_end + data.len();
        if needed > inner.capacity {
            if needed > self.hard_cap {
                return Err(StoreError::Exhausted {
                    requested: data.len(),
                    live: live_end - inner.free_total,
                    hard_cap: self.hard_cap,
                });
            }
            let grown = (inner.capacity * 2).clamp(needed, self.hard_cap);
            tracing::debug!(
                from = inner.capacity,
                to = grown,
                "particle store growing under fragmentation pressure"
            );
            inner.capacity = grown;
        }

        let offset = u32::try_from(live_end).map_err(|_| StoreError::Exhausted {
            requested: data.len(),
            live: live_end - inner.free_total,
            hard_cap: self.hard_cap,
        })?;
        inner.particles.extend_from_slice(data);
        Ok(ParticleSpan::new(offset, n))
    }

    /// Returns a span to the freelist. Freeing the empty span is a no-op.
    pub fn free(&self, span: ParticleSpan) {
        if span.is_empty() {
            return;
        }

        let mut inner = self.inner.write();
        debug_assert!(
            (span.offset as usize + span.len as usize) <= inner.particles.len(),
            "freed span out of the live region"
        );
        inner.free.insert((span.len, span.offset));
        inner.free_total += span.len as usize;
    }

    /// Runs `f` over the span's particles under the read lock.
    ///
    /// Returns `None` when the span does not lie inside the live region.
    /// The borrow is scoped to the closure, so eviction on another thread
    /// cannot reuse the span mid-read.
    pub fn with_slice<R>(&self, span: ParticleSpan, f: impl FnOnce(&[Particle]) -> R) -> Option<R> {
        let inner = self.inner.read();
        let start = span.offset as usize;
        let slice = inner.particles.get(start..start + span.len as usize)?;
        Some(f(slice))
    }

    /// Particles currently reachable from some voxel span.
    #[must_use]
    pub fn live_particles(&self) -> usize {
        let inner = self.inner.read();
        inner.particles.len() - inner.free_total
    }

    /// Bytes held by live particles; feeds the grid's memory statistics.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.live_particles() * Particle::SIZE
    }

    /// Current soft capacity in particles.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }

    /// The growth ceiling in particles.
    #[must_use]
    pub const fn hard_cap(&self) -> usize {
        self.hard_cap
    }

    /// Drops every span and resets the arena. Backing memory is kept.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.particles.clear();
        inner.free.clear();
        inner.free_total = 0;
    }
}
