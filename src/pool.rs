//! Fixed-capacity particle storage.
//!
//! All particles are allocated when the pool is built. Slots are tracked with
//! a free-index stack whose capacity is reserved up front, so acquiring and
//! releasing never touch the allocator.

use crate::error::{ConfigError, PoolError};
use crate::particle::Particle;
use std::time::Duration;

/// Index of a slot in a [`ParticlePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle(pub(crate) usize);

impl ParticleHandle {
    /// Slot index inside the pool.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of reusable particles.
///
/// # Example
///
/// ```ignore
/// let mut pool = ParticlePool::new(2)?;
/// let a = pool.acquire(Duration::from_secs(1)).unwrap();
/// let b = pool.acquire(Duration::from_secs(1)).unwrap();
/// assert!(pool.acquire(Duration::from_secs(1)).is_none()); // exhausted
/// pool.release(a)?;
/// ```
#[derive(Debug)]
pub struct ParticlePool {
    slots: Vec<Particle>,
    /// Free slot indices, popped from the back.
    free: Vec<usize>,
}

impl ParticlePool {
    /// Pre-allocate `capacity` particles.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let slots = (0..capacity).map(|_| Particle::new()).collect();
        // Reversed so the lowest slot is handed out first.
        let mut free = Vec::with_capacity(capacity);
        free.extend((0..capacity).rev());
        Ok(Self { slots, free })
    }

    /// Maximum number of simultaneously active particles.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active particles.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of free slots.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Whether every slot is in use.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }

    /// Activate a free particle with the given time to live.
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn acquire(&mut self, time_to_live: Duration) -> Option<ParticleHandle> {
        let index = self.free.pop()?;
        self.slots[index].activate(time_to_live);
        Some(ParticleHandle(index))
    }

    /// Return an active particle to the free set.
    pub fn release(&mut self, handle: ParticleHandle) -> Result<(), PoolError> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(handle.0)
            .ok_or(PoolError::OutOfRange {
                index: handle.0,
                capacity,
            })?;
        if !slot.is_active() {
            return Err(PoolError::NotActive(handle.0));
        }
        slot.deactivate();
        self.free.push(handle.0);
        Ok(())
    }

    /// Force-release every active particle. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_active() {
                slot.deactivate();
                self.free.push(index);
                released += 1;
            }
        }
        released
    }

    /// Active particle behind `handle`.
    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slots.get(handle.0).filter(|p| p.is_active())
    }

    /// Mutable active particle behind `handle`.
    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.slots.get_mut(handle.0).filter(|p| p.is_active())
    }

    /// Live particles in slot order.
    pub fn active_particles(&self) -> ActiveParticles<'_> {
        ActiveParticles {
            slots: self.slots.iter(),
            remaining: self.active_count(),
        }
    }

    /// Handles of live particles in slot order.
    pub fn active_handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active())
            .map(|(i, _)| ParticleHandle(i))
    }
}

/// Iterator over the live particles of a pool, in slot order.
#[derive(Clone, Debug)]
pub struct ActiveParticles<'a> {
    slots: std::slice::Iter<'a, Particle>,
    remaining: usize,
}

impl<'a> Iterator for ActiveParticles<'a> {
    type Item = &'a Particle;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let particle = self.slots.find(|p| p.is_active())?;
        self.remaining -= 1;
        Some(particle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ActiveParticles<'_> {}
