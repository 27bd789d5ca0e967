//! The tick loop.
//!
//! [`AnimationDriver`] owns the pool, the emitter and the modifier chain and
//! advances them by whatever delta the host's tick source delivers.
//!
//! ```text
//!   start()          emitter finished / stop()       last particle expires
//! Idle ──────► Running ───────────────────────► Stopped ─────────────────────► Idle
//!   ▲                                                                            │
//!   └──────────────────────────── cancel() from any state ───────────────────────┘
//! ```

use crate::emitter::{EmissionMode, Emitter};
use crate::error::{ConfigError, StateError};
use crate::modifier::{apply_chain, Modifier};
use crate::pool::{ActiveParticles, ParticleHandle, ParticlePool};
use log::{debug, trace, warn};
use std::time::Duration;

/// Lifecycle state of an [`AnimationDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Not started, or fully drained.
    Idle,
    /// Emitting and animating.
    Running,
    /// Emission halted, remaining particles draining.
    Stopped,
}

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Particles activated this tick.
    pub activated: u64,
    /// Particles released because they reached their time to live.
    pub expired: usize,
    /// Particles whose state had to be clamped.
    pub sanitized: usize,
    /// Live particles after the tick.
    pub active: usize,
}

/// Drives emission and particle updates.
#[derive(Debug)]
pub struct AnimationDriver {
    state: DriverState,
    pool: ParticlePool,
    emitter: Emitter,
    modifiers: Vec<Modifier>,
    elapsed: Duration,
    frame: u64,
}

impl AnimationDriver {
    /// Assemble a driver. Every modifier is validated.
    pub fn new(pool: ParticlePool, emitter: Emitter, modifiers: Vec<Modifier>) -> Result<Self, ConfigError> {
        for modifier in &modifiers {
            modifier.validate()?;
        }
        Ok(Self {
            state: DriverState::Idle,
            pool,
            emitter,
            modifiers,
            elapsed: Duration::ZERO,
            frame: 0,
        })
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// The particle pool.
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// The emitter.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub(crate) fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    /// The modifier chain, in application order.
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub(crate) fn modifiers_mut(&mut self) -> &mut Vec<Modifier> {
        &mut self.modifiers
    }

    /// Live particles in slot order.
    pub fn active_particles(&self) -> ActiveParticles<'_> {
        self.pool.active_particles()
    }

    /// Time ticked since the last start.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Ticks processed since the last start.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Begin emitting in `mode`.
    ///
    /// Particles due at time zero (a burst without delay) are activated
    /// immediately. Starting while stopped keeps the draining particles.
    pub fn start(&mut self, mode: EmissionMode) -> crate::Result<()> {
        if self.state == DriverState::Running {
            return Err(StateError::AlreadyRunning.into());
        }
        self.emitter.restart(mode)?;
        self.elapsed = Duration::ZERO;
        self.frame = 0;
        self.state = DriverState::Running;

        let activated = self.emitter.emit(&mut self.pool, &self.modifiers);
        debug!("started {:?}, {} particles at t=0", mode, activated);
        Ok(())
    }

    /// Halt emission and let live particles expire. Idempotent.
    pub fn stop(&mut self) {
        if self.state == DriverState::Running {
            self.emitter.stop();
            self.state = DriverState::Stopped;
            debug!("stopped emitting, {} particles draining", self.pool.active_count());
        }
    }

    /// Return to idle immediately, releasing every particle.
    ///
    /// Returns the number of particles released.
    pub fn cancel(&mut self) -> usize {
        self.emitter.stop();
        let released = self.pool.release_all();
        if self.state != DriverState::Idle {
            debug!("cancelled, released {} particles", released);
        }
        self.state = DriverState::Idle;
        released
    }

    /// Advance by `delta`.
    ///
    /// Emits, ages every live particle, runs the modifier chain, and releases
    /// particles that reached their time to live. Does nothing while idle.
    pub fn tick(&mut self, delta: Duration) -> TickReport {
        let mut report = TickReport::default();
        if self.state == DriverState::Idle {
            return report;
        }

        self.elapsed += delta;
        self.frame += 1;

        if self.state == DriverState::Running {
            self.emitter.advance(delta);
            report.activated = self.emitter.emit(&mut self.pool, &self.modifiers);
        }

        for index in 0..self.pool.capacity() {
            let handle = ParticleHandle(index);
            let Some(particle) = self.pool.get_mut(handle) else {
                continue;
            };
            particle.age += delta;
            if apply_chain(&self.modifiers, particle, delta) {
                report.sanitized += 1;
            }
            if particle.is_expired() && self.pool.release(handle).is_ok() {
                report.expired += 1;
            }
        }
        if report.sanitized > 0 {
            warn!("clamped invalid state on {} particles", report.sanitized);
        }

        if self.state == DriverState::Running && self.emitter.is_finished() {
            self.state = DriverState::Stopped;
            debug!("emission finished after {:?}", self.elapsed);
        }
        report.active = self.pool.active_count();
        if self.state == DriverState::Stopped && report.active == 0 {
            self.state = DriverState::Idle;
            debug!("all particles expired, idle");
        }

        trace!(
            "frame {}: +{} -{} = {} active",
            self.frame,
            report.activated,
            report.expired,
            report.active
        );
        report
    }

    /// Run the simulation ahead by `duration` in steps of `step`.
    ///
    /// Used to start an effect "in the future" with particles already in
    /// flight. Only meaningful right after [`start`](Self::start).
    pub fn prewarm(&mut self, duration: Duration, step: Duration) {
        if step.is_zero() {
            return;
        }
        let mut remaining = duration;
        while !remaining.is_zero() && self.state != DriverState::Idle {
            let delta = remaining.min(step);
            self.tick(delta);
            remaining -= delta;
        }
    }
}
