//! # leonids
//!
//! Pooled sprite particle effects drawn over a host's view hierarchy.
//!
//! A [`ParticleSystem`] owns a fixed pool of particles, an emitter that
//! activates them over time, and a chain of modifiers that animate them. The
//! host supplies the drawing side through [`Container`] and drives time by
//! calling [`ParticleSystem::update`] once per frame.
//!
//! ## Quick Start
//!
//! ```ignore
//! use leonids::prelude::*;
//!
//! let mut stars = ParticleSystem::new(view, 100, vec![star_bitmap], Duration::from_millis(800))?
//!     .with_speed_range(0.1, 0.25)?
//!     .with_rotation_speed_range(90.0, 180.0)?
//!     .with_fade_out(Duration::from_millis(200))?;
//!
//! stars.emit(x, y, 30.0)?;
//!
//! loop {
//!     stars.update(time.update());
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles and the pool
//!
//! Every particle is allocated up front in a [`ParticlePool`]. Emission only
//! activates free slots, and expiry returns them. When the pool is full,
//! excess particles are dropped and counted, never allocated.
//!
//! ### Emission
//!
//! | Call | Behavior |
//! |------|----------|
//! | [`emit`](ParticleSystem::emit) | `rate` per second until stopped |
//! | [`emit_for`](ParticleSystem::emit_for) | `rate` per second for a duration |
//! | [`one_shot`](ParticleSystem::one_shot) | `count` particles at once |
//! | [`emit_from`](ParticleSystem::emit_from) | Like `emit`, over an edge or area of a rectangle |
//!
//! ### Modifiers
//!
//! [`Modifier`]s run on every live particle each tick, in configuration
//! order: acceleration, rotation, and scale, alpha or color curves over the
//! particle's lifetime.
//!
//! ### Units
//!
//! Times are [`Duration`](std::time::Duration)s, rates are per second, and
//! angles are degrees measured clockwise from the positive x axis.
//!
//! ## Lifecycle
//!
//! [`DriverState`] moves `Idle → Running → Stopped → Idle`. The drawing
//! surface is attached on the first emission and removed when the last
//! particle expires, on [`cancel`](ParticleSystem::cancel), or on
//! [`detach`](ParticleSystem::detach).

pub mod config;
pub mod curve;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod modifier;
pub mod particle;
pub mod pool;
pub mod presets;
pub mod surface;
pub mod system;
pub mod time;

pub use bytemuck;
pub use config::{EmissionConfig, SystemConfig};
pub use curve::{Curve, Easing, Lerp};
pub use driver::{AnimationDriver, DriverState, TickReport};
pub use emitter::{
    AccelerationRange, EmissionMode, Emitter, EmitterSettings, Gravity, SpawnArea, SpriteOrder, ValueRange, Velocity,
};
pub use error::{ConfigError, Error, PoolError, Result, StateError};
pub use glam::{Vec2, Vec4};
pub use modifier::Modifier;
pub use particle::{Particle, ParticleInstance};
pub use pool::{ActiveParticles, ParticleHandle, ParticlePool};
pub use surface::{Container, ContainerId, Host, Rect, SurfaceHandle};
pub use system::ParticleSystem;
pub use time::Time;

/// Everything needed to build and drive an effect.
///
/// ```ignore
/// use leonids::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SystemConfig;
    pub use crate::curve::{Curve, Easing};
    pub use crate::driver::{DriverState, TickReport};
    pub use crate::emitter::{EmissionMode, Gravity, SpriteOrder};
    pub use crate::modifier::Modifier;
    pub use crate::particle::{Particle, ParticleInstance};
    pub use crate::presets;
    pub use crate::surface::{Container, ContainerId, Host, Rect, SurfaceHandle};
    pub use crate::system::ParticleSystem;
    pub use crate::time::Time;
    pub use crate::{Vec2, Vec4};
    pub use std::time::Duration;
}
