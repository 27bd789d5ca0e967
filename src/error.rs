//! Error types for leonids.
//!
//! Configuration problems are reported when a system is built or an option is
//! applied. Nothing here is raised from inside a tick: per-particle anomalies
//! are clamped by [`Particle::sanitize`](crate::Particle::sanitize) and pool
//! exhaustion simply caps emission.

use crate::surface::ContainerId;
use thiserror::Error;

/// Invalid construction or option parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No sprites were supplied.
    #[error("Bitmap array can not be empty")]
    EmptySprites,
    /// The particle pool must hold at least one particle.
    #[error("maximum particle count must be positive")]
    ZeroCapacity,
    /// Particles must live for a non-zero duration.
    #[error("time to live must be positive")]
    NonPositiveTimeToLive,
    /// The host has no container with the requested id.
    #[error("no container with id {0:?}")]
    ContainerNotFound(ContainerId),
    /// A min/max pair where min is greater than max.
    #[error("invalid {name} range: {min} > {max}")]
    InvalidRange {
        /// Option the range belongs to.
        name: &'static str,
        /// Lower bound supplied.
        min: f32,
        /// Upper bound supplied.
        max: f32,
    },
    /// Finite bounds whose distance overflows `f32`.
    #[error("{name} range {min}..{max} is too wide")]
    RangeTooWide {
        /// Option the range belongs to.
        name: &'static str,
        /// Lower bound supplied.
        min: f32,
        /// Upper bound supplied.
        max: f32,
    },
    /// A parameter that must be finite was NaN or infinite.
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    /// A parameter that must not be negative was.
    #[error("{0} must not be negative")]
    Negative(&'static str),
    /// A curve needs at least one key.
    #[error("curve has no keys")]
    EmptyCurve,
    /// Curve key fractions live in `[0, 1]`.
    #[error("curve key {index} has fraction {fraction} outside [0, 1]")]
    FractionOutOfRange {
        /// Position of the offending key.
        index: usize,
        /// Fraction supplied.
        fraction: f32,
    },
    /// Curve keys must be sorted by fraction.
    #[error("curve key {index} ends at {fraction} before the previous key at {previous}")]
    UnorderedKeys {
        /// Position of the offending key.
        index: usize,
        /// Fraction of the key before it.
        previous: f32,
        /// Fraction supplied.
        fraction: f32,
    },
    /// A fade lasts longer than the particles live.
    #[error("fade of {fade_ms} ms exceeds time to live of {ttl_ms} ms")]
    FadeTooLong {
        /// Requested fade duration.
        fade_ms: u128,
        /// Configured time to live.
        ttl_ms: u128,
    },
    /// Fade-in and fade-out windows overlap.
    #[error("fade in and fade out overlap")]
    OverlappingFades,
    /// `launch` was called on a system configured without an emission.
    #[error("no emission configured")]
    MissingEmission,
    /// A configuration document failed to parse.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// An operation that is not valid in the current state.
///
/// The system is left untouched when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    /// `start` was called while emitting.
    #[error("particle system is already running")]
    AlreadyRunning,
    /// The system was detached from its host.
    #[error("particle system is not attached to a display surface")]
    Detached,
}

/// Internal consistency errors from [`ParticlePool`](crate::ParticlePool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Released a slot that is already free.
    #[error("particle {0} is not active")]
    NotActive(usize),
    /// The handle does not belong to this pool.
    #[error("particle {index} is out of range for a pool of {capacity}")]
    OutOfRange {
        /// Slot index of the handle.
        index: usize,
        /// Pool capacity.
        capacity: usize,
    },
}

/// Any error raised by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`StateError`].
    #[error(transparent)]
    State(#[from] StateError),
    /// See [`PoolError`].
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Result alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
