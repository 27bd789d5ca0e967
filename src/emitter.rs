//! Emission scheduling and particle initialization.
//!
//! The [`Emitter`] decides how many particles to activate each tick and gives
//! each one its starting state. Two modes are available:
//!
//! | Mode | Description |
//! |------|-------------|
//! | [`EmissionMode::Burst`] | Activate `count` particles once, when emission begins |
//! | [`EmissionMode::Rate`] | Activate `floor(rate * t)` particles by emission time `t` |
//!
//! Rate emission is scheduled from the cumulative target rather than per-tick
//! increments, so fractional particles carry over between ticks and the total
//! does not depend on how the host slices time.
//!
//! When the pool runs out of free slots the excess of a batch is dropped and
//! counted in [`Emitter::dropped`]. Dropped particles are not made up later.
//!
//! # Example
//!
//! ```ignore
//! let settings = EmitterSettings {
//!     area: SpawnArea::Point(Vec2::new(200.0, 300.0)),
//!     velocity: Velocity::Polar {
//!         speed: ValueRange::new(50.0, 120.0),
//!         angle: ValueRange::new(180.0, 360.0),
//!     },
//!     ..EmitterSettings::new(3, Duration::from_millis(800))
//! };
//! let mut emitter = Emitter::new(settings, EmissionMode::rate(30.0), StdRng::seed_from_u64(7))?;
//! ```

use crate::error::ConfigError;
use crate::modifier::{apply_chain, Modifier};
use crate::particle::Particle;
use crate::pool::ParticlePool;
use crate::surface::Rect;
use bitflags::bitflags;
use glam::{Vec2, Vec4};
use log::trace;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive `min..=max` range sampled uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl ValueRange {
    /// Range from `min` to `max`.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range that always yields `value`.
    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Check bounds are finite and ordered, and that `max - min` is finite.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NonFinite(name));
        }
        if self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        // Uniform sampling works on the span
        if !(self.max - self.min).is_finite() {
            return Err(ConfigError::RangeTooWide {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Draw a value.
    #[inline]
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    /// Multiply both bounds by `factor`.
    pub(crate) fn scaled(self, factor: f32) -> Self {
        Self::new(self.min * factor, self.max * factor)
    }
}

bitflags! {
    /// Where on a host view emission happens.
    ///
    /// An axis without any flag spans the whole view along that axis.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Gravity: u32 {
        /// Left edge.
        const LEFT = 1 << 0;
        /// Right edge.
        const RIGHT = 1 << 1;
        /// Horizontal center.
        const CENTER_HORIZONTAL = 1 << 2;
        /// Top edge.
        const TOP = 1 << 3;
        /// Bottom edge.
        const BOTTOM = 1 << 4;
        /// Vertical center.
        const CENTER_VERTICAL = 1 << 5;
        /// Center point.
        const CENTER = Self::CENTER_HORIZONTAL.bits() | Self::CENTER_VERTICAL.bits();
    }
}

/// Region new particles are placed in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnArea {
    /// A single point.
    Point(Vec2),
    /// Uniformly inside a rectangle.
    Rect {
        /// Minimum corner.
        min: Vec2,
        /// Maximum corner.
        max: Vec2,
    },
}

impl SpawnArea {
    /// Area of `rect` selected by `gravity`.
    pub fn from_rect(rect: Rect, gravity: Gravity) -> Self {
        let (min_x, max_x) = axis(
            rect.origin.x,
            rect.size.x,
            gravity,
            Gravity::LEFT,
            Gravity::RIGHT,
            Gravity::CENTER_HORIZONTAL,
        );
        let (min_y, max_y) = axis(
            rect.origin.y,
            rect.size.y,
            gravity,
            Gravity::TOP,
            Gravity::BOTTOM,
            Gravity::CENTER_VERTICAL,
        );
        if min_x == max_x && min_y == max_y {
            SpawnArea::Point(Vec2::new(min_x, min_y))
        } else {
            SpawnArea::Rect {
                min: Vec2::new(min_x, min_y),
                max: Vec2::new(max_x, max_y),
            }
        }
    }

    /// The same area moved by `-by`.
    pub fn relative_to(self, by: Vec2) -> Self {
        match self {
            SpawnArea::Point(p) => SpawnArea::Point(p - by),
            SpawnArea::Rect { min, max } => SpawnArea::Rect {
                min: min - by,
                max: max - by,
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SpawnArea::Point(p) if !p.is_finite() => Err(ConfigError::NonFinite("spawn point")),
            SpawnArea::Rect { min, max } => {
                ValueRange::new(min.x, max.x).validate("spawn area x")?;
                ValueRange::new(min.y, max.y).validate("spawn area y")
            }
            _ => Ok(()),
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Vec2 {
        match *self {
            SpawnArea::Point(p) => p,
            SpawnArea::Rect { min, max } => Vec2::new(
                ValueRange::new(min.x, max.x).sample(rng),
                ValueRange::new(min.y, max.y).sample(rng),
            ),
        }
    }
}

fn axis(start: f32, len: f32, gravity: Gravity, near: Gravity, far: Gravity, center: Gravity) -> (f32, f32) {
    if gravity.contains(near) {
        (start, start)
    } else if gravity.contains(far) {
        (start + len, start + len)
    } else if gravity.contains(center) {
        let mid = start + len / 2.0;
        (mid, mid)
    } else {
        (start, start + len)
    }
}

/// Initial velocity distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Velocity {
    /// Every particle gets the same velocity.
    Fixed(Vec2),
    /// Speed and direction drawn separately.
    ///
    /// Angles are in degrees, 0° to the right, clockwise. The particle's
    /// initial rotation becomes `angle + 90°` so sprites face their heading,
    /// unless an explicit initial rotation range is configured.
    Polar {
        /// Units per second.
        speed: ValueRange,
        /// Degrees.
        angle: ValueRange,
    },
    /// Each axis drawn separately.
    Components {
        /// Horizontal units per second.
        x: ValueRange,
        /// Vertical units per second.
        y: ValueRange,
    },
}

impl Velocity {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Velocity::Fixed(v) if !v.is_finite() => Err(ConfigError::NonFinite("velocity")),
            Velocity::Fixed(_) => Ok(()),
            Velocity::Polar { speed, angle } => {
                speed.validate("speed")?;
                angle.validate("angle")
            }
            Velocity::Components { x, y } => {
                x.validate("speed x")?;
                y.validate("speed y")
            }
        }
    }

    /// Returns the velocity and, for polar sampling, the heading in degrees.
    fn sample<R: Rng>(&self, rng: &mut R) -> (Vec2, Option<f32>) {
        match *self {
            Velocity::Fixed(v) => (v, None),
            Velocity::Polar { speed, angle } => {
                let speed = speed.sample(rng);
                let heading = angle.sample(rng);
                let (sin, cos) = heading.to_radians().sin_cos();
                (Vec2::new(speed * cos, speed * sin), Some(heading))
            }
            Velocity::Components { x, y } => (Vec2::new(x.sample(rng), y.sample(rng)), None),
        }
    }

    /// Multiply speeds by `factor`.
    pub(crate) fn scaled(self, factor: f32) -> Self {
        match self {
            Velocity::Fixed(v) => Velocity::Fixed(v * factor),
            Velocity::Polar { speed, angle } => Velocity::Polar {
                speed: speed.scaled(factor),
                angle,
            },
            Velocity::Components { x, y } => Velocity::Components {
                x: x.scaled(factor),
                y: y.scaled(factor),
            },
        }
    }
}

/// Per-particle acceleration, drawn once at emission.
///
/// A magnitude and a direction are sampled independently, like
/// [`Velocity::Polar`]. The result is stored on the particle and added to the
/// system-wide acceleration on every motion step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelerationRange {
    /// Units per second squared.
    pub magnitude: ValueRange,
    /// Degrees, 0° to the right, clockwise.
    pub angle: ValueRange,
}

impl AccelerationRange {
    /// Magnitude in `min..=max` along a direction in `min_angle..=max_angle`.
    pub const fn new(magnitude: ValueRange, angle: ValueRange) -> Self {
        Self { magnitude, angle }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.magnitude.validate("acceleration")?;
        self.angle.validate("acceleration angle")
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Vec2 {
        let magnitude = self.magnitude.sample(rng);
        let (sin, cos) = self.angle.sample(rng).to_radians().sin_cos();
        Vec2::new(magnitude * cos, magnitude * sin)
    }

    pub(crate) fn scaled(self, factor: f32) -> Self {
        Self {
            magnitude: self.magnitude.scaled(factor),
            angle: self.angle,
        }
    }
}

/// How sprites are assigned to new particles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteOrder {
    /// Cycle through the sprite set.
    RoundRobin,
    /// Pick uniformly at random.
    #[default]
    Random,
}

/// When and how many particles are emitted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionMode {
    /// Activate up to `count` particles once.
    Burst(u32),
    /// Continuous emission.
    Rate {
        /// Particles per second.
        per_second: f32,
        /// Stop after this long. `None` emits until stopped.
        duration: Option<Duration>,
    },
}

impl EmissionMode {
    /// Emit `per_second` until stopped.
    pub fn rate(per_second: f32) -> Self {
        EmissionMode::Rate {
            per_second,
            duration: None,
        }
    }

    /// Emit `per_second` for `duration`.
    pub fn rate_for(per_second: f32, duration: Duration) -> Self {
        EmissionMode::Rate {
            per_second,
            duration: Some(duration),
        }
    }

    /// Reject negative or non-finite rates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            EmissionMode::Burst(_) => Ok(()),
            EmissionMode::Rate { per_second, .. } => {
                if !per_second.is_finite() {
                    Err(ConfigError::NonFinite("emission rate"))
                } else if *per_second < 0.0 {
                    Err(ConfigError::Negative("emission rate"))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Starting state for emitted particles.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitterSettings {
    /// Where particles appear, relative to the host container.
    pub area: SpawnArea,
    /// Initial velocity.
    pub velocity: Velocity,
    /// Per-particle acceleration. `None` leaves it at zero.
    pub acceleration: Option<AccelerationRange>,
    /// Initial rotation in degrees. Overrides the polar heading.
    pub initial_rotation: Option<ValueRange>,
    /// Degrees per second.
    pub angular_velocity: ValueRange,
    /// Initial scale.
    pub initial_scale: ValueRange,
    /// Initial tint.
    pub color: Vec4,
    /// Lifetime of every particle.
    pub time_to_live: Duration,
    /// Number of sprites to choose from.
    pub sprite_count: usize,
    /// Sprite assignment policy.
    pub sprite_order: SpriteOrder,
    /// Wait this long after start before emitting.
    pub initial_delay: Duration,
}

impl EmitterSettings {
    /// Motionless particles at the origin.
    pub fn new(sprite_count: usize, time_to_live: Duration) -> Self {
        Self {
            area: SpawnArea::Point(Vec2::ZERO),
            velocity: Velocity::Fixed(Vec2::ZERO),
            acceleration: None,
            initial_rotation: None,
            angular_velocity: ValueRange::fixed(0.0),
            initial_scale: ValueRange::fixed(1.0),
            color: Vec4::ONE,
            time_to_live,
            sprite_count,
            sprite_order: SpriteOrder::default(),
            initial_delay: Duration::ZERO,
        }
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sprite_count == 0 {
            return Err(ConfigError::EmptySprites);
        }
        if self.time_to_live.is_zero() {
            return Err(ConfigError::NonPositiveTimeToLive);
        }
        self.area.validate()?;
        self.velocity.validate()?;
        if let Some(acceleration) = &self.acceleration {
            acceleration.validate()?;
        }
        if let Some(rotation) = &self.initial_rotation {
            rotation.validate("initial rotation")?;
        }
        self.angular_velocity.validate("rotation speed")?;
        self.initial_scale.validate("scale")?;
        if !self.color.is_finite() {
            return Err(ConfigError::NonFinite("color"));
        }
        Ok(())
    }
}

/// Decides emission per tick and initializes new particles.
#[derive(Debug)]
pub struct Emitter {
    settings: EmitterSettings,
    mode: EmissionMode,
    rng: StdRng,
    elapsed: Duration,
    /// Particles due so far in this emission, including dropped ones.
    scheduled: u64,
    activated: u64,
    dropped: u64,
    next_sprite: usize,
    burst_fired: bool,
    stopped: bool,
}

impl Emitter {
    /// Create an emitter. Emission begins on [`restart`](Self::restart).
    pub fn new(settings: EmitterSettings, mode: EmissionMode, rng: StdRng) -> Result<Self, ConfigError> {
        settings.validate()?;
        mode.validate()?;
        Ok(Self {
            settings,
            mode,
            rng,
            elapsed: Duration::ZERO,
            scheduled: 0,
            activated: 0,
            dropped: 0,
            next_sprite: 0,
            burst_fired: false,
            stopped: true,
        })
    }

    /// Begin a new emission in `mode`, resetting the emission clock.
    pub fn restart(&mut self, mode: EmissionMode) -> Result<(), ConfigError> {
        mode.validate()?;
        self.mode = mode;
        self.elapsed = Duration::ZERO;
        self.scheduled = 0;
        self.activated = 0;
        self.dropped = 0;
        self.burst_fired = false;
        self.stopped = false;
        Ok(())
    }

    /// Current settings.
    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    pub(crate) fn settings_mut(&mut self) -> &mut EmitterSettings {
        &mut self.settings
    }

    pub(crate) fn reseed(&mut self, rng: StdRng) {
        self.rng = rng;
    }

    /// Move the emission area. Takes effect for the next activation.
    pub fn set_area(&mut self, area: SpawnArea) -> Result<(), ConfigError> {
        area.validate()?;
        self.settings.area = area;
        Ok(())
    }

    /// Current mode.
    pub fn mode(&self) -> EmissionMode {
        self.mode
    }

    /// Time since the current emission began, including the initial delay.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Particles activated in the current emission.
    pub fn activated(&self) -> u64 {
        self.activated
    }

    /// Particles dropped because the pool was exhausted.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Advance the emission clock.
    pub fn advance(&mut self, delta: Duration) {
        self.elapsed += delta;
    }

    /// Halt emission. Idempotent.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether [`stop`](Self::stop) was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether this emission will not activate anything else.
    pub fn is_finished(&self) -> bool {
        if self.stopped {
            return true;
        }
        match self.mode {
            EmissionMode::Burst(_) => self.burst_fired,
            EmissionMode::Rate {
                duration: Some(duration),
                ..
            } => self.elapsed >= self.settings.initial_delay + duration,
            EmissionMode::Rate { duration: None, .. } => false,
        }
    }

    /// Number of particles due now.
    pub fn due(&self) -> u64 {
        if self.stopped {
            return 0;
        }
        let Some(emitting) = self.elapsed.checked_sub(self.settings.initial_delay) else {
            return 0;
        };
        match self.mode {
            EmissionMode::Burst(count) => {
                if self.burst_fired {
                    0
                } else {
                    u64::from(count)
                }
            }
            EmissionMode::Rate {
                per_second,
                duration,
            } => {
                let emitting = duration.map_or(emitting, |d| emitting.min(d));
                rate_target(per_second, emitting).saturating_sub(self.scheduled)
            }
        }
    }

    /// Activate the particles due now. Returns how many were activated.
    ///
    /// Each new particle is initialized and run through `modifiers` with a
    /// zero delta so that its first render matches the start of its curves.
    pub fn emit(&mut self, pool: &mut ParticlePool, modifiers: &[Modifier]) -> u64 {
        let due = self.due();
        if self.elapsed >= self.settings.initial_delay && matches!(self.mode, EmissionMode::Burst(_)) {
            self.burst_fired = true;
        }
        if due == 0 {
            return 0;
        }
        self.scheduled += due;

        let mut activated = 0;
        while activated < due {
            let Some(handle) = pool.acquire(self.settings.time_to_live) else {
                break;
            };
            if let Some(particle) = pool.get_mut(handle) {
                self.initialize(particle);
                apply_chain(modifiers, particle, Duration::ZERO);
            }
            activated += 1;
        }

        let dropped = due - activated;
        if dropped > 0 {
            trace!("pool exhausted, dropped {} of {} particles", dropped, due);
        }
        self.activated += activated;
        self.dropped += dropped;
        activated
    }

    fn initialize(&mut self, particle: &mut Particle) {
        let settings = &self.settings;
        let rng = &mut self.rng;

        particle.sprite = match settings.sprite_order {
            SpriteOrder::RoundRobin => {
                let sprite = self.next_sprite % settings.sprite_count;
                self.next_sprite = (sprite + 1) % settings.sprite_count;
                sprite
            }
            SpriteOrder::Random => rng.gen_range(0..settings.sprite_count),
        };
        particle.position = settings.area.sample(rng);

        let (velocity, heading) = settings.velocity.sample(rng);
        particle.velocity = velocity;
        if let Some(acceleration) = &settings.acceleration {
            particle.acceleration = acceleration.sample(rng);
        }
        particle.angle = match settings.initial_rotation {
            Some(range) => range.sample(rng),
            None => heading.map_or(0.0, |h| h + 90.0),
        };
        particle.angular_velocity = settings.angular_velocity.sample(rng);
        particle.scale = settings.initial_scale.sample(rng);
        particle.color = settings.color;
    }
}

/// `floor(per_second * emitting)`, computed exactly.
///
/// The rate is decomposed into `mantissa * 2^exponent` so the product with
/// the nanosecond count is done in integers. Saturates at `u64::MAX`.
fn rate_target(per_second: f32, emitting: Duration) -> u64 {
    if !per_second.is_finite() || per_second <= 0.0 {
        return 0;
    }
    let bits = per_second.to_bits();
    let exponent = ((bits >> 23) & 0xff) as i32;
    let fraction = u128::from(bits & 0x7f_ffff);
    let (mantissa, shift) = if exponent == 0 {
        (fraction, -149)
    } else {
        (fraction | 0x80_0000, exponent - 150)
    };

    // < 2^24 * 2^95, no overflow
    let scaled = mantissa * emitting.as_nanos();
    let count = if shift >= 0 {
        match scaled.checked_mul(1u128 << shift) {
            Some(n) => n / NANOS_PER_SEC,
            None => return u64::MAX,
        }
    } else if -shift >= 98 {
        0
    } else {
        scaled / (NANOS_PER_SEC << -shift)
    };
    u64::try_from(count).unwrap_or(u64::MAX)
}

const NANOS_PER_SEC: u128 = 1_000_000_000;
