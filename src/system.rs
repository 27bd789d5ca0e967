//! The user-facing particle system.
//!
//! [`ParticleSystem`] ties a pool, an emitter and a modifier chain to a host
//! [`Container`]. It is configured with consuming `with_*` methods, started
//! with one of the emission calls and then advanced by the host once per
//! frame with [`update`](ParticleSystem::update).
//!
//! # Example
//!
//! ```ignore
//! let mut sparks = ParticleSystem::new(view, 200, sprites, Duration::from_millis(800))?
//!     .with_speed_range(0.1, 0.3)?
//!     .with_acceleration(0.0002, 90.0)?
//!     .with_fade_out(Duration::from_millis(300))?;
//!
//! sparks.one_shot(tap.x, tap.y, 60)?;
//!
//! // In the host's frame callback
//! sparks.update(time.update());
//! ```
//!
//! # Coordinates
//!
//! Emission points are window coordinates. They are converted to container
//! coordinates with [`Container::origin`]. Speeds and accelerations are given
//! in density-independent units and multiplied by [`Container::density`].

use crate::config::SystemConfig;
use crate::curve::{Curve, Easing};
use crate::driver::{AnimationDriver, DriverState, TickReport};
use crate::emitter::{
    AccelerationRange, EmissionMode, Emitter, EmitterSettings, Gravity, SpawnArea, SpriteOrder, ValueRange, Velocity,
};
use crate::error::{ConfigError, StateError};
use crate::modifier::{motion, Modifier};
use crate::pool::{ActiveParticles, ParticlePool};
use crate::surface::{Container, ContainerId, Host, Rect, SurfaceHandle};
use glam::{Vec2, Vec4};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Tick length used to run a prewarm ahead of the first frame.
pub const PREWARM_STEP: Duration = Duration::from_millis(33);

/// A particle effect bound to a host container.
pub struct ParticleSystem<C: Container> {
    container: Option<C>,
    surface: Option<SurfaceHandle>,
    sprites: Vec<C::Sprite>,
    driver: AnimationDriver,
    density: f32,
    motion_slot: Option<usize>,
    rotation_slot: Option<usize>,
    fade_slot: Option<usize>,
    fade_in: Duration,
    fade_out: Duration,
    fade_easing: Easing,
    prewarm: Duration,
    emission: Option<EmissionMode>,
}

impl<C: Container> ParticleSystem<C> {
    /// Create a system drawing over `container`.
    ///
    /// `max_particles` slots are allocated up front. Every particle lives for
    /// `time_to_live`.
    pub fn new(
        container: C,
        max_particles: usize,
        sprites: Vec<C::Sprite>,
        time_to_live: Duration,
    ) -> Result<Self, ConfigError> {
        if sprites.is_empty() {
            return Err(ConfigError::EmptySprites);
        }
        let pool = ParticlePool::new(max_particles)?;
        let settings = EmitterSettings::new(sprites.len(), time_to_live);
        let emitter = Emitter::new(settings, EmissionMode::Burst(0), StdRng::from_entropy())?;
        let driver = AnimationDriver::new(pool, emitter, Vec::new())?;

        let mut density = container.density();
        if !density.is_finite() || density <= 0.0 {
            warn!("container reported density {}, using 1.0", density);
            density = 1.0;
        }

        Ok(Self {
            container: Some(container),
            surface: None,
            sprites,
            driver,
            density,
            motion_slot: None,
            rotation_slot: None,
            fade_slot: None,
            fade_in: Duration::ZERO,
            fade_out: Duration::ZERO,
            fade_easing: Easing::Linear,
            prewarm: Duration::ZERO,
            emission: None,
        })
    }

    /// Create a system drawing over the host's content container.
    pub fn from_host<H>(
        host: &mut H,
        max_particles: usize,
        sprites: Vec<C::Sprite>,
        time_to_live: Duration,
    ) -> Result<Self, ConfigError>
    where
        H: Host<Container = C>,
    {
        Self::from_host_with_container(host, max_particles, sprites, time_to_live, ContainerId::CONTENT)
    }

    /// Create a system drawing over the host container with id `id`.
    pub fn from_host_with_container<H>(
        host: &mut H,
        max_particles: usize,
        sprites: Vec<C::Sprite>,
        time_to_live: Duration,
        id: ContainerId,
    ) -> Result<Self, ConfigError>
    where
        H: Host<Container = C>,
    {
        if sprites.is_empty() {
            return Err(ConfigError::EmptySprites);
        }
        let container = host
            .find_container(id)
            .ok_or(ConfigError::ContainerNotFound(id))?;
        Self::new(container, max_particles, sprites, time_to_live)
    }

    /// Create a system from a configuration document.
    pub fn from_config(
        container: C,
        sprites: Vec<C::Sprite>,
        config: &SystemConfig,
    ) -> Result<Self, ConfigError> {
        let system = Self::new(container, config.max_particles, sprites, config.time_to_live())?;
        config.apply(system)
    }

    // ========== Options ==========

    /// Random speed between `min` and `max` in any direction.
    pub fn with_speed_range(self, min: f32, max: f32) -> Result<Self, ConfigError> {
        self.with_speed_and_angle_range(min, max, 0.0, 360.0)
    }

    /// Random speed and heading.
    ///
    /// Angles are degrees, 0° pointing right, increasing clockwise. When
    /// `max_angle < min_angle` the range wraps through 360°, so `(300, 60)`
    /// covers the 120° around the right.
    pub fn with_speed_and_angle_range(
        mut self,
        min_speed: f32,
        max_speed: f32,
        min_angle: f32,
        max_angle: f32,
    ) -> Result<Self, ConfigError> {
        let speed = ValueRange::new(min_speed, max_speed);
        speed.validate("speed")?;
        if min_speed < 0.0 {
            return Err(ConfigError::Negative("speed"));
        }
        let angle = angle_range(min_angle, max_angle, "angle")?;
        let speed = self.scaled(speed, "speed")?;

        self.settings_mut().velocity = Velocity::Polar { speed, angle };
        self.ensure_motion();
        Ok(self)
    }

    /// Random horizontal and vertical speeds, drawn separately.
    pub fn with_speed_by_components(
        mut self,
        min_x: f32,
        max_x: f32,
        min_y: f32,
        max_y: f32,
    ) -> Result<Self, ConfigError> {
        let x = ValueRange::new(min_x, max_x);
        let y = ValueRange::new(min_y, max_y);
        x.validate("speed x")?;
        y.validate("speed y")?;
        let x = self.scaled(x, "speed x")?;
        let y = self.scaled(y, "speed y")?;

        self.settings_mut().velocity = Velocity::Components { x, y };
        self.ensure_motion();
        Ok(self)
    }

    /// Constant acceleration of `magnitude` towards `angle` degrees.
    ///
    /// Calling this again replaces the previous acceleration.
    pub fn with_acceleration(mut self, magnitude: f32, angle: f32) -> Result<Self, ConfigError> {
        if !magnitude.is_finite() {
            return Err(ConfigError::NonFinite("acceleration"));
        }
        if !angle.is_finite() {
            return Err(ConfigError::NonFinite("acceleration angle"));
        }
        let (sin, cos) = angle.to_radians().sin_cos();
        let acceleration = Modifier::Acceleration(Vec2::new(cos, sin) * magnitude * self.density);
        acceleration.validate()?;

        self.ensure_motion();
        if let Some(slot) = self.motion_slot {
            self.driver.modifiers_mut()[slot] = acceleration;
        }
        Ok(self)
    }

    /// Give each particle its own acceleration, drawn at emission.
    ///
    /// The magnitude is drawn from `min..=max` and the direction from
    /// `min_angle..=max_angle` degrees, wrapping like
    /// [`with_speed_and_angle_range`](Self::with_speed_and_angle_range). It is
    /// added to the constant acceleration set by
    /// [`with_acceleration`](Self::with_acceleration).
    pub fn with_acceleration_range(
        mut self,
        min: f32,
        max: f32,
        min_angle: f32,
        max_angle: f32,
    ) -> Result<Self, ConfigError> {
        let magnitude = ValueRange::new(min, max);
        magnitude.validate("acceleration")?;
        let angle = angle_range(min_angle, max_angle, "acceleration angle")?;
        let magnitude = self.scaled(magnitude, "acceleration")?;

        self.settings_mut().acceleration = Some(AccelerationRange::new(magnitude, angle));
        self.ensure_motion();
        Ok(self)
    }

    /// Random initial rotation in degrees.
    ///
    /// Overrides the heading-aligned rotation of polar speeds.
    pub fn with_initial_rotation_range(mut self, min: f32, max: f32) -> Result<Self, ConfigError> {
        let range = ValueRange::new(min, max);
        range.validate("initial rotation")?;
        self.settings_mut().initial_rotation = Some(range);
        Ok(self)
    }

    /// Spin at `degrees_per_second`.
    pub fn with_rotation_speed(self, degrees_per_second: f32) -> Result<Self, ConfigError> {
        self.with_rotation_speed_range(degrees_per_second, degrees_per_second)
    }

    /// Spin at a random speed between `min` and `max` degrees per second.
    pub fn with_rotation_speed_range(mut self, min: f32, max: f32) -> Result<Self, ConfigError> {
        let range = ValueRange::new(min, max);
        range.validate("rotation speed")?;
        self.settings_mut().angular_velocity = range;
        self.ensure_rotation();
        Ok(self)
    }

    /// Change spin speed by `degrees_per_second_squared`.
    pub fn with_angular_acceleration(mut self, degrees_per_second_squared: f32) -> Result<Self, ConfigError> {
        let modifier = Modifier::Rotation {
            angular_acceleration: degrees_per_second_squared,
        };
        modifier.validate()?;

        self.ensure_rotation();
        if let Some(slot) = self.rotation_slot {
            self.driver.modifiers_mut()[slot] = modifier;
        }
        Ok(self)
    }

    /// Random initial scale between `min` and `max`.
    pub fn with_scale_range(mut self, min: f32, max: f32) -> Result<Self, ConfigError> {
        let range = ValueRange::new(min, max);
        range.validate("scale")?;
        if min < 0.0 {
            return Err(ConfigError::Negative("scale"));
        }
        self.settings_mut().initial_scale = range;
        Ok(self)
    }

    /// Scale from `start` at birth to `end` at expiry.
    pub fn with_scale(self, start: f32, end: f32) -> Result<Self, ConfigError> {
        let curve = Curve::from_keys(vec![(0.0, start), (1.0, end)])?;
        self.with_scale_curve(curve)
    }

    /// Scale over lifetime.
    pub fn with_scale_curve(self, curve: Curve<f32>) -> Result<Self, ConfigError> {
        self.with_modifier(Modifier::Scale(curve))
    }

    /// Fade to transparent over the last `duration` of each particle's life.
    pub fn with_fade_out(self, duration: Duration) -> Result<Self, ConfigError> {
        let easing = self.fade_easing;
        self.with_fade_out_eased(duration, easing)
    }

    /// Like [`with_fade_out`](Self::with_fade_out), shaping the fade with `easing`.
    ///
    /// Fade-in and fade-out share one alpha curve and therefore one easing;
    /// the last easing given applies to both windows.
    pub fn with_fade_out_eased(mut self, duration: Duration, easing: Easing) -> Result<Self, ConfigError> {
        self.set_fades(self.fade_in, duration, easing)?;
        Ok(self)
    }

    /// Fade from transparent over the first `duration` of each particle's life.
    pub fn with_fade_in(self, duration: Duration) -> Result<Self, ConfigError> {
        let easing = self.fade_easing;
        self.with_fade_in_eased(duration, easing)
    }

    /// Like [`with_fade_in`](Self::with_fade_in), shaping the fade with `easing`.
    pub fn with_fade_in_eased(mut self, duration: Duration, easing: Easing) -> Result<Self, ConfigError> {
        self.set_fades(duration, self.fade_out, easing)?;
        Ok(self)
    }

    /// Alpha over lifetime.
    pub fn with_alpha_curve(self, curve: Curve<f32>) -> Result<Self, ConfigError> {
        self.with_modifier(Modifier::Alpha(curve))
    }

    /// Initial RGBA tint, each channel in `[0, 1]`.
    pub fn with_color(mut self, color: Vec4) -> Result<Self, ConfigError> {
        if !color.is_finite() {
            return Err(ConfigError::NonFinite("color"));
        }
        self.settings_mut().color = color;
        Ok(self)
    }

    /// Tint over lifetime.
    pub fn with_color_curve(self, curve: Curve<Vec4>) -> Result<Self, ConfigError> {
        self.with_modifier(Modifier::Color(curve))
    }

    /// Append `modifier` to the chain.
    ///
    /// Motion and spin are integrated once per tick: an `Acceleration` or
    /// `Rotation` replaces the step the speed and rotation options install,
    /// in place, instead of adding a second one. Its values are used as
    /// given, without density scaling.
    pub fn with_modifier(mut self, modifier: Modifier) -> Result<Self, ConfigError> {
        modifier.validate()?;
        let slot = match modifier {
            Modifier::Acceleration(_) => &mut self.motion_slot,
            Modifier::Rotation { .. } => &mut self.rotation_slot,
            _ => {
                self.driver.modifiers_mut().push(modifier);
                return Ok(self);
            }
        };
        let modifiers = self.driver.modifiers_mut();
        match *slot {
            Some(index) => modifiers[index] = modifier,
            None => {
                *slot = Some(modifiers.len());
                modifiers.push(modifier);
            }
        }
        Ok(self)
    }

    /// Wait `delay` after each start before emitting.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.settings_mut().initial_delay = delay;
        self
    }

    /// How sprites are assigned to new particles.
    pub fn with_sprite_order(mut self, order: SpriteOrder) -> Self {
        self.settings_mut().sprite_order = order;
        self
    }

    /// Make emission reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.driver.emitter_mut().reseed(StdRng::seed_from_u64(seed));
        self
    }

    /// Simulate `duration` ahead whenever emission starts.
    pub fn with_prewarm(mut self, duration: Duration) -> Self {
        self.prewarm = duration;
        self
    }

    /// Emission used by [`launch`](Self::launch).
    pub fn with_emission(mut self, mode: EmissionMode) -> Result<Self, ConfigError> {
        mode.validate()?;
        self.emission = Some(mode);
        Ok(self)
    }

    // ========== Emission ==========

    /// Emit `per_second` particles from a point until stopped.
    pub fn emit(&mut self, x: f32, y: f32, per_second: f32) -> crate::Result<()> {
        self.start_at(SpawnArea::Point(Vec2::new(x, y)), EmissionMode::rate(per_second))
    }

    /// Emit `per_second` particles from a point for `duration`.
    pub fn emit_for(&mut self, x: f32, y: f32, per_second: f32, duration: Duration) -> crate::Result<()> {
        self.start_at(
            SpawnArea::Point(Vec2::new(x, y)),
            EmissionMode::rate_for(per_second, duration),
        )
    }

    /// Emit `count` particles from a point at once.
    pub fn one_shot(&mut self, x: f32, y: f32, count: u32) -> crate::Result<()> {
        self.start_at(SpawnArea::Point(Vec2::new(x, y)), EmissionMode::Burst(count))
    }

    /// Emit from the part of `rect` selected by `gravity`.
    ///
    /// `duration` of `None` emits until stopped.
    pub fn emit_from(
        &mut self,
        rect: Rect,
        gravity: Gravity,
        per_second: f32,
        duration: Option<Duration>,
    ) -> crate::Result<()> {
        let mode = EmissionMode::Rate {
            per_second,
            duration,
        };
        self.start_at(SpawnArea::from_rect(rect, gravity), mode)
    }

    /// Emit `count` particles at once from the part of `rect` selected by `gravity`.
    pub fn one_shot_from(&mut self, rect: Rect, gravity: Gravity, count: u32) -> crate::Result<()> {
        self.start_at(SpawnArea::from_rect(rect, gravity), EmissionMode::Burst(count))
    }

    /// Start the emission set with [`with_emission`](Self::with_emission).
    pub fn launch(&mut self, x: f32, y: f32) -> crate::Result<()> {
        let mode = self.emission.ok_or(ConfigError::MissingEmission)?;
        self.start_at(SpawnArea::Point(Vec2::new(x, y)), mode)
    }

    /// Move the emission point, e.g. to follow a finger.
    pub fn update_emit_point(&mut self, x: f32, y: f32) -> crate::Result<()> {
        self.move_area(SpawnArea::Point(Vec2::new(x, y)))
    }

    /// Move the emission area to the part of `rect` selected by `gravity`.
    pub fn update_emit_rect(&mut self, rect: Rect, gravity: Gravity) -> crate::Result<()> {
        self.move_area(SpawnArea::from_rect(rect, gravity))
    }

    // ========== Frame loop ==========

    /// Advance by `delta` and render.
    ///
    /// Once the last particle has expired the drawing surface is removed
    /// from the container.
    pub fn update(&mut self, delta: Duration) -> TickReport {
        let report = self.driver.tick(delta);

        if let (Some(container), Some(surface)) = (self.container.as_mut(), self.surface) {
            container.render(surface, self.driver.active_particles(), &self.sprites);
            if self.driver.state() == DriverState::Idle {
                container.detach_surface(surface);
                self.surface = None;
                debug!("effect finished, detached surface {:?}", surface);
            }
        }
        report
    }

    /// Stop emitting and let live particles run out. Idempotent.
    pub fn stop_emitting(&mut self) {
        self.driver.stop();
    }

    /// Remove every particle and the drawing surface immediately.
    ///
    /// Returns the number of particles removed.
    pub fn cancel(&mut self) -> usize {
        let released = self.driver.cancel();
        self.detach_surface();
        released
    }

    /// Cancel and hand the container back.
    ///
    /// Call this when the host view goes away. Later emission calls fail
    /// with [`StateError::Detached`].
    pub fn detach(&mut self) -> Option<C> {
        self.cancel();
        let container = self.container.take();
        if container.is_some() {
            debug!("detached from container");
        }
        container
    }

    // ========== Introspection ==========

    /// Driver state.
    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    /// Live particles.
    pub fn active_count(&self) -> usize {
        self.driver.pool().active_count()
    }

    /// Particles activated since the last start.
    pub fn activated_count(&self) -> u64 {
        self.driver.emitter().activated()
    }

    /// Particles dropped since the last start because the pool was full.
    pub fn dropped_count(&self) -> u64 {
        self.driver.emitter().dropped()
    }

    /// Pool capacity.
    pub fn capacity(&self) -> usize {
        self.driver.pool().capacity()
    }

    /// Live particles in slot order.
    pub fn active_particles(&self) -> ActiveParticles<'_> {
        self.driver.active_particles()
    }

    /// The modifier chain.
    pub fn modifiers(&self) -> &[Modifier] {
        self.driver.modifiers()
    }

    /// The sprite set.
    pub fn sprites(&self) -> &[C::Sprite] {
        &self.sprites
    }

    /// Emitter configuration.
    pub fn settings(&self) -> &EmitterSettings {
        self.driver.emitter().settings()
    }

    /// The host container, unless detached.
    pub fn container(&self) -> Option<&C> {
        self.container.as_ref()
    }

    /// Whether a drawing surface is currently attached.
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    // ========== Internals ==========

    fn settings_mut(&mut self) -> &mut EmitterSettings {
        self.driver.emitter_mut().settings_mut()
    }

    fn ensure_motion(&mut self) {
        if self.motion_slot.is_none() {
            let modifiers = self.driver.modifiers_mut();
            self.motion_slot = Some(modifiers.len());
            modifiers.push(motion());
        }
    }

    fn ensure_rotation(&mut self) {
        if self.rotation_slot.is_none() {
            let modifiers = self.driver.modifiers_mut();
            self.rotation_slot = Some(modifiers.len());
            modifiers.push(Modifier::Rotation {
                angular_acceleration: 0.0,
            });
        }
    }

    /// `range` multiplied by the container density, checked again since the
    /// product can overflow.
    fn scaled(&self, range: ValueRange, name: &'static str) -> Result<ValueRange, ConfigError> {
        let range = range.scaled(self.density);
        range.validate(name)?;
        Ok(range)
    }

    fn set_fades(&mut self, fade_in: Duration, fade_out: Duration, easing: Easing) -> Result<(), ConfigError> {
        let ttl = self.settings().time_to_live;
        for fade in [fade_in, fade_out] {
            if fade > ttl {
                return Err(ConfigError::FadeTooLong {
                    fade_ms: fade.as_millis(),
                    ttl_ms: ttl.as_millis(),
                });
            }
        }
        if fade_in + fade_out > ttl {
            return Err(ConfigError::OverlappingFades);
        }

        let fraction = |d: Duration| (d.as_secs_f64() / ttl.as_secs_f64()) as f32;
        let mut keys = Vec::with_capacity(4);
        if fade_in.is_zero() {
            keys.push((0.0, 1.0));
        } else {
            keys.push((0.0, 0.0));
            keys.push((fraction(fade_in), 1.0));
        }
        if !fade_out.is_zero() {
            keys.push((fraction(ttl - fade_out), 1.0));
            keys.push((1.0, 0.0));
        }
        let fade = Modifier::Alpha(Curve::from_keys(keys)?.with_easing(easing));

        let modifiers = self.driver.modifiers_mut();
        match self.fade_slot {
            Some(slot) => modifiers[slot] = fade,
            None => {
                self.fade_slot = Some(modifiers.len());
                modifiers.push(fade);
            }
        }
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self.fade_easing = easing;
        Ok(())
    }

    fn start_at(&mut self, area: SpawnArea, mode: EmissionMode) -> crate::Result<()> {
        let Some(container) = self.container.as_mut() else {
            return Err(StateError::Detached.into());
        };
        if self.driver.state() == DriverState::Running {
            return Err(StateError::AlreadyRunning.into());
        }
        mode.validate()?;

        let area = area.relative_to(container.origin());
        self.driver.emitter_mut().set_area(area)?;
        self.driver.start(mode)?;

        if self.surface.is_none() {
            let surface = container.attach_surface();
            debug!("attached surface {:?}", surface);
            self.surface = Some(surface);
        }
        if !self.prewarm.is_zero() {
            self.driver.prewarm(self.prewarm, PREWARM_STEP);
        }
        Ok(())
    }

    fn move_area(&mut self, area: SpawnArea) -> crate::Result<()> {
        let Some(container) = self.container.as_ref() else {
            return Err(StateError::Detached.into());
        };
        let area = area.relative_to(container.origin());
        self.driver.emitter_mut().set_area(area)?;
        Ok(())
    }

    fn detach_surface(&mut self) {
        if let (Some(container), Some(surface)) = (self.container.as_mut(), self.surface.take()) {
            container.detach_surface(surface);
            debug!("detached surface {:?}", surface);
        }
    }
}

/// Degrees from `min` to `max`, going clockwise through 360° when `max < min`.
fn angle_range(min: f32, max: f32, name: &'static str) -> Result<ValueRange, ConfigError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(ConfigError::NonFinite(name));
    }
    let max = if max < min {
        min + (max - min).rem_euclid(360.0)
    } else {
        max
    };
    let range = ValueRange::new(min, max);
    range.validate(name)?;
    Ok(range)
}
