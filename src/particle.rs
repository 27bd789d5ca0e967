//! The particle record shared by the pool, emitter and modifiers.
//!
//! Particles are plain data. Every field a modifier needs lives here so that
//! [`Modifier`](crate::Modifier)s can stay stateless and be shared by all
//! particles of a system.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};
use std::time::Duration;

/// A single 2D sprite particle.
///
/// A particle is either inactive (parked in a [`ParticlePool`](crate::ParticlePool)
/// with its fields reset) or active, in which case `age <= time_to_live`
/// until the driver releases it.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Position relative to the host container.
    pub position: Vec2,
    /// Units per second.
    pub velocity: Vec2,
    /// Per-particle acceleration drawn at emission, in units per second squared.
    ///
    /// Added to the system-wide acceleration by the motion step.
    pub acceleration: Vec2,
    /// Rotation in degrees, clockwise.
    pub angle: f32,
    /// Degrees per second.
    pub angular_velocity: f32,
    /// Visual size multiplier (1.0 = sprite size).
    pub scale: f32,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    /// RGBA tint, channels in `[0, 1]`.
    pub color: Vec4,
    /// Index into the system's sprite set.
    pub sprite: usize,
    /// How long the particle lives once activated.
    pub time_to_live: Duration,
    /// Time since activation.
    pub age: Duration,
    active: bool,
}

impl Particle {
    pub(crate) fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            scale: 1.0,
            alpha: 1.0,
            color: Vec4::ONE,
            sprite: 0,
            time_to_live: Duration::ZERO,
            age: Duration::ZERO,
            active: false,
        }
    }

    /// Whether the particle is currently owned by an emission.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Progress through the lifetime, clamped to `[0, 1]`.
    pub fn life_fraction(&self) -> f32 {
        if self.time_to_live.is_zero() {
            return 1.0;
        }
        let fraction = self.age.as_secs_f64() / self.time_to_live.as_secs_f64();
        (fraction as f32).clamp(0.0, 1.0)
    }

    /// Whether the particle has reached its time to live.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.age >= self.time_to_live
    }

    pub(crate) fn activate(&mut self, time_to_live: Duration) {
        *self = Self::new();
        self.time_to_live = time_to_live;
        self.active = true;
    }

    pub(crate) fn deactivate(&mut self) {
        *self = Self::new();
    }

    /// Clamp NaN and out-of-range values back to valid bounds.
    ///
    /// Returns `true` if anything had to be changed.
    pub fn sanitize(&mut self) -> bool {
        let before = (
            self.position,
            self.velocity,
            self.acceleration,
            self.angle,
            self.angular_velocity,
            self.scale,
            self.alpha,
            self.color,
        );

        self.position = finite_vec2(self.position);
        self.velocity = finite_vec2(self.velocity);
        self.acceleration = finite_vec2(self.acceleration);
        self.angle = finite_or_zero(self.angle);
        self.angular_velocity = finite_or_zero(self.angular_velocity);
        self.scale = finite_or_zero(self.scale).max(0.0);
        self.alpha = unit(self.alpha);
        self.color = Vec4::new(
            unit(self.color.x),
            unit(self.color.y),
            unit(self.color.z),
            unit(self.color.w),
        );

        // Compare bitwise so a NaN that got replaced counts as a change.
        let after = (
            self.position,
            self.velocity,
            self.acceleration,
            self.angle,
            self.angular_velocity,
            self.scale,
            self.alpha,
            self.color,
        );
        bits(before) != bits(after)
    }

    /// GPU-friendly snapshot of the renderable state.
    pub fn instance(&self) -> ParticleInstance {
        let alpha = self.alpha * self.color.w;
        ParticleInstance {
            position: self.position.to_array(),
            scale: self.scale,
            angle: self.angle,
            color: [
                self.color.x * alpha,
                self.color.y * alpha,
                self.color.z * alpha,
                alpha,
            ],
            sprite: self.sprite as u32,
            _padding: [0; 3],
        }
    }
}

/// Renderable particle state laid out for direct upload to a vertex buffer.
///
/// Color is premultiplied by the particle alpha.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// Position relative to the host container.
    pub position: [f32; 2],
    /// Size multiplier.
    pub scale: f32,
    /// Rotation in degrees.
    pub angle: f32,
    /// Premultiplied RGBA.
    pub color: [f32; 4],
    /// Sprite index.
    pub sprite: u32,
    _padding: [u32; 3],
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn finite_vec2(v: Vec2) -> Vec2 {
    Vec2::new(finite_or_zero(v.x), finite_or_zero(v.y))
}

fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

type Snapshot = (Vec2, Vec2, Vec2, f32, f32, f32, f32, Vec4);

fn bits(s: Snapshot) -> [u32; 14] {
    [
        s.0.x.to_bits(),
        s.0.y.to_bits(),
        s.1.x.to_bits(),
        s.1.y.to_bits(),
        s.2.x.to_bits(),
        s.2.y.to_bits(),
        s.3.to_bits(),
        s.4.to_bits(),
        s.5.to_bits(),
        s.6.to_bits(),
        s.7.x.to_bits(),
        s.7.y.to_bits(),
        s.7.z.to_bits(),
        s.7.w.to_bits(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_life_fraction() {
        let mut p = Particle::new();
        p.activate(Duration::from_millis(1000));
        assert_eq!(p.life_fraction(), 0.0);

        p.age = Duration::from_millis(250);
        assert!((p.life_fraction() - 0.25).abs() < 1e-6);

        p.age = Duration::from_millis(1500);
        assert_eq!(p.life_fraction(), 1.0);
        assert!(p.is_expired());
    }

    #[test]
    fn test_activate_resets_state() {
        let mut p = Particle::new();
        p.activate(Duration::from_secs(1));
        p.position = Vec2::new(3.0, 4.0);
        p.alpha = 0.2;
        p.acceleration = Vec2::new(0.0, 9.0);
        p.age = Duration::from_millis(900);

        p.activate(Duration::from_secs(2));
        assert!(p.is_active());
        assert_eq!(p.position, Vec2::ZERO);
        assert_eq!(p.alpha, 1.0);
        assert_eq!(p.acceleration, Vec2::ZERO);
        assert_eq!(p.age, Duration::ZERO);
        assert_eq!(p.time_to_live, Duration::from_secs(2));
    }

    #[test]
    fn test_sanitize_clamps_anomalies() {
        let mut p = Particle::new();
        p.position = Vec2::new(f32::NAN, 2.0);
        p.velocity = Vec2::new(f32::INFINITY, -1.0);
        p.acceleration = Vec2::new(2.0, f32::NEG_INFINITY);
        p.scale = -3.0;
        p.alpha = 4.0;
        p.color = Vec4::new(f32::NAN, 0.5, 2.0, -1.0);

        assert!(p.sanitize());
        assert_eq!(p.position, Vec2::new(0.0, 2.0));
        assert_eq!(p.velocity, Vec2::new(0.0, -1.0));
        assert_eq!(p.acceleration, Vec2::new(2.0, 0.0));
        assert_eq!(p.scale, 0.0);
        assert_eq!(p.alpha, 1.0);
        assert_eq!(p.color, Vec4::new(0.0, 0.5, 1.0, 0.0));

        // Already clean
        assert!(!p.sanitize());
    }

    #[test]
    fn test_instance_premultiplies() {
        let mut p = Particle::new();
        p.color = Vec4::new(1.0, 0.5, 0.0, 1.0);
        p.alpha = 0.5;
        p.sprite = 2;

        let instance = p.instance();
        assert_eq!(instance.color, [0.5, 0.25, 0.0, 0.5]);
        assert_eq!(instance.sprite, 2);

        let bytes: &[u8] = bytemuck::cast_slice(std::slice::from_ref(&instance));
        assert_eq!(bytes.len(), std::mem::size_of::<ParticleInstance>());
        assert_eq!(bytes.len(), 48);
    }
}
