//! Per-tick particle behaviors.
//!
//! Modifiers mutate every active particle once per tick, in the order they
//! were configured. Later modifiers see what earlier ones wrote, so order is
//! part of the effect: a `Scale` placed after `Acceleration` observes the moved
//! position, and two `Alpha` modifiers leave the second one's value.
//!
//! # Modifier Types
//!
//! | Type | Effect |
//! |------|--------|
//! | [`Modifier::Acceleration`] | Euler-integrates velocity and position |
//! | [`Modifier::Rotation`] | Integrates angle and angular velocity |
//! | [`Modifier::Scale`] | Scale over lifetime |
//! | [`Modifier::Alpha`] | Alpha over lifetime |
//! | [`Modifier::Color`] | Color over lifetime |

use crate::curve::Curve;
use crate::error::ConfigError;
use crate::particle::Particle;
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A stateless behavior applied to every active particle each tick.
///
/// All per-particle state lives on [`Particle`]; a modifier only holds the
/// parameters of its behavior and is shared by reference.
///
/// # Example
///
/// ```ignore
/// let chain = vec![
///     Modifier::Acceleration(Vec2::new(0.0, 98.0)),
///     Modifier::scale(1.0, 0.0),
///     Modifier::Alpha(Curve::from_keys(vec![(0.7, 1.0), (1.0, 0.0)])?),
/// ];
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// Constant acceleration in units per second².
    ///
    /// `velocity += (a + particle.acceleration) * dt`, then
    /// `position += velocity * dt`. Plain Euler steps: one per tick, no
    /// sub-stepping. The particle's own acceleration is the one drawn at
    /// emission, zero unless the emitter samples one.
    Acceleration(Vec2),

    /// Spin with angular acceleration in degrees per second².
    ///
    /// `angle += angular_velocity * dt`, then
    /// `angular_velocity += angular_acceleration * dt`.
    Rotation {
        /// Degrees per second².
        angular_acceleration: f32,
    },

    /// Scale as a function of life fraction.
    Scale(Curve<f32>),

    /// Alpha as a function of life fraction.
    Alpha(Curve<f32>),

    /// RGBA tint as a function of life fraction, per channel.
    Color(Curve<Vec4>),
}

impl Modifier {
    /// `lerp(start, end, age / time_to_live)`.
    pub fn scale(start: f32, end: f32) -> Self {
        Modifier::Scale(Curve::linear(start, end))
    }

    /// `lerp(start, end, age / time_to_live)` on alpha.
    pub fn alpha(start: f32, end: f32) -> Self {
        Modifier::Alpha(Curve::linear(start, end))
    }

    /// Short name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::Acceleration(_) => "acceleration",
            Modifier::Rotation { .. } => "rotation",
            Modifier::Scale(_) => "scale",
            Modifier::Alpha(_) => "alpha",
            Modifier::Color(_) => "color",
        }
    }

    /// Reject non-finite parameters.
    ///
    /// Curves are validated when they are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Modifier::Acceleration(a) if !a.is_finite() => {
                Err(ConfigError::NonFinite("acceleration"))
            }
            Modifier::Rotation {
                angular_acceleration,
            } if !angular_acceleration.is_finite() => {
                Err(ConfigError::NonFinite("angular acceleration"))
            }
            _ => Ok(()),
        }
    }

    /// Mutate `particle`.
    ///
    /// `elapsed` is the time since the particle was activated, `delta` the
    /// length of the current tick.
    pub fn apply(&self, particle: &mut Particle, elapsed: Duration, delta: Duration) {
        let dt = delta.as_secs_f32();
        match self {
            Modifier::Acceleration(acceleration) => {
                particle.velocity += (*acceleration + particle.acceleration) * dt;
                particle.position += particle.velocity * dt;
            }
            Modifier::Rotation {
                angular_acceleration,
            } => {
                particle.angle += particle.angular_velocity * dt;
                particle.angular_velocity += angular_acceleration * dt;
            }
            Modifier::Scale(curve) => {
                particle.scale = curve.sample(fraction(particle, elapsed));
            }
            Modifier::Alpha(curve) => {
                particle.alpha = curve.sample(fraction(particle, elapsed));
            }
            Modifier::Color(curve) => {
                particle.color = curve.sample(fraction(particle, elapsed));
            }
        }
    }
}

fn fraction(particle: &Particle, elapsed: Duration) -> f32 {
    if particle.time_to_live.is_zero() {
        return 1.0;
    }
    let t = elapsed.as_secs_f64() / particle.time_to_live.as_secs_f64();
    (t as f32).clamp(0.0, 1.0)
}

/// Run `modifiers` over `particle` in order, then clamp any anomaly.
///
/// Returns `true` if the particle needed sanitizing.
pub fn apply_chain(modifiers: &[Modifier], particle: &mut Particle, delta: Duration) -> bool {
    let elapsed = particle.age;
    for modifier in modifiers {
        modifier.apply(particle, elapsed, delta);
    }
    particle.sanitize()
}

/// Zero acceleration; integrates velocity into position without changing it.
pub(crate) fn motion() -> Modifier {
    Modifier::Acceleration(Vec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(ttl_ms: u64) -> Particle {
        let mut p = Particle::new();
        p.activate(Duration::from_millis(ttl_ms));
        p
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_acceleration_euler_step() {
        let mut p = live(1000);
        p.velocity = Vec2::new(10.0, 0.0);

        let m = Modifier::Acceleration(Vec2::new(0.0, 100.0));
        m.apply(&mut p, Duration::ZERO, Duration::from_millis(100));

        // v = (10, 10), x = v * 0.1
        assert!(approx(p.velocity.y, 10.0));
        assert!(approx(p.position.x, 1.0));
        assert!(approx(p.position.y, 1.0));
    }

    #[test]
    fn test_acceleration_adds_particle_acceleration() {
        let mut p = live(1000);
        p.acceleration = Vec2::new(50.0, 0.0);

        let m = Modifier::Acceleration(Vec2::new(0.0, 100.0));
        m.apply(&mut p, Duration::ZERO, Duration::from_millis(100));

        assert!(approx(p.velocity.x, 5.0));
        assert!(approx(p.velocity.y, 10.0));
        assert!(approx(p.position.x, 0.5));
    }

    #[test]
    fn test_rotation_integrates_before_accelerating() {
        let mut p = live(1000);
        p.angular_velocity = 90.0;

        let m = Modifier::Rotation {
            angular_acceleration: 180.0,
        };
        m.apply(&mut p, Duration::ZERO, Duration::from_millis(500));

        assert!(approx(p.angle, 45.0));
        assert!(approx(p.angular_velocity, 180.0));
    }

    #[test]
    fn test_scale_over_lifetime() {
        let mut p = live(1000);
        let m = Modifier::scale(1.0, 0.0);

        m.apply(&mut p, Duration::from_millis(250), Duration::ZERO);
        assert!(approx(p.scale, 0.75));

        m.apply(&mut p, Duration::from_millis(2000), Duration::ZERO);
        assert_eq!(p.scale, 0.0);
    }

    #[test]
    fn test_alpha_control_points() {
        let mut p = live(1000);
        let m = Modifier::Alpha(Curve::from_keys(vec![(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)]).unwrap());

        m.apply(&mut p, Duration::from_millis(250), Duration::ZERO);
        assert!(approx(p.alpha, 0.5));
        m.apply(&mut p, Duration::from_millis(500), Duration::ZERO);
        assert!(approx(p.alpha, 1.0));
        m.apply(&mut p, Duration::from_millis(875), Duration::ZERO);
        assert!(approx(p.alpha, 0.25));
    }

    #[test]
    fn test_color_over_lifetime() {
        let mut p = live(2000);
        let m = Modifier::Color(Curve::linear(Vec4::new(1.0, 1.0, 0.0, 1.0), Vec4::new(1.0, 0.0, 0.0, 1.0)));
        m.apply(&mut p, Duration::from_millis(1000), Duration::ZERO);
        assert!(approx(p.color.y, 0.5));
        assert!(approx(p.color.x, 1.0));
    }

    #[test]
    fn test_chain_order_is_observable() {
        let a = Modifier::alpha(1.0, 0.0);
        let b = Modifier::Alpha(Curve::constant(0.3));

        let mut p = live(1000);
        p.age = Duration::from_millis(500);
        apply_chain(&[a.clone(), b.clone()], &mut p, Duration::ZERO);
        assert!(approx(p.alpha, 0.3));

        apply_chain(&[b, a], &mut p, Duration::ZERO);
        assert!(approx(p.alpha, 0.5));
    }

    #[test]
    fn test_chain_sanitizes() {
        let mut p = live(1000);
        p.velocity = Vec2::new(f32::MAX, 0.0);
        let chain = [Modifier::Acceleration(Vec2::new(f32::MAX, 0.0))];

        assert!(apply_chain(&chain, &mut p, Duration::from_secs(10)));
        assert!(p.velocity.is_finite());
        assert!(p.position.is_finite());
    }

    #[test]
    fn test_validate_rejects_nan() {
        assert_eq!(
            Modifier::Acceleration(Vec2::new(f32::NAN, 0.0)).validate(),
            Err(ConfigError::NonFinite("acceleration"))
        );
        assert!(Modifier::Rotation {
            angular_acceleration: f32::INFINITY
        }
        .validate()
        .is_err());
        assert!(Modifier::scale(1.0, 2.0).validate().is_ok());
    }
}
