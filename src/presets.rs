//! Ready-made effects.
//!
//! Each preset returns a [`SystemConfig`] that can be tweaked before it is
//! turned into a system:
//!
//! ```ignore
//! let mut confetti = ParticleSystem::from_config(view, sprites, &presets::confetti(60.0))?;
//! confetti.launch(width / 2.0, 0.0)?;
//! ```
//!
//! | Preset | Emission | Look |
//! |--------|----------|------|
//! | [`confetti`] | rate | Tumbling pieces drifting down |
//! | [`explosion`] | burst | Fast radial burst that fades |
//! | [`dust`] | rate | Slow specks fading in and out |
//! | [`snow`] | rate | Gentle fall with a little sway |
//! | [`sparkle`] | rate | Short twinkles that shrink away |

use crate::config::{AccelerationConfig, EmissionConfig, SpeedConfig, SystemConfig};
use crate::curve::{Curve, Easing};
use crate::emitter::{SpriteOrder, ValueRange};

/// Falling, spinning confetti.
///
/// # Arguments
///
/// * `rate` - Pieces per second
pub fn confetti(rate: f32) -> SystemConfig {
    SystemConfig {
        max_particles: 200,
        time_to_live_ms: 5000,
        speed: Some(SpeedConfig::Polar {
            min_speed: 50.0,
            max_speed: 150.0,
            min_angle: 45.0,
            max_angle: 135.0,
        }),
        acceleration: Some(AccelerationConfig {
            magnitude: 30.0,
            angle: 90.0,
        }),
        initial_rotation: Some(ValueRange::new(0.0, 360.0)),
        rotation_speed: Some(ValueRange::new(-180.0, 180.0)),
        fade_out_ms: 1000,
        sprite_order: SpriteOrder::RoundRobin,
        emission: Some(EmissionConfig::Rate {
            per_second: rate,
            duration_ms: None,
        }),
        ..SystemConfig::default()
    }
}

/// One-time radial burst.
///
/// # Arguments
///
/// * `count` - Particles in the burst
pub fn explosion(count: u32) -> SystemConfig {
    SystemConfig {
        max_particles: count.max(1) as usize,
        time_to_live_ms: 800,
        speed: Some(SpeedConfig::Range {
            min: 200.0,
            max: 600.0,
        }),
        scale: Some(ValueRange::new(0.5, 1.2)),
        scale_curve: Some(Curve::linear(1.0, 0.2).with_easing(Easing::EaseOut)),
        fade_out_ms: 500,
        emission: Some(EmissionConfig::Burst { count }),
        ..SystemConfig::default()
    }
}

/// Slow floating dust.
///
/// # Arguments
///
/// * `rate` - Specks per second
pub fn dust(rate: f32) -> SystemConfig {
    SystemConfig {
        max_particles: 150,
        time_to_live_ms: 4000,
        speed: Some(SpeedConfig::Range { min: 5.0, max: 20.0 }),
        scale: Some(ValueRange::new(0.2, 0.6)),
        fade_in_ms: 1000,
        fade_out_ms: 1500,
        emission: Some(EmissionConfig::Rate {
            per_second: rate,
            duration_ms: None,
        }),
        ..SystemConfig::default()
    }
}

/// Snowflakes falling from the top of the emission area.
///
/// # Arguments
///
/// * `rate` - Flakes per second
pub fn snow(rate: f32) -> SystemConfig {
    SystemConfig {
        max_particles: 300,
        time_to_live_ms: 8000,
        speed: Some(SpeedConfig::Components {
            min_x: -15.0,
            max_x: 15.0,
            min_y: 40.0,
            max_y: 80.0,
        }),
        initial_rotation: Some(ValueRange::new(0.0, 360.0)),
        rotation_speed: Some(ValueRange::new(-30.0, 30.0)),
        scale: Some(ValueRange::new(0.4, 1.0)),
        fade_out_ms: 2000,
        emission: Some(EmissionConfig::Rate {
            per_second: rate,
            duration_ms: None,
        }),
        ..SystemConfig::default()
    }
}

/// Short-lived twinkles.
///
/// # Arguments
///
/// * `rate` - Sparkles per second
pub fn sparkle(rate: f32) -> SystemConfig {
    SystemConfig {
        max_particles: 100,
        time_to_live_ms: 600,
        speed: Some(SpeedConfig::Range { min: 0.0, max: 30.0 }),
        rotation_speed: Some(ValueRange::new(90.0, 270.0)),
        scale_curve: Some(Curve::linear(1.0, 0.0).with_easing(Easing::EaseIn)),
        fade_in_ms: 100,
        emission: Some(EmissionConfig::Rate {
            per_second: rate,
            duration_ms: None,
        }),
        ..SystemConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_emission() {
        for config in [confetti(30.0), explosion(50), dust(10.0), snow(20.0), sparkle(40.0)] {
            assert!(config.emission.is_some());
            assert!(config.time_to_live_ms > config.fade_in_ms + config.fade_out_ms);
        }
    }

    #[test]
    fn test_explosion_pool_fits_burst() {
        let config = explosion(250);
        assert_eq!(config.max_particles, 250);
        assert_eq!(config.emission, Some(EmissionConfig::Burst { count: 250 }));
    }

    #[test]
    fn test_presets_survive_json() {
        let config = snow(12.0);
        let json = config.to_json().unwrap();
        assert_eq!(SystemConfig::from_json(&json).unwrap(), config);
    }
}
