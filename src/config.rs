//! Serializable effect descriptions.
//!
//! A [`SystemConfig`] captures every builder option of
//! [`ParticleSystem`] so effects can be authored as data, shipped as JSON and
//! loaded at runtime. Durations are integer milliseconds.
//!
//! ```ignore
//! let config = SystemConfig::from_json(r#"{
//!     "max_particles": 80,
//!     "time_to_live_ms": 1200,
//!     "speed": { "type": "range", "min": 0.05, "max": 0.2 },
//!     "fade_out_ms": 400,
//!     "emission": { "type": "burst", "count": 80 }
//! }"#)?;
//! let mut system = ParticleSystem::from_config(view, sprites, &config)?;
//! system.launch(x, y)?;
//! ```

use crate::curve::{Curve, Easing};
use crate::emitter::{EmissionMode, SpriteOrder, ValueRange};
use crate::error::ConfigError;
use crate::modifier::Modifier;
use crate::surface::Container;
use crate::system::ParticleSystem;
use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How initial velocities are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeedConfig {
    /// Any direction.
    Range {
        /// Slowest speed, density-independent units per second.
        min: f32,
        /// Fastest speed.
        max: f32,
    },
    /// Speed and heading in degrees.
    Polar {
        /// Slowest speed.
        min_speed: f32,
        /// Fastest speed.
        max_speed: f32,
        /// First heading, clockwise from the right.
        min_angle: f32,
        /// Last heading. Wraps through 360° when below `min_angle`.
        max_angle: f32,
    },
    /// Per axis.
    Components {
        /// Lowest horizontal speed.
        min_x: f32,
        /// Highest horizontal speed.
        max_x: f32,
        /// Lowest vertical speed.
        min_y: f32,
        /// Highest vertical speed.
        max_y: f32,
    },
}

/// Constant acceleration towards `angle` degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelerationConfig {
    /// Density-independent units per second squared.
    pub magnitude: f32,
    /// Direction in degrees.
    pub angle: f32,
}

/// Per-particle acceleration drawn at emission.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelerationRangeConfig {
    /// Smallest magnitude.
    pub min: f32,
    /// Largest magnitude.
    pub max: f32,
    /// First direction in degrees.
    pub min_angle: f32,
    /// Last direction. Wraps through 360° when below `min_angle`.
    pub max_angle: f32,
}

/// Serializable [`EmissionMode`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmissionConfig {
    /// `count` particles at once.
    Burst {
        /// Particles to emit.
        count: u32,
    },
    /// A steady stream.
    Rate {
        /// Particles per second.
        per_second: f32,
        /// Stop after this many milliseconds. Absent means until stopped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
}

impl From<EmissionConfig> for EmissionMode {
    fn from(config: EmissionConfig) -> Self {
        match config {
            EmissionConfig::Burst { count } => EmissionMode::Burst(count),
            EmissionConfig::Rate {
                per_second,
                duration_ms,
            } => EmissionMode::Rate {
                per_second,
                duration: duration_ms.map(Duration::from_millis),
            },
        }
    }
}

/// Every option of a particle system as plain data.
///
/// Missing fields take their defaults, so a document only needs to name
/// what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Pool capacity.
    pub max_particles: usize,
    /// Lifetime of every particle.
    pub time_to_live_ms: u64,
    /// Initial velocity distribution.
    pub speed: Option<SpeedConfig>,
    /// Constant acceleration shared by all particles.
    pub acceleration: Option<AccelerationConfig>,
    /// Per-particle acceleration, added to `acceleration`.
    pub acceleration_range: Option<AccelerationRangeConfig>,
    /// Initial rotation in degrees.
    pub initial_rotation: Option<ValueRange>,
    /// Spin in degrees per second.
    pub rotation_speed: Option<ValueRange>,
    /// Change of spin in degrees per second squared.
    pub angular_acceleration: Option<f32>,
    /// Initial scale.
    pub scale: Option<ValueRange>,
    /// Scale over lifetime.
    pub scale_curve: Option<Curve<f32>>,
    /// Fade in over this many milliseconds. Zero disables it.
    pub fade_in_ms: u64,
    /// Fade out over the last this many milliseconds. Zero disables it.
    pub fade_out_ms: u64,
    /// Shape of both fades.
    pub fade_easing: Easing,
    /// Alpha over lifetime.
    pub alpha_curve: Option<Curve<f32>>,
    /// Initial RGBA tint.
    pub color: Option<Vec4>,
    /// Tint over lifetime.
    pub color_curve: Option<Curve<Vec4>>,
    /// Appended after every other modifier.
    pub modifiers: Vec<Modifier>,
    /// Wait before emitting.
    pub initial_delay_ms: u64,
    /// Sprite assignment.
    pub sprite_order: SpriteOrder,
    /// Fixed seed for reproducible effects.
    pub seed: Option<u64>,
    /// Simulate this far ahead when emission starts.
    pub prewarm_ms: u64,
    /// Emission used by [`ParticleSystem::launch`].
    pub emission: Option<EmissionConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_particles: 100,
            time_to_live_ms: 1000,
            speed: None,
            acceleration: None,
            acceleration_range: None,
            initial_rotation: None,
            rotation_speed: None,
            angular_acceleration: None,
            scale: None,
            scale_curve: None,
            fade_in_ms: 0,
            fade_out_ms: 0,
            fade_easing: Easing::Linear,
            alpha_curve: None,
            color: None,
            color_curve: None,
            modifiers: Vec::new(),
            initial_delay_ms: 0,
            sprite_order: SpriteOrder::default(),
            seed: None,
            prewarm_ms: 0,
            emission: None,
        }
    }
}

impl SystemConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Particle lifetime.
    pub fn time_to_live(&self) -> Duration {
        Duration::from_millis(self.time_to_live_ms)
    }

    /// Apply every option to `system`, in builder order.
    pub fn apply<C: Container>(&self, mut system: ParticleSystem<C>) -> Result<ParticleSystem<C>, ConfigError> {
        system = match self.speed {
            Some(SpeedConfig::Range { min, max }) => system.with_speed_range(min, max)?,
            Some(SpeedConfig::Polar {
                min_speed,
                max_speed,
                min_angle,
                max_angle,
            }) => system.with_speed_and_angle_range(min_speed, max_speed, min_angle, max_angle)?,
            Some(SpeedConfig::Components {
                min_x,
                max_x,
                min_y,
                max_y,
            }) => system.with_speed_by_components(min_x, max_x, min_y, max_y)?,
            None => system,
        };
        if let Some(a) = self.acceleration {
            system = system.with_acceleration(a.magnitude, a.angle)?;
        }
        if let Some(a) = self.acceleration_range {
            system = system.with_acceleration_range(a.min, a.max, a.min_angle, a.max_angle)?;
        }
        if let Some(r) = self.initial_rotation {
            system = system.with_initial_rotation_range(r.min, r.max)?;
        }
        if let Some(r) = self.rotation_speed {
            system = system.with_rotation_speed_range(r.min, r.max)?;
        }
        if let Some(a) = self.angular_acceleration {
            system = system.with_angular_acceleration(a)?;
        }
        if let Some(s) = self.scale {
            system = system.with_scale_range(s.min, s.max)?;
        }
        if let Some(curve) = &self.scale_curve {
            system = system.with_scale_curve(curve.clone())?;
        }
        if self.fade_in_ms > 0 {
            system = system.with_fade_in_eased(Duration::from_millis(self.fade_in_ms), self.fade_easing)?;
        }
        if self.fade_out_ms > 0 {
            system = system.with_fade_out_eased(Duration::from_millis(self.fade_out_ms), self.fade_easing)?;
        }
        if let Some(curve) = &self.alpha_curve {
            system = system.with_alpha_curve(curve.clone())?;
        }
        if let Some(color) = self.color {
            system = system.with_color(color)?;
        }
        if let Some(curve) = &self.color_curve {
            system = system.with_color_curve(curve.clone())?;
        }
        for modifier in &self.modifiers {
            system = system.with_modifier(modifier.clone())?;
        }

        system = system
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_sprite_order(self.sprite_order)
            .with_prewarm(Duration::from_millis(self.prewarm_ms));
        if let Some(seed) = self.seed {
            system = system.with_seed(seed);
        }
        if let Some(emission) = self.emission {
            system = system.with_emission(emission.into())?;
        }
        Ok(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config = SystemConfig::from_json(r#"{ "time_to_live_ms": 500 }"#).unwrap();
        assert_eq!(config.max_particles, 100);
        assert_eq!(config.time_to_live(), Duration::from_millis(500));
        assert!(config.emission.is_none());
    }

    #[test]
    fn test_tagged_variants() {
        let config = SystemConfig::from_json(
            r#"{
                "speed": { "type": "polar", "min_speed": 1, "max_speed": 2, "min_angle": 0, "max_angle": 90 },
                "emission": { "type": "rate", "per_second": 12.5, "duration_ms": 2000 },
                "sprite_order": "round_robin",
                "modifiers": [ { "acceleration": [0.0, 9.8] } ]
            }"#,
        )
        .unwrap();

        assert!(matches!(config.speed, Some(SpeedConfig::Polar { max_angle, .. }) if max_angle == 90.0));
        assert_eq!(config.sprite_order, SpriteOrder::RoundRobin);
        assert_eq!(
            EmissionMode::from(config.emission.unwrap()),
            EmissionMode::rate_for(12.5, Duration::from_secs(2))
        );
        assert_eq!(config.modifiers.len(), 1);
    }

    #[test]
    fn test_acceleration_range_and_fade_easing() {
        let config = SystemConfig::from_json(
            r#"{
                "acceleration_range": { "min": 1, "max": 3, "min_angle": 80, "max_angle": 100 },
                "fade_out_ms": 200,
                "fade_easing": "ease_in"
            }"#,
        )
        .unwrap();
        assert_eq!(config.fade_easing, Easing::EaseIn);
        assert_eq!(
            config.acceleration_range,
            Some(AccelerationRangeConfig {
                min: 1.0,
                max: 3.0,
                min_angle: 80.0,
                max_angle: 100.0,
            })
        );
    }

    #[test]
    fn test_parse_errors_are_config_errors() {
        assert!(matches!(
            SystemConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        // Curves are validated while parsing
        assert!(matches!(
            SystemConfig::from_json(r#"{ "alpha_curve": { "keys": [] } }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SystemConfig {
            fade_out_ms: 300,
            alpha_curve: Some(Curve::linear(1.0, 0.0)),
            emission: Some(EmissionConfig::Burst { count: 40 }),
            ..SystemConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(SystemConfig::from_json(&json).unwrap(), config);
    }
}
