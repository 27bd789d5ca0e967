//! Keyframed values over a particle's lifetime.
//!
//! A [`Curve`] maps a life fraction in `[0, 1]` to a value by piecewise-linear
//! interpolation between `(fraction, value)` keys. An [`Easing`] reshapes the
//! progress inside each segment.
//!
//! ```ignore
//! // Fully opaque for the first half, then fade out
//! let alpha = Curve::from_keys(vec![(0.5, 1.0), (1.0, 0.0)])?;
//! assert_eq!(alpha.sample(0.25), 1.0);
//! assert_eq!(alpha.sample(0.75), 0.5);
//! ```

use crate::error::ConfigError;
use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Values a [`Curve`] can interpolate.
pub trait Lerp: Copy {
    /// Linear interpolation from `self` to `other` at `t`.
    fn lerp(self, other: Self, t: f32) -> Self;

    /// Whether every component is finite.
    fn is_finite(self) -> bool;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

impl Lerp for Vec4 {
    #[inline]
    fn lerp(self, other: Self, t: f32) -> Self {
        Vec4::lerp(self, other, t)
    }

    #[inline]
    fn is_finite(self) -> bool {
        Vec4::is_finite(self)
    }
}

/// Shape of the progress between two keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// Starts slow, speeds up (`t²`).
    EaseIn,
    /// Starts fast, slows down (`1 - (1 - t)²`).
    EaseOut,
    /// Slow at both ends (smoothstep).
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Piecewise-linear keyframes over a normalized lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveDef<T>", into = "CurveDef<T>")]
#[serde(bound(
    serialize = "T: Lerp + Serialize",
    deserialize = "T: Lerp + Deserialize<'de>"
))]
pub struct Curve<T: Lerp> {
    keys: Vec<(f32, T)>,
    easing: Easing,
}

impl<T: Lerp> Curve<T> {
    /// The same value over the whole lifetime.
    pub fn constant(value: T) -> Self {
        Self {
            keys: vec![(0.0, value)],
            easing: Easing::Linear,
        }
    }

    /// Straight line from `start` at birth to `end` at expiry.
    pub fn linear(start: T, end: T) -> Self {
        Self {
            keys: vec![(0.0, start), (1.0, end)],
            easing: Easing::Linear,
        }
    }

    /// Build from `(fraction, value)` keys sorted by fraction.
    pub fn from_keys(keys: Vec<(f32, T)>) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::EmptyCurve);
        }
        for (index, &(fraction, value)) in keys.iter().enumerate() {
            if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                return Err(ConfigError::FractionOutOfRange { index, fraction });
            }
            if !value.is_finite() {
                return Err(ConfigError::NonFinite("curve value"));
            }
            if index > 0 {
                let previous = keys[index - 1].0;
                if fraction < previous {
                    return Err(ConfigError::UnorderedKeys {
                        index,
                        previous,
                        fraction,
                    });
                }
            }
        }
        Ok(Self {
            keys,
            easing: Easing::Linear,
        })
    }

    /// Use `easing` inside every segment.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// The keys, sorted by fraction.
    pub fn keys(&self) -> &[(f32, T)] {
        &self.keys
    }

    /// Easing applied between keys.
    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Value at life fraction `t`.
    pub fn sample(&self, t: f32) -> T {
        // from_keys guarantees at least one key
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];

        if t.is_nan() || t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }

        for pair in self.keys.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t < t1 {
                let span = t1 - t0;
                if span <= 0.0 {
                    return v1;
                }
                let local = self.easing.apply((t - t0) / span);
                return v0.lerp(v1, local);
            }
        }
        last.1
    }
}

/// Unvalidated serde form of [`Curve`].
#[derive(Serialize, Deserialize)]
struct CurveDef<T> {
    keys: Vec<(f32, T)>,
    #[serde(default)]
    easing: Easing,
}

impl<T: Lerp> TryFrom<CurveDef<T>> for Curve<T> {
    type Error = ConfigError;

    fn try_from(def: CurveDef<T>) -> Result<Self, Self::Error> {
        Ok(Curve::from_keys(def.keys)?.with_easing(def.easing))
    }
}

impl<T: Lerp> From<Curve<T>> for CurveDef<T> {
    fn from(curve: Curve<T>) -> Self {
        CurveDef {
            keys: curve.keys,
            easing: curve.easing,
        }
    }
}
