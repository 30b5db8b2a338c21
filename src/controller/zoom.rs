//! Provides [`DistanceLimits`] and the orbit distance clamp.

use bevy_math::DVec3;
use bevy_reflect::Reflect;

use super::{gesture::Accumulator, motion::EPSILON};

/// Bounds on the distance between the eye and the target.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct DistanceLimits {
    /// The closest the eye may get to the target.
    pub min: f64,
    /// The farthest the eye may get from the target. May be infinite.
    pub max: f64,
}

impl Default for DistanceLimits {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: f64::INFINITY,
        }
    }
}

impl DistanceLimits {
    /// Create new limits. If `min > max` the two are swapped.
    pub fn new(min: f64, max: f64) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Does `distance` lie within the limits?
    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.min && distance <= self.max
    }

    /// Clamp a distance into the limits.
    pub fn clamp(&self, distance: f64) -> f64 {
        distance.max(self.min).min(self.max)
    }

    /// Rescale `orbit` so its length lies within the limits.
    ///
    /// When the orbit had to be rescaled, `zoom` is re-seeded so the pending zoom delta does not
    /// push against the limit on the next frame. Returns `true` if the orbit changed.
    pub fn clamp_orbit(&self, orbit: &mut DVec3, zoom: &mut Accumulator) -> bool {
        let length_squared = orbit.length_squared();
        if !length_squared.is_finite() || length_squared < EPSILON * EPSILON {
            return false;
        }
        let length = length_squared.sqrt();
        let clamped = if length_squared > self.max * self.max {
            self.max
        } else if length_squared < self.min * self.min {
            self.min
        } else {
            return false;
        };
        *orbit *= clamped / length;
        zoom.advance();
        true
    }
}
