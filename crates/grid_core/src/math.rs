//! Scalar helpers shared by the reactor, battery and grid models.
//!
//! `clamp` here never panics: unlike `f64::clamp` it tolerates `min > max`
//! (the upper bound wins), which the settlement math relies on when a band
//! collapses.

use serde::{Deserialize, Serialize};

#[inline]
pub fn lerp(a: f64, b: f64, amount: f64) -> f64 {
    a + (b - a) * amount
}

#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Move `current` toward `target` by at most `speed`, never past it.
#[inline]
pub fn adjust_without_overshoot(current: f64, target: f64, speed: f64) -> f64 {
    if target < current {
        target.max(current - speed)
    } else {
        target.min(current + speed)
    }
}

#[inline]
pub fn round_towards_closest(value: f64, div: f64) -> f64 {
    (value / div).round() * div
}

/// Relative float comparison; falls back to an absolute check near zero.
pub fn nearly_equal(a: f64, b: f64, epsilon: f64) -> bool {
    let diff = (a - b).abs();
    if diff == 0.0 {
        return true;
    }
    if a == 0.0 || b == 0.0 || diff < 1.192_092_896e-7 {
        return diff < epsilon;
    }
    diff / (a.abs() + b.abs()) < epsilon
}

/// Sign in the JS sense: zero maps to zero, unlike `f64::signum`.
#[inline]
pub(crate) fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// A closed `[low, high]` interval used for tolerance bands.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Component-wise interpolation between two bands.
    pub fn lerp(from: Band, to: Band, amount: f64) -> Band {
        Band::new(lerp(from.low, to.low, amount), lerp(from.high, to.high, amount))
    }

    pub fn midpoint(self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Strict containment; values sitting exactly on an edge are outside.
    pub fn contains_strict(self, value: f64) -> bool {
        value > self.low && value < self.high
    }
}
