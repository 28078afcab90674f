use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Output envelope of a producer for one tick.
///
/// `capacity` carries the nominal max output of contributing reactors so that
/// several reactors on one grid can split the load by size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerRange {
    pub min: f64,
    pub max: f64,
    pub capacity: f64,
}

impl PowerRange {
    pub const ZERO: PowerRange = PowerRange {
        min: 0.0,
        max: 0.0,
        capacity: 0.0,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            capacity: 0.0,
        }
    }

    pub const fn with_capacity(min: f64, max: f64, capacity: f64) -> Self {
        Self { min, max, capacity }
    }
}

impl Add for PowerRange {
    type Output = PowerRange;

    fn add(self, rhs: PowerRange) -> PowerRange {
        PowerRange {
            min: self.min + rhs.min,
            max: self.max + rhs.max,
            capacity: self.capacity + rhs.capacity,
        }
    }
}

impl AddAssign for PowerRange {
    fn add_assign(&mut self, rhs: PowerRange) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for PowerRange {
    fn sum<I: Iterator<Item = PowerRange>>(iter: I) -> PowerRange {
        iter.fold(PowerRange::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_add_component_wise() {
        let total: PowerRange = [
            PowerRange::with_capacity(100.0, 300.0, 5200.0),
            PowerRange::new(0.0, 500.0),
            PowerRange::ZERO,
        ]
        .into_iter()
        .sum();
        assert!((total.min - 100.0).abs() < f64::EPSILON);
        assert!((total.max - 800.0).abs() < f64::EPSILON);
        assert!((total.capacity - 5200.0).abs() < f64::EPSILON);
    }
}
