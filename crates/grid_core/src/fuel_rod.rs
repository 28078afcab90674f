use serde::{Deserialize, Serialize};

use crate::math::clamp;
use crate::{FuelRodDef, RodKind, RodQuality};

/// A fuel rod seated in one of the reactor's four slots.
///
/// A rod at zero durability stays in its slot but no longer contributes heat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelRod {
    pub kind: RodKind,
    pub quality: RodQuality,
    durability: f64,
}

impl FuelRod {
    pub fn new(def: &FuelRodDef) -> Self {
        let max = def.kind.max_durability();
        Self {
            kind: def.kind,
            quality: def.quality,
            durability: clamp(def.durability.unwrap_or(max), 0.0, max),
        }
    }

    pub fn durability(&self) -> f64 {
        self.durability
    }

    pub fn max_durability(&self) -> f64 {
        self.kind.max_durability()
    }

    pub fn heat(&self) -> f64 {
        self.kind.heat()
    }

    pub fn is_spent(&self) -> bool {
        self.durability <= 0.0
    }

    /// Heat this rod adds to the core; zero once spent.
    pub fn effective_heat(&self) -> f64 {
        if self.is_spent() {
            0.0
        } else {
            self.heat()
        }
    }

    pub fn durability_pct(&self) -> f64 {
        self.durability / self.max_durability() * 100.0
    }

    /// Burn fuel for one tick at the given fission rate (0..100).
    pub(crate) fn burn(&mut self, fission_rate: f64, consumption_rate: f64, dt: f64) {
        let loss = (fission_rate / 100.0) * (consumption_rate / self.quality.multiplier()) * dt;
        self.durability = (self.durability - loss).max(0.0);
    }
}
