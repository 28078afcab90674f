//! Aggregate electrical state shared by every device on one `PowerGrid`.
//!
//! Voltage, load and power are rebuilt from scratch each tick by the
//! resolution engine; health and the overload cooldown persist.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::lerp;
use crate::GridDef;

/// Outcome of one pass of the overload failure model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverloadOutcome {
    Nominal,
    CoolingDown,
    Damaged { damage: f64 },
    Destroyed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub voltage: f64,
    pub load: f64,
    pub power: f64,
    health: f64,
    max_health: f64,
    overload_cooldown_timer: f64,
    overload_cooldown: f64,
    overload_voltage: f64,
    catastrophic_failure_chance: f64,
}

impl Grid {
    pub fn new(def: &GridDef) -> Self {
        let max_health = def.max_health.max(1.0);
        let overload_cooldown = def.overload_cooldown.max(0.0);
        Self {
            voltage: 0.0,
            load: 0.0,
            power: 0.0,
            health: max_health,
            max_health,
            overload_cooldown_timer: overload_cooldown,
            overload_cooldown,
            overload_voltage: def.overload_voltage.max(0.0),
            catastrophic_failure_chance: def.catastrophic_failure_chance.clamp(0.0, 1.0),
        }
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn max_health(&self) -> f64 {
        self.max_health
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn overload_cooldown_timer(&self) -> f64 {
        self.overload_cooldown_timer
    }

    pub fn overload_voltage(&self) -> f64 {
        self.overload_voltage
    }

    pub fn is_overloaded(&self) -> bool {
        self.voltage > self.overload_voltage
    }

    pub(crate) fn clear_flows(&mut self) {
        self.voltage = 0.0;
        self.load = 0.0;
        self.power = 0.0;
    }

    /// Voltage from the settled totals, guarded against a zero load and
    /// negative noise.
    pub(crate) fn settle_voltage(&mut self) {
        let voltage = (self.power / self.load.max(1e-10)).min(1000.0);
        self.voltage = if voltage < 0.0 || voltage.is_nan() {
            0.0
        } else {
            voltage
        };
    }

    /// Apply overvoltage damage. Damaged grids degrade faster, and each
    /// damage roll carries a small chance of outright failure.
    pub fn update_failures(&mut self, dt: f64, rng: &mut impl Rng) -> OverloadOutcome {
        if !self.is_overloaded() || self.is_destroyed() {
            return OverloadOutcome::Nominal;
        }
        if self.overload_cooldown_timer > 0.0 {
            self.overload_cooldown_timer -= dt;
            return OverloadOutcome::CoolingDown;
        }

        let condition_factor = lerp(5.0, 1.0, self.health / self.max_health);
        let damage = dt * rng.gen_range(10.0..500.0) * condition_factor;
        self.health -= damage;
        self.overload_cooldown_timer = self.overload_cooldown;

        if rng.gen::<f64>() < self.catastrophic_failure_chance {
            self.health = 0.0;
        }
        if self.health <= 0.0 {
            self.health = 0.0;
            return OverloadOutcome::Destroyed;
        }
        OverloadOutcome::Damaged { damage }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(&GridDef::default())
    }
}
