//! Battery / supercapacitor bank. Consumes from the grid while below
//! capacity and discharges into whatever load the higher tiers left over.
//!
//! Charge is measured in kW·min, so every per-tick delta carries a 1/60.

use serde::{Deserialize, Serialize};

use crate::math::{clamp, round_towards_closest};
use crate::powered::{Powered, Resolution};
use crate::{PowerContainerDef, PowerPriority, PowerRange};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerContainer {
    adjusted_capacity: f64,
    charge: f64,
    max_recharge_speed: f64,
    recharge_speed: f64,
    exponential_recharge_speed: bool,
    max_output: f64,
    efficiency: f64,

    /// Draw reported at the start of the current tick.
    consumption: f64,
    /// Output committed during settlement.
    output: f64,
    /// Max output offered in the current tick's range.
    available_output: f64,
    voltage: f64,
    grid_load: f64,
}

impl PowerContainer {
    pub fn new(def: &PowerContainerDef) -> Self {
        let adjusted_capacity = (def.max_charge.max(1.0) * def.max_charge_multiplier).max(1.0);
        let max_recharge_speed = def.max_recharge_speed.max(1.0);
        let mut container = Self {
            adjusted_capacity,
            charge: clamp(def.charge, 0.0, adjusted_capacity),
            max_recharge_speed,
            recharge_speed: 0.0,
            exponential_recharge_speed: def.exponential_recharge_speed,
            max_output: def.max_output.max(0.0),
            efficiency: clamp(def.efficiency, 0.0, 1.0),
            consumption: 0.0,
            output: 0.0,
            available_output: 0.0,
            voltage: 0.0,
            grid_load: 0.0,
        };
        container.set_recharge_speed(max_recharge_speed);
        container
    }

    /// Recharge speed is quantised to tenths of the maximum (at least 1 kW).
    fn set_recharge_speed(&mut self, speed: f64) {
        let speed = clamp(speed, 0.0, self.max_recharge_speed);
        self.recharge_speed =
            round_towards_closest(speed, (self.max_recharge_speed * 0.1).max(1.0));
    }

    pub fn set_charge_rate(&mut self, percent: f64) {
        let rate = clamp(percent / 100.0, 0.0, 1.0);
        self.set_recharge_speed(rate * self.max_recharge_speed);
    }

    pub fn charge_rate(&self) -> f64 {
        self.recharge_speed / self.max_recharge_speed * 100.0
    }

    pub fn recharge_speed(&self) -> f64 {
        self.recharge_speed
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn adjusted_capacity(&self) -> f64 {
        self.adjusted_capacity
    }

    pub fn charge_percentage(&self) -> f64 {
        self.charge / self.adjusted_capacity * 100.0
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn power_value_out(&self) -> f64 {
        self.output
    }

    /// Grid load seen at the last resolution.
    pub fn load_value_out(&self) -> f64 {
        self.grid_load
    }

    /// Power actually stored per minute after voltage sag and losses.
    pub fn real_charge_speed(&self) -> f64 {
        self.consumption * self.voltage * self.efficiency
    }
}

impl Powered for PowerContainer {
    fn priority(&self) -> PowerPriority {
        PowerPriority::Battery
    }

    fn current_power_consumption(&mut self, _dt: f64) -> f64 {
        if self.charge >= self.adjusted_capacity {
            self.charge = self.adjusted_capacity;
            self.consumption = 0.0;
            return 0.0;
        }

        let missing_charge = self.adjusted_capacity - self.charge;
        let mut target = if self.exponential_recharge_speed {
            (self.recharge_speed / self.max_recharge_speed).powi(2) * self.max_recharge_speed
        } else {
            self.recharge_speed
        };
        // Taper over the last kW·min so the bank doesn't overcharge.
        if missing_charge < 1.0 {
            target *= missing_charge;
        }

        self.consumption = clamp(target, 0.0, self.max_recharge_speed);
        self.consumption
    }

    fn min_max_power_out(&mut self, _load: f64, dt: f64) -> PowerRange {
        let charge_ratio = self.charge / self.adjusted_capacity;
        let mut max_output = if charge_ratio < 0.1 {
            (charge_ratio * 10.0).max(0.0) * self.max_output
        } else {
            self.max_output
        };
        if dt > 0.0 {
            max_output = max_output.min(self.charge * 60.0 / dt);
        }
        self.available_output = max_output;
        PowerRange::new(0.0, max_output)
    }

    fn power_out(&mut self, power: f64, load: f64, aggregate: &PowerRange, _dt: f64) -> f64 {
        self.output = if aggregate.max <= 0.0 {
            0.0
        } else {
            clamp((load - power) / aggregate.max, 0.0, 1.0) * self.available_output
        };
        self.output
    }

    fn grid_resolved(&mut self, resolution: &Resolution, dt: f64) {
        self.voltage = resolution.voltage;
        self.grid_load = resolution.load;

        let stored = self.consumption * resolution.voltage / 60.0 * dt * self.efficiency;
        let drained = self.output / 60.0 * dt;
        self.charge = clamp(self.charge + stored - drained, 0.0, self.adjusted_capacity);
    }
}
