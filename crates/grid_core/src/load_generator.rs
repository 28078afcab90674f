use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::clamp;
use crate::powered::Powered;
use crate::{LoadGeneratorDef, PowerPriority, PowerRange};

/// A consumer with a directly settable load, e.g. the rest of the ship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadGenerator {
    load: f64,
    power: f64,
}

impl LoadGenerator {
    pub fn new(def: &LoadGeneratorDef) -> Self {
        Self {
            load: def.load.max(0.0),
            power: def.power.max(0.0),
        }
    }

    pub fn load(&self) -> f64 {
        self.load
    }

    pub fn set_load(&mut self, load_kw: f64) {
        self.load = load_kw.max(0.0);
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn set_power(&mut self, power_kw: f64) {
        self.power = power_kw.max(0.0);
    }

    /// One random-walk step of the load inside `[min_load, max_load]`.
    pub fn normal_load<R: Rng + ?Sized>(
        &mut self,
        min_load: f64,
        max_load: f64,
        max_spike: f64,
        rng: &mut R,
    ) {
        self.load = normal_load(self.load, min_load, max_load, max_spike, rng);
    }
}

/// Random walk that drifts away from the bounds: within 100 kW of either end
/// the step points back inside, otherwise its sign is a coin flip.
pub fn normal_load<R: Rng + ?Sized>(
    load: f64,
    min_load: f64,
    max_load: f64,
    max_spike: f64,
    rng: &mut R,
) -> f64 {
    let direction = if load <= min_load + 100.0 {
        1.0
    } else if load >= max_load - 100.0 {
        -1.0
    } else if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    };
    let step = rng.gen::<f64>() * max_spike.max(0.0) * direction;
    clamp(load + step, min_load.max(0.0), max_load)
}

impl Powered for LoadGenerator {
    fn priority(&self) -> PowerPriority {
        PowerPriority::Default
    }

    fn current_power_consumption(&mut self, _dt: f64) -> f64 {
        self.load
    }

    fn power_out(&mut self, _power: f64, _load: f64, _aggregate: &PowerRange, _dt: f64) -> f64 {
        self.power
    }
}
