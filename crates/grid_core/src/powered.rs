//! The capability every grid device implements.
//!
//! The resolution engine only talks to devices through this trait; no device
//! inspects another directly. Call order within one tick is fixed:
//! `current_power_consumption` → `min_max_power_out` → `power_out` (by tier)
//! → `grid_resolved`.

use crate::{PowerPriority, PowerRange};

/// Final grid values handed to each device once settlement is complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub voltage: f64,
    pub load: f64,
    pub power: f64,
    /// The load this device reported at the start of the tick.
    pub consumption: f64,
    /// The output this device committed during settlement.
    pub output: f64,
}

pub trait Powered {
    fn priority(&self) -> PowerPriority;

    /// Non-negative load this device places on the grid this tick.
    fn current_power_consumption(&mut self, dt: f64) -> f64;

    /// What this device could supply given its state and the grid load.
    fn min_max_power_out(&mut self, _load: f64, _dt: f64) -> PowerRange {
        PowerRange::ZERO
    }

    /// Committed output for the tier being settled. `power` is the output
    /// already committed by higher tiers.
    fn power_out(&mut self, _power: f64, _load: f64, _aggregate: &PowerRange, _dt: f64) -> f64 {
        0.0
    }

    /// Commit tick-local bookkeeping now that the grid is settled.
    fn grid_resolved(&mut self, _resolution: &Resolution, _dt: f64) {}
}

/// Anything advanced once per tick before power resolution.
pub trait Simulated {
    fn tick(&mut self, dt: f64);
}
