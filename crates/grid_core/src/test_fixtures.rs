//! Shared test fixtures for grid_core and downstream crates.
//!
//! `normal_reactor()` is a reactor with four fresh Normal rods (fuel heat 320)
//! under auto-control. `single_reactor_grid()` wires one such reactor to one
//! constant load, the baseline setup most behaviour tests start from.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    DeviceId, FuelRodDef, GridDef, LoadGeneratorDef, PowerContainerDef, PowerGrid, ReactorDef,
    RodKind,
};

pub fn normal_reactor(max_power_output: f64) -> ReactorDef {
    ReactorDef {
        max_power_output,
        max_power_output_multiplier: 1.0,
        rods: [Some(FuelRodDef::fresh(RodKind::Normal)); 4],
        fuel_consumption_rate: 0.2,
        melt_down_delay: 30.0,
        fire_delay: 20.0,
        reactor_max_health: 100.0,
        reactor_health: None,
        degree_of_success: 0.5,
        power_on: true,
        auto_temp: true,
    }
}

/// Reactor with auto-control off, driven only by explicit signals.
pub fn manual_reactor(max_power_output: f64) -> ReactorDef {
    ReactorDef {
        auto_temp: false,
        ..normal_reactor(max_power_output)
    }
}

/// 1000 kW·min bank, 500 kW recharge, 1000 kW output.
pub fn steady_battery(charge: f64) -> PowerContainerDef {
    PowerContainerDef {
        max_charge: 1000.0,
        max_charge_multiplier: 1.0,
        charge,
        max_recharge_speed: 500.0,
        exponential_recharge_speed: false,
        max_output: 1000.0,
        efficiency: 0.95,
    }
}

pub fn constant_load(load: f64) -> LoadGeneratorDef {
    LoadGeneratorDef { load, power: 0.0 }
}

/// One 5200 kW reactor feeding a single constant load.
/// Returns `(grid, reactor, load)`.
pub fn single_reactor_grid(load: f64) -> (PowerGrid, DeviceId, DeviceId) {
    let mut grid = PowerGrid::new(&GridDef::default());
    let reactor = grid.add_reactor(&normal_reactor(5200.0));
    let load = grid.add_load(&constant_load(load));
    (grid, reactor, load)
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
