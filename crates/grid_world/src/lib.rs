//! Scenario loading and grid construction shared between grid_cli and grid_bench.

mod overrides;
mod scenario;

pub use overrides::apply_overrides;
pub use scenario::{
    load_scenario, validate_scenario, ChargeStepDef, Layout, LoadBoundsDef, LoadProfileDef, Named,
    Scenario, SeedSpec,
};

use anyhow::{Context, Result};
use grid_control::{
    ChargeRateScheduler, ChargeRateStep, ControlSource, Driver, LoadFluctuator, LoadProfile,
    SimStatus,
};
use grid_core::{DeviceId, PowerGrid};
use rand::RngCore;
use std::collections::BTreeMap;
use tracing::debug;

/// A built grid plus the controllers its scenario asks for.
pub struct World {
    pub grid: PowerGrid,
    /// Scenario device name to id.
    pub devices: BTreeMap<String, DeviceId>,
    pub controllers: Vec<Box<dyn ControlSource>>,
}

impl World {
    pub fn device(&self, name: &str) -> Option<DeviceId> {
        self.devices.get(name).copied()
    }

    /// Hand the grid and its controllers to a driver.
    pub fn into_driver<R: RngCore>(self, tick_rate: f64, status: SimStatus, rng: R) -> Driver<R> {
        let World {
            grid, controllers, ..
        } = self;
        controllers.into_iter().fold(
            Driver::new(grid, tick_rate, status, rng),
            Driver::with_controller,
        )
    }
}

/// Build a fresh grid from a validated scenario, with its overrides applied.
/// Reactors register first, then batteries, then loads, each in file order.
pub fn build_world(scenario: &Scenario) -> Result<World> {
    let mut layout = scenario.layout.clone();
    apply_overrides(&mut layout, &scenario.overrides)
        .with_context(|| format!("applying overrides for scenario '{}'", scenario.name))?;

    let mut grid = PowerGrid::new(&layout.grid);
    let mut devices = BTreeMap::new();
    for reactor in &layout.reactors {
        devices.insert(reactor.id.clone(), grid.add_reactor(&reactor.def));
    }
    for battery in &layout.batteries {
        devices.insert(battery.id.clone(), grid.add_battery(&battery.def));
    }
    for load in &layout.loads {
        devices.insert(load.id.clone(), grid.add_load(&load.def));
    }

    let lookup = |name: &str| {
        devices
            .get(name)
            .copied()
            .with_context(|| format!("unknown device '{name}'"))
    };

    let mut controllers: Vec<Box<dyn ControlSource>> = Vec::new();
    if let Some(profile) = &scenario.load_profile {
        let profiles = profile
            .loads
            .iter()
            .map(|bounds| {
                Ok(LoadProfile {
                    device: lookup(&bounds.load)?,
                    min_kw: bounds.min_kw,
                    max_kw: bounds.max_kw,
                    max_spike_kw: bounds.max_spike_kw,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        controllers.push(Box::new(LoadFluctuator::new(profiles, profile.every_ticks)));
    }
    if !scenario.charge_schedule.is_empty() {
        let schedule = scenario
            .charge_schedule
            .iter()
            .map(|step| {
                Ok(ChargeRateStep {
                    tick: step.tick,
                    device: lookup(&step.battery)?,
                    percent: step.percent,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        controllers.push(Box::new(ChargeRateScheduler::new(schedule)));
    }

    debug!(
        scenario = %scenario.name,
        devices = devices.len(),
        controllers = controllers.len(),
        "world built"
    );
    Ok(World {
        grid,
        devices,
        controllers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Scenario {
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        validate_scenario(&scenario).unwrap();
        scenario
    }

    #[test]
    fn registers_devices_by_kind_then_file_order() {
        let scenario = parse(
            r#"{
            "name": "order",
            "ticks": 1,
            "seeds": [1],
            "loads": [{"id": "town", "load": 100}],
            "batteries": [{"id": "bank", "max_charge": 10, "max_recharge_speed": 5, "max_output": 5}],
            "reactors": [
                {"id": "r1", "max_power_output": 1000},
                {"id": "r2", "max_power_output": 500}
            ]
        }"#,
        );
        let world = build_world(&scenario).unwrap();
        assert_eq!(world.device("r1"), Some(DeviceId(0)));
        assert_eq!(world.device("r2"), Some(DeviceId(1)));
        assert_eq!(world.device("bank"), Some(DeviceId(2)));
        assert_eq!(world.device("town"), Some(DeviceId(3)));
        assert_eq!(world.grid.device_count(), 4);
        assert!(world.controllers.is_empty());
    }

    #[test]
    fn overrides_reach_built_devices() {
        let scenario = parse(
            r#"{
            "name": "override",
            "ticks": 1,
            "seeds": [1],
            "reactors": [{"id": "r", "max_power_output": 1000}],
            "overrides": {"reactor.max_power_output_multiplier": 2}
        }"#,
        );
        let world = build_world(&scenario).unwrap();
        let reactor = world.grid.reactor(DeviceId(0)).unwrap();
        assert!((reactor.max_power_output() - 2000.0).abs() < 1e-9);
        // The scenario itself is untouched.
        assert!(
            (scenario.layout.reactors[0].def.max_power_output_multiplier - 1.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn bad_override_is_an_error() {
        let scenario = parse(
            r#"{
            "name": "override",
            "ticks": 1,
            "seeds": [1],
            "overrides": {"grid.colour": 2}
        }"#,
        );
        let err = build_world(&scenario).err().unwrap();
        assert!(format!("{err:#}").contains("unknown override key"));
    }

    #[test]
    fn profile_and_schedule_become_controllers() {
        let scenario = parse(
            r#"{
            "name": "controllers",
            "ticks": 1,
            "seeds": [1],
            "batteries": [{"id": "bank", "max_charge": 10, "max_recharge_speed": 5, "max_output": 5}],
            "loads": [{"id": "town", "load": 100}],
            "load_profile": {"loads": [{"load": "town", "min_kw": 0, "max_kw": 500, "max_spike_kw": 50}]},
            "charge_schedule": [{"tick": 10, "battery": "bank", "percent": 50}]
        }"#,
        );
        let world = build_world(&scenario).unwrap();
        assert_eq!(world.controllers.len(), 2);
    }
}
