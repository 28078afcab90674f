use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::Layout;

const VALID_KEYS: &[&str] = &[
    "reactor.degree_of_success",
    "reactor.fuel_consumption_rate",
    "reactor.melt_down_delay",
    "reactor.fire_delay",
    "reactor.max_power_output_multiplier",
    "battery.efficiency",
    "battery.max_charge_multiplier",
    "grid.overload_voltage",
    "grid.overload_cooldown",
    "grid.catastrophic_failure_chance",
];

/// Apply whitelisted overrides to every device of the named kind.
pub fn apply_overrides(
    layout: &mut Layout,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "reactor.degree_of_success" => {
                let v = as_f64(key, value)?;
                layout
                    .reactors
                    .iter_mut()
                    .for_each(|r| r.def.degree_of_success = v);
            }
            "reactor.fuel_consumption_rate" => {
                let v = as_f64(key, value)?;
                layout
                    .reactors
                    .iter_mut()
                    .for_each(|r| r.def.fuel_consumption_rate = v);
            }
            "reactor.melt_down_delay" => {
                let v = as_f64(key, value)?;
                layout
                    .reactors
                    .iter_mut()
                    .for_each(|r| r.def.melt_down_delay = v);
            }
            "reactor.fire_delay" => {
                let v = as_f64(key, value)?;
                layout.reactors.iter_mut().for_each(|r| r.def.fire_delay = v);
            }
            "reactor.max_power_output_multiplier" => {
                let v = as_f64(key, value)?;
                layout
                    .reactors
                    .iter_mut()
                    .for_each(|r| r.def.max_power_output_multiplier = v);
            }
            "battery.efficiency" => {
                let v = as_f64(key, value)?;
                layout.batteries.iter_mut().for_each(|b| b.def.efficiency = v);
            }
            "battery.max_charge_multiplier" => {
                let v = as_f64(key, value)?;
                layout
                    .batteries
                    .iter_mut()
                    .for_each(|b| b.def.max_charge_multiplier = v);
            }
            "grid.overload_voltage" => layout.grid.overload_voltage = as_f64(key, value)?,
            "grid.overload_cooldown" => layout.grid.overload_cooldown = as_f64(key, value)?,
            "grid.catastrophic_failure_chance" => {
                layout.grid.catastrophic_failure_chance = as_f64(key, value)?;
            }
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        }
    }
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}
