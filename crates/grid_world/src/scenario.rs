use anyhow::{bail, ensure, Context, Result};
use grid_core::{GridDef, LoadGeneratorDef, PowerContainerDef, ReactorDef};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Ticks per simulated second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    pub ticks: u64,
    #[serde(default = "default_metrics_every")]
    pub metrics_every: u64,
    pub seeds: SeedSpec,
    #[serde(flatten)]
    pub layout: Layout,
    #[serde(default)]
    pub load_profile: Option<LoadProfileDef>,
    #[serde(default)]
    pub charge_schedule: Vec<ChargeStepDef>,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
}

fn default_tick_rate() -> f64 {
    20.0
}

fn default_metrics_every() -> u64 {
    20
}

/// The devices of a scenario, each under a unique name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub grid: GridDef,
    #[serde(default)]
    pub reactors: Vec<Named<ReactorDef>>,
    #[serde(default)]
    pub batteries: Vec<Named<PowerContainerDef>>,
    #[serde(default)]
    pub loads: Vec<Named<LoadGeneratorDef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named<T> {
    pub id: String,
    #[serde(flatten)]
    pub def: T,
}

/// Random-walk settings for the scenario's loads.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadProfileDef {
    #[serde(default = "default_every_ticks")]
    pub every_ticks: u64,
    pub loads: Vec<LoadBoundsDef>,
}

fn default_every_ticks() -> u64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBoundsDef {
    pub load: String,
    pub min_kw: f64,
    pub max_kw: f64,
    pub max_spike_kw: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeStepDef {
    pub tick: u64,
    pub battery: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    pub fn expand(&self) -> Vec<u64> {
        match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range } => (range[0]..=range[1]).collect(),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    validate_scenario(&scenario)
        .with_context(|| format!("validating scenario file: {}", path.display()))?;
    Ok(scenario)
}

/// Structural checks only. Out-of-range device numbers are left for the
/// core to clamp.
pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if scenario.ticks == 0 {
        bail!("scenario 'ticks' must be > 0");
    }
    ensure!(
        scenario.tick_rate.is_finite() && scenario.tick_rate > 0.0,
        "scenario 'tick_rate' must be a positive number, got {}",
        scenario.tick_rate
    );
    ensure!(
        scenario.metrics_every > 0,
        "scenario 'metrics_every' must be > 0"
    );
    if scenario.seeds.expand().is_empty() {
        bail!("scenario 'seeds' must produce at least one seed");
    }

    let layout = &scenario.layout;
    let mut names = HashSet::new();
    let all_ids = layout
        .reactors
        .iter()
        .map(|r| &r.id)
        .chain(layout.batteries.iter().map(|b| &b.id))
        .chain(layout.loads.iter().map(|l| &l.id));
    for id in all_ids {
        ensure!(!id.is_empty(), "device 'id' must not be empty");
        ensure!(names.insert(id.as_str()), "duplicate device id '{id}'");
    }

    if let Some(profile) = &scenario.load_profile {
        ensure!(
            profile.every_ticks > 0,
            "load_profile 'every_ticks' must be > 0"
        );
        for bounds in &profile.loads {
            ensure!(
                layout.loads.iter().any(|l| l.id == bounds.load),
                "load_profile references unknown load '{}'",
                bounds.load
            );
        }
    }
    for step in &scenario.charge_schedule {
        ensure!(
            layout.batteries.iter().any(|b| b.id == step.battery),
            "charge_schedule references unknown battery '{}'",
            step.battery
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_scenario(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_scenario_gets_defaults() {
        let file = write_temp_scenario(
            r#"{
            "name": "empty",
            "ticks": 100,
            "seeds": [1, 2, 3]
        }"#,
        );
        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.name, "empty");
        assert!((scenario.tick_rate - 20.0).abs() < f64::EPSILON);
        assert_eq!(scenario.metrics_every, 20);
        assert_eq!(scenario.seeds.expand(), vec![1, 2, 3]);
        assert!(scenario.layout.reactors.is_empty());
        assert!(scenario.load_profile.is_none());
        assert!((scenario.layout.grid.overload_voltage - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seed_range_expands_inclusive() {
        let file = write_temp_scenario(
            r#"{
            "name": "range",
            "ticks": 10,
            "seeds": {"range": [1, 5]}
        }"#,
        );
        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.seeds.expand(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn devices_parse_with_def_defaults() {
        let file = write_temp_scenario(
            r#"{
            "name": "devices",
            "ticks": 10,
            "seeds": [7],
            "reactors": [{
                "id": "main",
                "max_power_output": 5200,
                "rods": [{"kind": "Thorium", "quality": "Good"}, null, null, {"kind": "Normal", "durability": 40}]
            }],
            "batteries": [{"id": "bank", "max_charge": 1000, "max_recharge_speed": 500, "max_output": 800}],
            "loads": [{"id": "town", "load": 2500}]
        }"#,
        );
        let scenario = load_scenario(file.path()).unwrap();
        let reactor = &scenario.layout.reactors[0];
        assert_eq!(reactor.id, "main");
        assert!((reactor.def.melt_down_delay - 30.0).abs() < f64::EPSILON);
        assert!(reactor.def.auto_temp);
        assert_eq!(reactor.def.rods.iter().flatten().count(), 2);
        let battery = &scenario.layout.batteries[0].def;
        assert!((battery.efficiency - 0.95).abs() < f64::EPSILON);
        assert!(battery.charge.abs() < f64::EPSILON);
        assert!((scenario.layout.loads[0].def.load - 2500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_name_fails() {
        let file = write_temp_scenario(r#"{"name": "", "ticks": 100, "seeds": [1]}"#);
        let err = load_scenario(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("name"));
    }

    #[test]
    fn zero_ticks_fails() {
        let file = write_temp_scenario(r#"{"name": "bad", "ticks": 0, "seeds": [1]}"#);
        assert!(load_scenario(file.path()).is_err());
    }

    #[test]
    fn bad_tick_rate_fails() {
        let file =
            write_temp_scenario(r#"{"name": "bad", "ticks": 5, "tick_rate": 0, "seeds": [1]}"#);
        let err = load_scenario(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("tick_rate"));
    }

    #[test]
    fn empty_seed_range_fails() {
        let file =
            write_temp_scenario(r#"{"name": "bad", "ticks": 5, "seeds": {"range": [5, 1]}}"#);
        assert!(load_scenario(file.path()).is_err());
    }

    #[test]
    fn duplicate_ids_fail() {
        let file = write_temp_scenario(
            r#"{
            "name": "dup",
            "ticks": 5,
            "seeds": [1],
            "batteries": [{"id": "x", "max_charge": 10, "max_recharge_speed": 1, "max_output": 1}],
            "loads": [{"id": "x"}]
        }"#,
        );
        let err = load_scenario(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate device id 'x'"));
    }

    #[test]
    fn profile_must_name_a_load() {
        let file = write_temp_scenario(
            r#"{
            "name": "profile",
            "ticks": 5,
            "seeds": [1],
            "loads": [{"id": "town"}],
            "load_profile": {"loads": [{"load": "city", "min_kw": 0, "max_kw": 10, "max_spike_kw": 1}]}
        }"#,
        );
        let err = load_scenario(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown load 'city'"));
    }

    #[test]
    fn schedule_must_name_a_battery() {
        let file = write_temp_scenario(
            r#"{
            "name": "schedule",
            "ticks": 5,
            "seeds": [1],
            "loads": [{"id": "town"}],
            "charge_schedule": [{"tick": 0, "battery": "town", "percent": 50}]
        }"#,
        );
        let err = load_scenario(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown battery 'town'"));
    }

    #[test]
    fn out_of_range_values_are_not_rejected() {
        let file = write_temp_scenario(
            r#"{
            "name": "clamped",
            "ticks": 5,
            "seeds": [1],
            "reactors": [{"id": "r", "max_power_output": -10, "degree_of_success": 7}]
        }"#,
        );
        assert!(load_scenario(file.path()).is_ok());
    }
}
