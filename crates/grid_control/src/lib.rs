//! Driver-side controllers and the tick driver that runs them against a
//! `PowerGrid`.

mod driver;

pub use driver::{Driver, SimInfo, SimStatus, StepReport, StopReason};

use grid_core::{Command, CommandEnvelope, CommandId, DeviceId, PowerGrid};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub trait ControlSource {
    fn generate_commands(
        &mut self,
        grid: &PowerGrid,
        rng: &mut dyn RngCore,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

/// Allocates a command ID and builds a `CommandEnvelope` for the current tick.
fn make_cmd(tick: u64, next_id: &mut u64, command: Command) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

// ---------------------------------------------------------------------------
// LoadFluctuator
// ---------------------------------------------------------------------------

/// Random-walk bounds for one load generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub device: DeviceId,
    pub min_kw: f64,
    pub max_kw: f64,
    pub max_spike_kw: f64,
}

/// Wanders each profiled load inside its bounds, one step every
/// `every_ticks` ticks.
pub struct LoadFluctuator {
    profiles: Vec<LoadProfile>,
    every_ticks: u64,
}

impl LoadFluctuator {
    pub fn new(profiles: Vec<LoadProfile>, every_ticks: u64) -> Self {
        Self {
            profiles,
            every_ticks: every_ticks.max(1),
        }
    }
}

impl ControlSource for LoadFluctuator {
    fn generate_commands(
        &mut self,
        grid: &PowerGrid,
        rng: &mut dyn RngCore,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let tick = grid.tick();
        if tick % self.every_ticks != 0 {
            return Vec::new();
        }
        let mut commands = Vec::with_capacity(self.profiles.len());
        for profile in &self.profiles {
            // Profiles naming something other than a load generator are skipped.
            let Some(generator) = grid.load_generator(profile.device) else {
                continue;
            };
            let load_kw = grid_core::normal_load(
                generator.load(),
                profile.min_kw,
                profile.max_kw,
                profile.max_spike_kw,
                rng,
            );
            commands.push(make_cmd(
                tick,
                next_command_id,
                Command::SetLoad {
                    device: profile.device,
                    load_kw,
                },
            ));
        }
        commands
    }
}

// ---------------------------------------------------------------------------
// ChargeRateScheduler
// ---------------------------------------------------------------------------

/// A charge-rate change for one battery at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRateStep {
    pub tick: u64,
    pub device: DeviceId,
    pub percent: f64,
}

/// Issues `SetChargeRate` commands from a fixed schedule.
pub struct ChargeRateScheduler {
    schedule: Vec<ChargeRateStep>,
    cursor: usize,
}

impl ChargeRateScheduler {
    pub fn new(mut schedule: Vec<ChargeRateStep>) -> Self {
        schedule.sort_by_key(|step| step.tick);
        Self {
            schedule,
            cursor: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.schedule.len()
    }
}

impl ControlSource for ChargeRateScheduler {
    fn generate_commands(
        &mut self,
        grid: &PowerGrid,
        _rng: &mut dyn RngCore,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let tick = grid.tick();
        let mut commands = Vec::new();
        // Steps whose tick already passed fire now rather than never.
        while let Some(step) = self.schedule.get(self.cursor) {
            if step.tick > tick {
                break;
            }
            commands.push(make_cmd(
                tick,
                next_command_id,
                Command::SetChargeRate {
                    device: step.device,
                    percent: step.percent,
                },
            ));
            self.cursor += 1;
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::test_fixtures::{constant_load, make_rng, single_reactor_grid, steady_battery};

    #[test]
    fn fluctuator_respects_interval() {
        let (grid, _, load) = single_reactor_grid(3000.0);
        let mut fluctuator = LoadFluctuator::new(
            vec![LoadProfile {
                device: load,
                min_kw: 1000.0,
                max_kw: 5000.0,
                max_spike_kw: 100.0,
            }],
            10,
        );
        let mut rng = make_rng();
        let mut next_id = 0;
        let commands = fluctuator.generate_commands(&grid, &mut rng, &mut next_id);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].id, CommandId("cmd_000000".to_string()));
        assert_eq!(next_id, 1);
        let Command::SetLoad { load_kw, .. } = commands[0].command else {
            panic!("expected SetLoad");
        };
        assert!((2900.0..=3100.0).contains(&load_kw));
    }

    #[test]
    fn fluctuator_skips_non_load_devices() {
        let (grid, reactor, _) = single_reactor_grid(3000.0);
        let mut fluctuator = LoadFluctuator::new(
            vec![LoadProfile {
                device: reactor,
                min_kw: 0.0,
                max_kw: 1.0,
                max_spike_kw: 1.0,
            }],
            1,
        );
        let mut rng = make_rng();
        let mut next_id = 0;
        assert!(fluctuator
            .generate_commands(&grid, &mut rng, &mut next_id)
            .is_empty());
    }

    #[test]
    fn scheduler_fires_each_step_once() {
        let mut grid = grid_core::PowerGrid::default();
        let battery = grid.add_battery(&steady_battery(0.0));
        grid.add_load(&constant_load(100.0));
        let mut scheduler = ChargeRateScheduler::new(vec![
            ChargeRateStep {
                tick: 3,
                device: battery,
                percent: 20.0,
            },
            ChargeRateStep {
                tick: 0,
                device: battery,
                percent: 80.0,
            },
        ]);
        let mut rng = make_rng();
        let mut next_id = 0;
        let mut fired = Vec::new();
        for _ in 0..6 {
            let commands = scheduler.generate_commands(&grid, &mut rng, &mut next_id);
            fired.extend(commands.iter().map(|c| c.execute_at_tick));
            grid.step(&commands, 0.05, &mut rng);
        }
        assert_eq!(fired, vec![0, 3]);
        assert!(scheduler.is_finished());
        assert!((grid.battery(battery).unwrap().charge_rate() - 20.0).abs() < 1e-9);
    }
}
