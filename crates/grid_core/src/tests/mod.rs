use super::*;
use crate::test_fixtures::{
    constant_load, make_rng, manual_reactor, normal_reactor, single_reactor_grid, steady_battery,
};

mod engine;

// --- Shared test helpers ------------------------------------------------

const DT: f64 = 0.05;

fn command(tick: u64, command: Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{tick:06}")),
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

/// Step the grid `seconds` of simulated time at `DT`, returning all events.
fn run_for(grid: &mut PowerGrid, seconds: f64, rng: &mut impl rand::Rng) -> Vec<EventEnvelope> {
    let ticks = (seconds / DT).round() as u64;
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(grid.step(&[], DT, rng));
    }
    events
}

fn assert_reactor_bounds(reactor: &Reactor) {
    assert!((0.0..=100.0).contains(&reactor.temperature()));
    assert!((0.0..=100.0).contains(&reactor.fission_rate()));
    assert!((0.0..=100.0).contains(&reactor.turbine_output()));
    for rod in reactor.rods().iter().flatten() {
        assert!((0.0..=rod.max_durability()).contains(&rod.durability()));
    }
}
