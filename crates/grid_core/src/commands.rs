use tracing::debug;

use crate::engine::{Device, PowerGrid};
use crate::{emit, Command, CommandEnvelope, Event, EventEnvelope};

/// Apply every command scheduled for the grid's current tick. A command
/// addressed to a missing device, or to one that cannot take it, is dropped
/// with a `CommandRejected` event.
pub(crate) fn apply_commands(
    grid: &mut PowerGrid,
    commands: &[CommandEnvelope],
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = grid.tick();

    for envelope in commands {
        if envelope.execute_at_tick != current_tick {
            continue;
        }
        let device = envelope.command.device();
        let applied = grid
            .device_mut(device)
            .is_some_and(|target| apply_to(target, &envelope.command));
        if !applied {
            debug!(command = %envelope.id, %device, "command rejected");
            events.push(emit(
                &mut grid.counters,
                current_tick,
                Event::CommandRejected {
                    command: envelope.id.clone(),
                    device,
                },
            ));
        }
    }
}

fn apply_to(target: &mut Device, command: &Command) -> bool {
    match (target, command) {
        (Device::Reactor(reactor), Command::SetFissionRate { signal, .. }) => {
            reactor.set_fission_rate(*signal);
        }
        (Device::Reactor(reactor), Command::SetTurbineOutput { signal, .. }) => {
            reactor.set_turbine_output(*signal);
        }
        (Device::Reactor(reactor), Command::SetPowerOn { on, .. }) => {
            reactor.set_power_on(*on);
        }
        (Device::Reactor(reactor), Command::SetAutoTemp { enabled, .. }) => {
            reactor.set_auto_temp(*enabled);
        }
        (Device::PowerContainer(battery), Command::SetChargeRate { percent, .. }) => {
            battery.set_charge_rate(*percent);
        }
        (Device::LoadGenerator(generator), Command::SetLoad { load_kw, .. }) => {
            generator.set_load(*load_kw);
        }
        _ => return false,
    }
    true
}
