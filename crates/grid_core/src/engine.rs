use rand::Rng;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::commands::apply_commands;
use crate::grid::{Grid, OverloadOutcome};
use crate::powered::{Powered, Resolution, Simulated};
use crate::{
    emit, CommandEnvelope, Counters, DeviceId, Event, EventEnvelope, GridDef, HaltReason,
    LoadGenerator, LoadGeneratorDef, MetaState, PowerContainer, PowerContainerDef, PowerPriority,
    PowerRange, Reactor, ReactorDef,
};

/// A device supplied by the caller rather than built from a definition.
pub trait GridDevice: Powered + Simulated + Send {
    fn as_powered(&mut self) -> &mut dyn Powered;
}

impl<T: Powered + Simulated + Send> GridDevice for T {
    fn as_powered(&mut self) -> &mut dyn Powered {
        self
    }
}

pub enum Device {
    Reactor(Box<Reactor>),
    PowerContainer(PowerContainer),
    LoadGenerator(LoadGenerator),
    External(Box<dyn GridDevice>),
}

impl Device {
    fn powered(&mut self) -> &mut dyn Powered {
        match self {
            Device::Reactor(reactor) => reactor.as_mut(),
            Device::PowerContainer(battery) => battery,
            Device::LoadGenerator(generator) => generator,
            Device::External(device) => device.as_powered(),
        }
    }

    fn tick(&mut self, dt: f64) {
        match self {
            Device::Reactor(reactor) => reactor.tick(dt),
            Device::External(device) => device.tick(dt),
            Device::PowerContainer(_) | Device::LoadGenerator(_) => {}
        }
    }

    pub fn priority(&self) -> PowerPriority {
        match self {
            Device::Reactor(reactor) => reactor.priority(),
            Device::PowerContainer(battery) => battery.priority(),
            Device::LoadGenerator(generator) => generator.priority(),
            Device::External(device) => device.priority(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Device::Reactor(_) => "reactor",
            Device::PowerContainer(_) => "battery",
            Device::LoadGenerator(_) => "load",
            Device::External(_) => "external",
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Reactor(reactor) => f.debug_tuple("Reactor").field(reactor).finish(),
            Device::PowerContainer(battery) => f.debug_tuple("PowerContainer").field(battery).finish(),
            Device::LoadGenerator(generator) => {
                f.debug_tuple("LoadGenerator").field(generator).finish()
            }
            Device::External(device) => f
                .debug_tuple("External")
                .field(&device.priority())
                .finish(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    device: Device,
    /// Load reported at the start of the last resolution.
    consumption: f64,
    /// Output committed during the last resolution.
    output: f64,
}

/// Reactor flags compared across a step to detect transitions.
#[derive(Debug, Clone, Copy)]
struct ReactorFlags {
    melted: bool,
    burning: bool,
    fueled: bool,
}

impl ReactorFlags {
    fn of(reactor: &Reactor) -> Self {
        Self {
            melted: reactor.melted(),
            burning: reactor.is_burning(),
            fueled: reactor.fuel_heat() > 0.0,
        }
    }
}

/// One electrical network and every device attached to it.
///
/// Devices are stored in an arena and addressed by `DeviceId`. Production
/// tiers are bucketed at registration so settlement never sorts.
#[derive(Debug)]
pub struct PowerGrid {
    grid: Grid,
    slots: Vec<Slot>,
    tiers: [SmallVec<[DeviceId; 4]>; 4],
    pub meta: MetaState,
    pub counters: Counters,
}

impl PowerGrid {
    pub fn new(def: &GridDef) -> Self {
        Self {
            grid: Grid::new(def),
            slots: Vec::new(),
            tiers: Default::default(),
            meta: MetaState::default(),
            counters: Counters::default(),
        }
    }

    fn register(&mut self, device: Device) -> DeviceId {
        let id = DeviceId(self.slots.len());
        self.tiers[device.priority().bucket()].push(id);
        self.slots.push(Slot {
            device,
            consumption: 0.0,
            output: 0.0,
        });
        id
    }

    pub fn add_reactor(&mut self, def: &ReactorDef) -> DeviceId {
        self.register(Device::Reactor(Box::new(Reactor::new(def))))
    }

    pub fn add_battery(&mut self, def: &PowerContainerDef) -> DeviceId {
        self.register(Device::PowerContainer(PowerContainer::new(def)))
    }

    pub fn add_load(&mut self, def: &LoadGeneratorDef) -> DeviceId {
        self.register(Device::LoadGenerator(LoadGenerator::new(def)))
    }

    pub fn add_device(&mut self, device: Box<dyn GridDevice>) -> DeviceId {
        self.register(Device::External(device))
    }

    // -- accessors ---------------------------------------------------------

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.meta.tick
    }

    pub fn time_s(&self) -> f64 {
        self.meta.time_s
    }

    pub fn device_count(&self) -> usize {
        self.slots.len()
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.slots.get(id.0).map(|slot| &slot.device)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.slots.get_mut(id.0).map(|slot| &mut slot.device)
    }

    /// Load the device reported in the last resolution.
    pub fn consumption(&self, id: DeviceId) -> Option<f64> {
        self.slots.get(id.0).map(|slot| slot.consumption)
    }

    /// Output the device committed in the last resolution.
    pub fn output(&self, id: DeviceId) -> Option<f64> {
        self.slots.get(id.0).map(|slot| slot.output)
    }

    pub fn reactor(&self, id: DeviceId) -> Option<&Reactor> {
        match self.device(id)? {
            Device::Reactor(reactor) => Some(reactor.as_ref()),
            _ => None,
        }
    }

    pub fn reactor_mut(&mut self, id: DeviceId) -> Option<&mut Reactor> {
        match self.device_mut(id)? {
            Device::Reactor(reactor) => Some(reactor.as_mut()),
            _ => None,
        }
    }

    pub fn battery(&self, id: DeviceId) -> Option<&PowerContainer> {
        match self.device(id)? {
            Device::PowerContainer(battery) => Some(battery),
            _ => None,
        }
    }

    pub fn battery_mut(&mut self, id: DeviceId) -> Option<&mut PowerContainer> {
        match self.device_mut(id)? {
            Device::PowerContainer(battery) => Some(battery),
            _ => None,
        }
    }

    pub fn load_generator(&self, id: DeviceId) -> Option<&LoadGenerator> {
        match self.device(id)? {
            Device::LoadGenerator(generator) => Some(generator),
            _ => None,
        }
    }

    pub fn load_generator_mut(&mut self, id: DeviceId) -> Option<&mut LoadGenerator> {
        match self.device_mut(id)? {
            Device::LoadGenerator(generator) => Some(generator),
            _ => None,
        }
    }

    pub fn reactors(&self) -> impl Iterator<Item = (DeviceId, &Reactor)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match &slot.device {
            Device::Reactor(reactor) => Some((DeviceId(i), reactor.as_ref())),
            _ => None,
        })
    }

    pub fn batteries(&self) -> impl Iterator<Item = (DeviceId, &PowerContainer)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match &slot.device {
            Device::PowerContainer(battery) => Some((DeviceId(i), battery)),
            _ => None,
        })
    }

    pub fn load_generators(&self) -> impl Iterator<Item = (DeviceId, &LoadGenerator)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match &slot.device {
            Device::LoadGenerator(generator) => Some((DeviceId(i), generator)),
            _ => None,
        })
    }

    /// First terminal condition found, reactors before the grid.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        if let Some((id, _)) = self.reactors().find(|(_, reactor)| reactor.melted()) {
            return Some(HaltReason::ReactorMelted(id));
        }
        self.grid
            .is_destroyed()
            .then_some(HaltReason::GridDestroyed)
    }

    // -- simulation --------------------------------------------------------

    /// Advance the network by one tick.
    ///
    /// Order of operations:
    /// 1. Apply commands scheduled for this tick.
    /// 2. Tick every device.
    /// 3. Resolve power (`update_power`).
    /// 4. Emit events for reactor and grid transitions.
    /// 5. Advance the tick counter and clock.
    pub fn step(
        &mut self,
        commands: &[CommandEnvelope],
        dt: f64,
        rng: &mut impl Rng,
    ) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        apply_commands(self, commands, &mut events);

        let before: SmallVec<[(DeviceId, ReactorFlags); 4]> = self
            .reactors()
            .map(|(id, reactor)| (id, ReactorFlags::of(reactor)))
            .collect();

        for slot in &mut self.slots {
            slot.device.tick(dt);
        }
        let outcome = self.update_power(dt, rng);

        self.emit_reactor_transitions(&before, &mut events);
        self.emit_grid_outcome(outcome, &mut events);

        self.meta.tick += 1;
        self.meta.time_s += dt;
        events
    }

    /// Settle one tick of power flow. Pass order is fixed: consumption,
    /// producible ranges, production by tier, voltage, device resolution,
    /// then the grid failure model.
    pub fn update_power(&mut self, dt: f64, rng: &mut impl Rng) -> OverloadOutcome {
        self.grid.clear_flows();

        for slot in &mut self.slots {
            slot.consumption = slot.device.powered().current_power_consumption(dt).max(0.0);
            slot.output = 0.0;
            self.grid.load += slot.consumption;
        }

        let load = self.grid.load;
        let aggregate: PowerRange = self
            .slots
            .iter_mut()
            .map(|slot| slot.device.powered().min_max_power_out(load, dt))
            .sum();

        for tier in &self.tiers {
            // Devices in one tier all see the power committed before it.
            let (power, load) = (self.grid.power, self.grid.load);
            let mut tier_power = 0.0;
            for id in tier {
                let slot = &mut self.slots[id.0];
                slot.output = slot
                    .device
                    .powered()
                    .power_out(power, load, &aggregate, dt)
                    .max(0.0);
                tier_power += slot.output;
            }
            self.grid.power += tier_power;
        }

        self.grid.settle_voltage();

        for slot in &mut self.slots {
            let resolution = Resolution {
                voltage: self.grid.voltage,
                load: self.grid.load,
                power: self.grid.power,
                consumption: slot.consumption,
                output: slot.output,
            };
            slot.device.powered().grid_resolved(&resolution, dt);
        }

        self.grid.update_failures(dt, rng)
    }

    fn emit_reactor_transitions(
        &mut self,
        before: &[(DeviceId, ReactorFlags)],
        events: &mut Vec<EventEnvelope>,
    ) {
        let tick = self.meta.tick;
        for &(id, was) in before {
            let Some(reactor) = self.reactor(id) else {
                continue;
            };
            let now = ReactorFlags::of(reactor);
            let (temperature, health) = (reactor.temperature(), reactor.health());

            if now.melted && !was.melted {
                warn!(device = %id, temperature, "reactor melted down");
                events.push(emit(
                    &mut self.counters,
                    tick,
                    Event::ReactorMeltdown {
                        device: id,
                        temperature,
                    },
                ));
            }
            if now.burning && !was.burning {
                warn!(device = %id, health, "reactor caught fire");
                events.push(emit(
                    &mut self.counters,
                    tick,
                    Event::ReactorFireStarted { device: id },
                ));
            }
            if was.burning && !now.burning && !now.melted {
                debug!(device = %id, health, "reactor fire out");
                events.push(emit(
                    &mut self.counters,
                    tick,
                    Event::ReactorFireExtinguished { device: id, health },
                ));
            }
            if was.fueled && !now.fueled {
                debug!(device = %id, "reactor out of fuel");
                events.push(emit(
                    &mut self.counters,
                    tick,
                    Event::FuelDepleted { device: id },
                ));
            }
        }
    }

    fn emit_grid_outcome(&mut self, outcome: OverloadOutcome, events: &mut Vec<EventEnvelope>) {
        let tick = self.meta.tick;
        match outcome {
            OverloadOutcome::Damaged { damage } => {
                let health = self.grid.health();
                debug!(damage, health, voltage = self.grid.voltage, "grid overload damage");
                events.push(emit(
                    &mut self.counters,
                    tick,
                    Event::GridOverloadDamage { damage, health },
                ));
            }
            OverloadOutcome::Destroyed => {
                warn!(voltage = self.grid.voltage, "grid destroyed");
                events.push(emit(&mut self.counters, tick, Event::GridDestroyed));
            }
            OverloadOutcome::Nominal | OverloadOutcome::CoolingDown => {}
        }
    }
}

impl Default for PowerGrid {
    fn default() -> Self {
        PowerGrid::new(&GridDef::default())
    }
}
