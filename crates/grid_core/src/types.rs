//! Type definitions for `grid_core`.
//!
//! Device identifiers, priority tiers, setpoint signals, device definitions,
//! commands and events.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(CommandId);
string_id!(EventId);

/// Index of a device in its `PowerGrid`. Only meaningful for the grid that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub usize);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device_{:03}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// Production settlement tier. Higher tiers settle first, so variants are
/// declared lowest-first and `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerPriority {
    Default,
    Battery,
    Relay,
    Reactor,
}

impl PowerPriority {
    /// Tiers in the order production is settled.
    pub const SETTLEMENT_ORDER: [PowerPriority; 4] = [
        PowerPriority::Reactor,
        PowerPriority::Relay,
        PowerPriority::Battery,
        PowerPriority::Default,
    ];

    pub(crate) const fn bucket(self) -> usize {
        match self {
            PowerPriority::Reactor => 0,
            PowerPriority::Relay => 1,
            PowerPriority::Battery => 2,
            PowerPriority::Default => 3,
        }
    }
}

/// External setpoint for a reactor control variable.
///
/// `Hold` means no external command: the internal target keeps its value
/// (or is driven by auto-control).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Signal {
    #[default]
    Hold,
    Value(f64),
}

impl Signal {
    pub fn value(self) -> Option<f64> {
        match self {
            Signal::Hold => None,
            Signal::Value(v) => Some(v),
        }
    }
}

impl From<Option<f64>> for Signal {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Signal::Hold, Signal::Value)
    }
}

impl From<f64> for Signal {
    fn from(value: f64) -> Self {
        Signal::Value(value)
    }
}

// ---------------------------------------------------------------------------
// Device definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RodKind {
    Normal,
    Thorium,
    Fulgurium,
    VolatileFulgurium,
}

impl RodKind {
    pub const fn max_durability(self) -> f64 {
        match self {
            RodKind::Normal => 100.0,
            RodKind::Thorium => 200.0,
            RodKind::Fulgurium => 150.0,
            RodKind::VolatileFulgurium => 400.0,
        }
    }

    pub const fn heat(self) -> f64 {
        match self {
            RodKind::Normal => 80.0,
            RodKind::Thorium => 100.0,
            RodKind::Fulgurium | RodKind::VolatileFulgurium => 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RodQuality {
    #[default]
    Normal,
    Good,
    Excellent,
    Masterwork,
}

impl RodQuality {
    /// Divides the consumption rate: better rods burn slower.
    pub const fn multiplier(self) -> f64 {
        match self {
            RodQuality::Normal => 1.0,
            RodQuality::Good => 1.1,
            RodQuality::Excellent => 1.2,
            RodQuality::Masterwork => 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelRodDef {
    pub kind: RodKind,
    #[serde(default)]
    pub quality: RodQuality,
    /// Starting durability; a fresh rod when absent.
    #[serde(default)]
    pub durability: Option<f64>,
}

impl FuelRodDef {
    pub const fn fresh(kind: RodKind) -> Self {
        Self {
            kind,
            quality: RodQuality::Normal,
            durability: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorDef {
    /// kW at full turbine output.
    pub max_power_output: f64,
    #[serde(default = "default_multiplier")]
    pub max_power_output_multiplier: f64,
    #[serde(default)]
    pub rods: [Option<FuelRodDef>; 4],
    /// Durability lost per second at 100% fission.
    #[serde(default = "default_fuel_consumption_rate")]
    pub fuel_consumption_rate: f64,
    /// Seconds at critical temperature before meltdown.
    #[serde(default = "default_melt_down_delay")]
    pub melt_down_delay: f64,
    /// Seconds at hot temperature before the reactor catches fire.
    #[serde(default = "default_fire_delay")]
    pub fire_delay: f64,
    #[serde(default = "default_health")]
    pub reactor_max_health: f64,
    /// Starting health; `reactor_max_health` when absent.
    #[serde(default)]
    pub reactor_health: Option<f64>,
    /// Operator skill in `[0, 1]`; widens the tolerance bands.
    #[serde(default = "default_degree_of_success")]
    pub degree_of_success: f64,
    #[serde(default = "default_true")]
    pub power_on: bool,
    #[serde(default = "default_true")]
    pub auto_temp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerContainerDef {
    /// Capacity in kW·min.
    pub max_charge: f64,
    #[serde(default = "default_multiplier")]
    pub max_charge_multiplier: f64,
    #[serde(default)]
    pub charge: f64,
    /// kW drawn at 100% charge rate.
    pub max_recharge_speed: f64,
    #[serde(default)]
    pub exponential_recharge_speed: bool,
    /// kW delivered when charged above 10%.
    pub max_output: f64,
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
}

/// A pure consumer, optionally with a fixed supply of its own.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadGeneratorDef {
    #[serde(default)]
    pub load: f64,
    /// Fixed output settled in the `Default` tier.
    #[serde(default)]
    pub power: f64,
}

/// Overload failure model of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDef {
    /// Voltage above which the grid takes damage.
    #[serde(default = "default_overload_voltage")]
    pub overload_voltage: f64,
    /// Seconds between overload damage rolls.
    #[serde(default = "default_overload_cooldown")]
    pub overload_cooldown: f64,
    #[serde(default = "default_health")]
    pub max_health: f64,
    /// Chance per damage roll that the grid fails outright.
    #[serde(default = "default_catastrophic_chance")]
    pub catastrophic_failure_chance: f64,
}

impl Default for GridDef {
    fn default() -> Self {
        Self {
            overload_voltage: default_overload_voltage(),
            overload_cooldown: default_overload_cooldown(),
            max_health: default_health(),
            catastrophic_failure_chance: default_catastrophic_chance(),
        }
    }
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_fuel_consumption_rate() -> f64 {
    0.2
}

fn default_melt_down_delay() -> f64 {
    30.0
}

fn default_fire_delay() -> f64 {
    20.0
}

fn default_health() -> f64 {
    100.0
}

fn default_degree_of_success() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_efficiency() -> f64 {
    0.95
}

fn default_overload_voltage() -> f64 {
    2.0
}

fn default_overload_cooldown() -> f64 {
    5.0
}

fn default_catastrophic_chance() -> f64 {
    0.015
}

// ---------------------------------------------------------------------------
// Run bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    /// Simulated seconds elapsed.
    pub time_s: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
}

/// Why a run cannot meaningfully continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    ReactorMelted(DeviceId),
    GridDestroyed,
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::ReactorMelted(device) => write!(f, "reactor {device} melted down"),
            HaltReason::GridDestroyed => f.write_str("grid destroyed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    SetFissionRate { device: DeviceId, signal: Signal },
    SetTurbineOutput { device: DeviceId, signal: Signal },
    SetChargeRate { device: DeviceId, percent: f64 },
    SetLoad { device: DeviceId, load_kw: f64 },
    SetPowerOn { device: DeviceId, on: bool },
    SetAutoTemp { device: DeviceId, enabled: bool },
}

impl Command {
    pub fn device(&self) -> DeviceId {
        match *self {
            Command::SetFissionRate { device, .. }
            | Command::SetTurbineOutput { device, .. }
            | Command::SetChargeRate { device, .. }
            | Command::SetLoad { device, .. }
            | Command::SetPowerOn { device, .. }
            | Command::SetAutoTemp { device, .. } => device,
        }
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ReactorMeltdown {
        device: DeviceId,
        temperature: f64,
    },
    ReactorFireStarted {
        device: DeviceId,
    },
    ReactorFireExtinguished {
        device: DeviceId,
        health: f64,
    },
    FuelDepleted {
        device: DeviceId,
    },
    GridOverloadDamage {
        damage: f64,
        health: f64,
    },
    GridDestroyed,
    /// A command named a device that does not accept it.
    CommandRejected {
        command: CommandId,
        device: DeviceId,
    },
}
