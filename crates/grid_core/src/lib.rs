//! `grid_core`: deterministic power-grid and reactor simulation.
//!
//! No network, no wall clock. All randomness via the passed-in Rng.

mod commands;
mod engine;
mod fuel_rod;
mod grid;
mod load_generator;
pub mod math;
pub mod metrics;
mod power_container;
mod power_range;
mod powered;
mod reactor;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use engine::{Device, GridDevice, PowerGrid};
pub use fuel_rod::FuelRod;
pub use grid::{Grid, OverloadOutcome};
pub use load_generator::{normal_load, LoadGenerator};
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use power_container::PowerContainer;
pub use power_range::PowerRange;
pub use powered::{Powered, Resolution, Simulated};
pub use reactor::Reactor;
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
