use grid_core::{EventEnvelope, HaltReason, PowerGrid};
use rand::RngCore;
use serde::Serialize;
use tracing::info;

use crate::ControlSource;

/// How the driver paces ticks. The driver itself always takes `dt` from its
/// caller; `RealTime` only tells the caller to measure it from the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimStatus {
    RealTime,
    Endless,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Halted(HaltReason),
    TickLimit,
    Requested,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SimInfo {
    pub tick: u64,
    /// Simulated seconds elapsed.
    pub time: f64,
    pub delta_time: f64,
    pub tick_rate: f64,
    pub max_ticks: Option<u64>,
}

#[derive(Debug)]
pub struct StepReport {
    pub info: SimInfo,
    pub events: Vec<EventEnvelope>,
    pub status: SimStatus,
}

/// Runs controllers and the grid tick by tick until a stop condition.
pub struct Driver<R: RngCore> {
    grid: PowerGrid,
    controllers: Vec<Box<dyn ControlSource>>,
    rng: R,
    next_command_id: u64,
    tick_rate: f64,
    max_ticks: Option<u64>,
    status: SimStatus,
    stop_reason: Option<StopReason>,
}

impl<R: RngCore> Driver<R> {
    pub fn new(grid: PowerGrid, tick_rate: f64, status: SimStatus, rng: R) -> Self {
        Self {
            grid,
            controllers: Vec::new(),
            rng,
            next_command_id: 0,
            tick_rate: tick_rate.max(f64::MIN_POSITIVE),
            max_ticks: None,
            status,
            stop_reason: None,
        }
    }

    #[must_use]
    pub fn with_controller(mut self, controller: Box<dyn ControlSource>) -> Self {
        self.controllers.push(controller);
        self
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn grid(&self) -> &PowerGrid {
        &self.grid
    }

    pub fn status(&self) -> SimStatus {
        self.status
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    /// Fixed step length for `Endless` runs.
    pub fn target_delta(&self) -> f64 {
        1.0 / self.tick_rate
    }

    pub fn stop(&mut self) {
        self.finish(StopReason::Requested);
    }

    fn finish(&mut self, reason: StopReason) {
        if self.status != SimStatus::Stopped {
            info!(tick = self.grid.tick(), ?reason, "simulation stopped");
        }
        self.status = SimStatus::Stopped;
        self.stop_reason.get_or_insert(reason);
    }

    /// One tick: controllers issue commands, the grid steps, then the stop
    /// conditions are checked.
    pub fn step(&mut self, dt: f64) -> StepReport {
        let mut commands = Vec::new();
        for controller in &mut self.controllers {
            commands.extend(controller.generate_commands(
                &self.grid,
                &mut self.rng,
                &mut self.next_command_id,
            ));
        }

        let events = self.grid.step(&commands, dt, &mut self.rng);

        if let Some(reason) = self.grid.halt_reason() {
            self.finish(StopReason::Halted(reason));
        } else if self.max_ticks.is_some_and(|max| self.grid.tick() >= max) {
            self.finish(StopReason::TickLimit);
        }

        StepReport {
            info: SimInfo {
                tick: self.grid.tick(),
                time: self.grid.time_s(),
                delta_time: dt,
                tick_rate: self.tick_rate,
                max_ticks: self.max_ticks,
            },
            events,
            status: self.status,
        }
    }

    /// Step at `1 / tick_rate` until stopped, handing each report to
    /// `on_tick`. Returning `Some(status)` from the callback overrides the
    /// driver's status, as with a logic hook.
    pub fn run_fixed(
        &mut self,
        mut on_tick: impl FnMut(&StepReport, &PowerGrid) -> Option<SimStatus>,
    ) -> Option<StopReason> {
        let dt = self.target_delta();
        while self.status != SimStatus::Stopped {
            let report = self.step(dt);
            if let Some(SimStatus::Stopped) = on_tick(&report, &self.grid) {
                self.stop();
            }
        }
        self.stop_reason
    }
}
