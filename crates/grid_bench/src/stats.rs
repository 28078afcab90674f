use grid_core::PowerGrid;
use serde::Serialize;

/// Voltage deviation from nominal that counts as a blip.
const BLIP_THRESHOLD: f64 = 0.1;
/// Start-up seconds ignored by blip counting while the grid settles.
const SETTLE_SECONDS: f64 = 1.0;

/// Per-run voltage and survival accumulator, fed once per tick.
#[derive(Debug, Clone, Serialize)]
pub struct IterationStats {
    pub ticks: u64,
    pub time_alive_s: f64,
    pub max_seen_voltage: f64,
    pub min_seen_voltage: f64,
    pub voltage_sum: f64,
    pub voltage_blips: u64,
    pub voltage_blip_sum: f64,
}

impl Default for IterationStats {
    fn default() -> Self {
        Self {
            ticks: 0,
            time_alive_s: 0.0,
            max_seen_voltage: f64::NEG_INFINITY,
            min_seen_voltage: f64::INFINITY,
            voltage_sum: 0.0,
            voltage_blips: 0,
            voltage_blip_sum: 0.0,
        }
    }
}

impl IterationStats {
    /// Record the grid after a completed tick of length `dt`.
    pub fn observe(&mut self, grid: &PowerGrid, dt: f64) {
        let voltage = grid.grid().voltage;
        self.ticks += 1;
        self.time_alive_s += dt;
        self.voltage_sum += voltage;
        self.max_seen_voltage = self.max_seen_voltage.max(voltage);
        self.min_seen_voltage = self.min_seen_voltage.min(voltage);

        let deviation = (voltage - 1.0).abs();
        if grid.time_s() > SETTLE_SECONDS && deviation > BLIP_THRESHOLD {
            self.voltage_blips += 1;
            self.voltage_blip_sum += deviation;
        }
    }

    pub fn avg_voltage(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.voltage_sum / self.ticks as f64
        }
    }

    /// Mean deviation of the blips seen, 0 without any.
    pub fn avg_blip(&self) -> f64 {
        if self.voltage_blips == 0 {
            0.0
        } else {
            self.voltage_blip_sum / self.voltage_blips as f64
        }
    }
}
