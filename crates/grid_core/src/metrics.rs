//! Snapshot metrics computed from a `PowerGrid`.
//!
//! `compute_metrics` samples the network for time-series analysis. No state
//! mutation; the only IO is the CSV writers at the bottom.

use serde::Serialize;
use std::io::Write;

use crate::PowerGrid;

/// Current schema version. Bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub metrics_version: u32,
    pub time_s: f64,

    // Grid
    pub grid_voltage: f64,
    pub grid_load_kw: f64,
    pub grid_power_kw: f64,
    pub grid_health: f64,

    // Reactors
    pub reactor_count: u32,
    pub reactors_melted: u32,
    pub reactors_on_fire: u32,
    pub max_reactor_temperature: f64,
    pub avg_fission_rate: f64,
    pub avg_turbine_output: f64,
    pub total_reactor_output_kw: f64,
    pub min_fuel_pct: f64,

    // Batteries
    pub battery_count: u32,
    pub avg_battery_charge_pct: f64,
    pub total_battery_output_kw: f64,
}

pub fn compute_metrics(grid: &PowerGrid) -> MetricsSnapshot {
    let mut reactor_count = 0_u32;
    let mut reactors_melted = 0_u32;
    let mut reactors_on_fire = 0_u32;
    let mut max_temperature = 0.0_f64;
    let mut fission_sum = 0.0;
    let mut turbine_sum = 0.0;
    let mut reactor_output = 0.0;
    let mut min_fuel_pct = f64::MAX;

    for (id, reactor) in grid.reactors() {
        reactor_count += 1;
        if reactor.melted() {
            reactors_melted += 1;
        }
        if reactor.is_burning() {
            reactors_on_fire += 1;
        }
        max_temperature = max_temperature.max(reactor.temperature());
        fission_sum += reactor.fission_rate();
        turbine_sum += reactor.turbine_output();
        reactor_output += grid.output(id).unwrap_or(0.0);
        min_fuel_pct = min_fuel_pct.min(reactor.fuel_percentage_left());
    }

    let mut battery_count = 0_u32;
    let mut charge_sum = 0.0;
    let mut battery_output = 0.0;
    for (_, battery) in grid.batteries() {
        battery_count += 1;
        charge_sum += battery.charge_percentage();
        battery_output += battery.power_value_out();
    }

    let average = |sum: f64, count: u32| {
        if count > 0 {
            sum / f64::from(count)
        } else {
            0.0
        }
    };

    MetricsSnapshot {
        tick: grid.tick(),
        metrics_version: METRICS_VERSION,
        time_s: grid.time_s(),
        grid_voltage: grid.grid().voltage,
        grid_load_kw: grid.grid().load,
        grid_power_kw: grid.grid().power,
        grid_health: grid.grid().health(),
        reactor_count,
        reactors_melted,
        reactors_on_fire,
        max_reactor_temperature: max_temperature,
        avg_fission_rate: average(fission_sum, reactor_count),
        avg_turbine_output: average(turbine_sum, reactor_count),
        total_reactor_output_kw: reactor_output,
        min_fuel_pct: if reactor_count > 0 { min_fuel_pct } else { 0.0 },
        battery_count,
        avg_battery_charge_pct: average(charge_sum, battery_count),
        total_battery_output_kw: battery_output,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "tick,metrics_version,time_s,\
         grid_voltage,grid_load_kw,grid_power_kw,grid_health,\
         reactor_count,reactors_melted,reactors_on_fire,max_reactor_temperature,\
         avg_fission_rate,avg_turbine_output,total_reactor_output_kw,min_fuel_pct,\
         battery_count,avg_battery_charge_pct,total_battery_output_kw"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.tick,
        snapshot.metrics_version,
        snapshot.time_s,
        snapshot.grid_voltage,
        snapshot.grid_load_kw,
        snapshot.grid_power_kw,
        snapshot.grid_health,
        snapshot.reactor_count,
        snapshot.reactors_melted,
        snapshot.reactors_on_fire,
        snapshot.max_reactor_temperature,
        snapshot.avg_fission_rate,
        snapshot.avg_turbine_output,
        snapshot.total_reactor_output_kw,
        snapshot.min_fuel_pct,
        snapshot.battery_count,
        snapshot.avg_battery_charge_pct,
        snapshot.total_battery_output_kw,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}
