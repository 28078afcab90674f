use grid_control::StopReason;
use grid_core::{HaltReason, MetricsSnapshot};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::stats::IterationStats;

/// How a seed's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Survived,
    Melted,
    GridDestroyed,
}

impl Outcome {
    pub fn from_stop(reason: Option<StopReason>) -> Self {
        match reason {
            Some(StopReason::Halted(HaltReason::ReactorMelted(_))) => Outcome::Melted,
            Some(StopReason::Halted(HaltReason::GridDestroyed)) => Outcome::GridDestroyed,
            Some(StopReason::TickLimit | StopReason::Requested) | None => Outcome::Survived,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Survived => "survived",
            Outcome::Melted => "melted",
            Outcome::GridDestroyed => "grid_destroyed",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub tick_end: u64,
    pub total_ticks: u64,
    pub wall_time_ms: u64,
    pub sim_ticks_per_second: f64,
    pub outcome: Outcome,
    pub halt_tick: Option<u64>,
    pub halt_reason: Option<String>,
    pub iteration: IterationSummary,
    pub final_metrics: MetricsSnapshot,
    pub metrics_path: String,
}

/// `IterationStats` plus its derived averages.
#[derive(Debug, Serialize)]
pub struct IterationSummary {
    #[serde(flatten)]
    pub stats: IterationStats,
    pub avg_voltage: f64,
    pub avg_blip: f64,
}

impl IterationSummary {
    pub fn from_stats(stats: &IterationStats) -> Self {
        Self {
            stats: stats.clone(),
            avg_voltage: stats.avg_voltage(),
            avg_blip: stats.avg_blip(),
        }
    }
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}
