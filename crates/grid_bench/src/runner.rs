use crate::run_result::{self, IterationSummary, Outcome, RunResult};
use crate::stats::IterationStats;
use anyhow::{Context, Result};
use grid_control::SimStatus;
use grid_core::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
use grid_world::Scenario;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

pub struct SeedResult {
    pub seed: u64,
    pub outcome: Outcome,
    pub stats: IterationStats,
    pub final_snapshot: MetricsSnapshot,
    pub run_id: String,
}

/// Run one seed of `scenario` flat out, writing metrics CSVs and
/// `run_result.json` into `seed_dir`.
pub fn run_seed(
    scenario: &Scenario,
    seed: u64,
    seed_dir: &Path,
    scenario_params: &serde_json::Value,
) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;

    let mut driver = grid_world::build_world(scenario)?
        .into_driver(
            scenario.tick_rate,
            SimStatus::Endless,
            ChaCha8Rng::seed_from_u64(seed),
        )
        .with_max_ticks(scenario.ticks);

    let mut metrics_writer = MetricsFileWriter::new(seed_dir.to_path_buf())
        .with_context(|| format!("opening metrics CSV in {}", seed_dir.display()))?;
    let mut stats = IterationStats::default();
    let dt = driver.target_delta();

    while driver.status() != SimStatus::Stopped {
        let report = driver.step(dt);
        stats.observe(driver.grid(), dt);
        if report.info.tick % scenario.metrics_every == 0 {
            metrics_writer
                .write_row(&compute_metrics(driver.grid()))
                .context("writing metrics row")?;
        }
    }

    // Always capture the final state, also for runs halted between samples.
    let final_snapshot = compute_metrics(driver.grid());
    if final_snapshot.tick % scenario.metrics_every != 0 {
        metrics_writer
            .write_row(&final_snapshot)
            .context("writing final metrics row")?;
    }
    metrics_writer.flush().context("flushing metrics")?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    let sim_ticks_per_second = if wall_time_ms > 0 {
        (final_snapshot.tick as f64) / (wall_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    let outcome = Outcome::from_stop(driver.stop_reason());
    let halted = outcome != Outcome::Survived;
    debug!(seed, outcome = outcome.as_str(), tick = final_snapshot.tick, "seed finished");

    let run_result = RunResult {
        run_schema_version: 1,
        run_status: "completed".to_string(),
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: scenario.name.clone(),
        scenario_params: scenario_params.clone(),
        tick_end: final_snapshot.tick,
        total_ticks: scenario.ticks,
        wall_time_ms,
        sim_ticks_per_second,
        outcome,
        halt_tick: halted.then_some(final_snapshot.tick),
        halt_reason: driver
            .grid()
            .halt_reason()
            .map(|reason| reason.to_string()),
        iteration: IterationSummary::from_stats(&stats),
        final_metrics: final_snapshot.clone(),
        metrics_path: "metrics_000.csv".to_string(),
    };

    run_result
        .write_atomic(&seed_dir.join("run_result.json"))
        .context("writing run_result.json")?;

    Ok(SeedResult {
        seed,
        outcome,
        stats,
        final_snapshot,
        run_id,
    })
}
