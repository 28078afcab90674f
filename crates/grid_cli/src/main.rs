use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use grid_control::{Driver, SimStatus, StepReport, StopReason};
use grid_core::{compute_metrics, Event, MetricsFileWriter, PowerGrid};
use grid_world::{build_world, load_scenario, Scenario};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "grid_cli", about = "Reactor and power grid simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation of a scenario.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, default_value = "./content/scenario.json")]
    scenario: PathBuf,
    /// Seed for this run. Defaults to the scenario's first seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Tick limit. Defaults to the scenario's `ticks`.
    #[arg(long)]
    ticks: Option<u64>,
    /// Pace ticks against the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
    /// Simulated seconds per wall-clock second in real-time mode.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
    #[arg(long, default_value_t = 100)]
    print_every: u64,
    /// Sample metrics every N ticks. Defaults to the scenario's `metrics_every`.
    #[arg(long)]
    metrics_every: Option<u64>,
    /// Disable metrics collection to the runs/ directory.
    #[arg(long)]
    no_metrics: bool,
}

// ---------------------------------------------------------------------------
// Run directory
// ---------------------------------------------------------------------------

fn generate_run_id(seed: u64) -> String {
    format!("{}_seed{seed}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
}

fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_run_info(
    dir: &Path,
    run_id: &str,
    seed: u64,
    ticks: u64,
    scenario: &Scenario,
    metrics_every: u64,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "scenario": scenario.name,
        "tick_rate": scenario.tick_rate,
        "ticks": ticks,
        "metrics_every": metrics_every,
        "runner": "grid_cli",
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Per-tick reporting shared by both pacing modes.
struct Session {
    print_every: u64,
    metrics_every: u64,
    metrics: Option<MetricsFileWriter>,
}

impl Session {
    fn observe(&mut self, report: &StepReport, grid: &PowerGrid) -> Result<()> {
        // Notable events print regardless of print_every.
        for envelope in &report.events {
            match &envelope.event {
                Event::ReactorMeltdown {
                    device,
                    temperature,
                } => println!(
                    "*** MELTDOWN: {device} at tick={:06} temperature={temperature:.1} ***",
                    envelope.tick
                ),
                Event::GridDestroyed => {
                    println!("*** GRID DESTROYED at tick={:06} ***", envelope.tick);
                }
                _ => {}
            }
        }

        if report.info.tick % self.print_every == 0 {
            print_status(grid);
        }

        if let Some(writer) = &mut self.metrics {
            if report.info.tick % self.metrics_every == 0 {
                writer
                    .write_row(&compute_metrics(grid))
                    .context("writing metrics row")?;
            }
        }
        Ok(())
    }
}

fn run_fixed(driver: &mut Driver<ChaCha8Rng>, session: &mut Session) -> Result<()> {
    let dt = driver.target_delta();
    while driver.status() != SimStatus::Stopped {
        let report = driver.step(dt);
        session.observe(&report, driver.grid())?;
    }
    Ok(())
}

/// Tick at `tick_rate` per wall-clock second; each step advances by the
/// measured wall time scaled by `speed`.
async fn run_realtime(
    driver: &mut Driver<ChaCha8Rng>,
    session: &mut Session,
    speed: f64,
) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(driver.target_delta()));
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // The first interval tick completes immediately.
    interval.tick().await;
    let mut last = Instant::now();

    while driver.status() != SimStatus::Stopped {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64() * speed;
                last = now;
                let report = driver.step(dt);
                session.observe(&report, driver.grid())?;
            }
            result = &mut ctrl_c => {
                result.context("listening for ctrl-c")?;
                warn!(tick = driver.grid().tick(), "interrupted");
                driver.stop();
            }
        }
    }
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    ensure!(
        args.speed.is_finite() && args.speed > 0.0,
        "--speed must be a positive number, got {}",
        args.speed
    );
    let scenario = load_scenario(&args.scenario)?;
    let seed = match args.seed {
        Some(seed) => seed,
        None => scenario
            .seeds
            .expand()
            .first()
            .copied()
            .context("scenario has no seeds")?,
    };
    let ticks = args.ticks.unwrap_or(scenario.ticks);
    let metrics_every = args.metrics_every.unwrap_or(scenario.metrics_every).max(1);

    let world = build_world(&scenario)?;
    let device_count = world.grid.device_count();
    let status = if args.realtime {
        SimStatus::RealTime
    } else {
        SimStatus::Endless
    };
    let mut driver = world
        .into_driver(scenario.tick_rate, status, ChaCha8Rng::seed_from_u64(seed))
        .with_max_ticks(ticks);

    let mut metrics = None;
    if !args.no_metrics {
        let run_id = generate_run_id(seed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(&run_dir, &run_id, seed, ticks, &scenario, metrics_every)?;
        let writer = MetricsFileWriter::new(run_dir.clone())
            .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
        metrics = Some(writer);
        println!("Run directory: {}", run_dir.display());
    }
    let mut session = Session {
        print_every: args.print_every.max(1),
        metrics_every,
        metrics,
    };

    println!(
        "Starting simulation: scenario={} seed={seed} ticks={ticks} tick_rate={} devices={device_count} mode={status:?}",
        scenario.name, scenario.tick_rate,
    );
    println!("{}", "-".repeat(80));

    if args.realtime {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("starting tokio runtime")?;
        runtime.block_on(run_realtime(&mut driver, &mut session, args.speed))?;
    } else {
        run_fixed(&mut driver, &mut session)?;
    }

    println!("{}", "-".repeat(80));
    let reason = describe(driver.stop_reason());
    info!(tick = driver.grid().tick(), %reason, "run finished");
    println!("Done at tick {} ({reason}). Final state:", driver.grid().tick());
    print_status(driver.grid());

    if let Some(writer) = &mut session.metrics {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }
    Ok(())
}

fn describe(reason: Option<StopReason>) -> String {
    match reason {
        Some(StopReason::Halted(halt)) => halt.to_string(),
        Some(StopReason::TickLimit) => "tick limit reached".to_string(),
        Some(StopReason::Requested) => "stopped by request".to_string(),
        None => "still running".to_string(),
    }
}

fn print_status(grid: &PowerGrid) {
    let m = compute_metrics(grid);
    println!(
        "[tick={:06}  t={:8.1}s]  V={:.3}  load={:.0}kW  power={:.0}kW  health={:.0}  \
         temp_max={:.1}  fission={:.1}  turbine={:.1}  fuel_min={:.1}%  battery={:.1}%",
        m.tick,
        m.time_s,
        m.grid_voltage,
        m.grid_load_kw,
        m.grid_power_kw,
        m.grid_health,
        m.max_reactor_temperature,
        m.avg_fission_rate,
        m.avg_turbine_output,
        m.min_fuel_pct,
        m.avg_battery_charge_pct,
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args),
    }
}
