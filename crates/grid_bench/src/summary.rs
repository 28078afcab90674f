use serde::Serialize;

use crate::run_result::Outcome;
use crate::runner::SeedResult;

type Extractor = (&'static str, Box<dyn Fn(&SeedResult) -> f64>);

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub survived_count: usize,
    pub melted_count: usize,
    pub grid_destroyed_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

fn extractors() -> Vec<Extractor> {
    vec![
        ("time_alive_s", Box::new(|r| r.stats.time_alive_s)),
        ("avg_voltage", Box::new(|r| r.stats.avg_voltage())),
        ("min_seen_voltage", Box::new(|r| r.stats.min_seen_voltage)),
        ("max_seen_voltage", Box::new(|r| r.stats.max_seen_voltage)),
        ("voltage_blips", Box::new(|r| r.stats.voltage_blips as f64)),
        ("avg_voltage_blip", Box::new(|r| r.stats.avg_blip())),
        ("grid_health", Box::new(|r| r.final_snapshot.grid_health)),
        (
            "max_reactor_temperature",
            Box::new(|r| r.final_snapshot.max_reactor_temperature),
        ),
        ("min_fuel_pct", Box::new(|r| r.final_snapshot.min_fuel_pct)),
        (
            "avg_battery_charge_pct",
            Box::new(|r| r.final_snapshot.avg_battery_charge_pct),
        ),
    ]
}

pub fn compute_summary(results: &[SeedResult]) -> SummaryStats {
    let count = |outcome: Outcome| results.iter().filter(|r| r.outcome == outcome).count();

    let metrics = extractors()
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = results.iter().map(|r| extract(r)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count: results.len(),
        survived_count: count(Outcome::Survived),
        melted_count: count(Outcome::Melted),
        grid_destroyed_count: count(Outcome::GridDestroyed),
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev: variance.sqrt(),
    }
}

pub fn print_summary(scenario_name: &str, ticks: u64, stats: &SummaryStats) {
    println!(
        "\n=== {} ({} seeds, up to {} ticks each) ===\n",
        scenario_name, stats.seed_count, ticks
    );
    println!(
        "{:<26} {:>10} {:>10} {:>10} {:>10}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(70));
    for metric in &stats.metrics {
        println!(
            "{:<26} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<26} survived={} melted={} grid_destroyed={}",
        "outcomes", stats.survived_count, stats.melted_count, stats.grid_destroyed_count
    );
}

/// One CSV row per seed for spreadsheet digging.
pub fn write_seed_table(path: &std::path::Path, results: &[SeedResult]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["seed", "run_id", "outcome", "tick_end"];
    header.extend(extractors().iter().map(|(name, _)| *name));
    writer.write_record(&header)?;

    let extractors = extractors();
    for result in results {
        let mut record = vec![
            result.seed.to_string(),
            result.run_id.clone(),
            result.outcome.as_str().to_string(),
            result.final_snapshot.tick.to_string(),
        ];
        record.extend(extractors.iter().map(|(_, extract)| extract(result).to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
