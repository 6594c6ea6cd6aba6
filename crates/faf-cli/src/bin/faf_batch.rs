//! Plan N random scenarios in parallel and summarize the outcomes.
//!
//! Usage: cargo run --bin faf-batch -- --count 500 --seed 7 --workers 8

use anyhow::{Context, Result};
use clap::Parser;
use faf_cli::{generate_scenarios, init_tracing, run_batch, BatchConfig, BatchSummary, Config};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Randomized batch evaluation of the FAF planner")]
struct Args {
    /// Number of scenarios
    #[arg(long, default_value_t = 100)]
    count: usize,

    /// RNG seed; the same seed replays the same batch
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Maximum obstacles per scenario
    #[arg(long, default_value_t = 3)]
    max_obstacles: usize,

    /// Worker threads (defaults to FAF_WORKERS, then the CPU count)
    #[arg(long)]
    workers: Option<usize>,

    /// Write every run report as JSON lines
    #[arg(long)]
    reports: Option<PathBuf>,

    /// Print failing scenarios
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(&config)?;
    let rules = config.load_rules()?;

    let batch = BatchConfig {
        count: args.count,
        seed: args.seed,
        max_obstacles: args.max_obstacles,
        ..BatchConfig::default()
    };
    let scenarios = generate_scenarios(&batch);
    let workers = args.workers.or(config.workers);

    println!("Planning {} scenarios (seed {})...", scenarios.len(), batch.seed);
    let started = Instant::now();
    let reports = run_batch(&scenarios, &rules, workers, false)?;
    let elapsed = started.elapsed();

    if let Some(path) = &args.reports {
        let mut lines = String::new();
        for report in &reports {
            lines.push_str(&serde_json::to_string(report)?);
            lines.push('\n');
        }
        fs::write(path, lines).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Reports written to {}", path.display());
    }

    if args.verbose {
        for report in reports.iter().filter(|r| !r.is_planned()) {
            println!("  {}", report.summary_line());
        }
    }

    let summary = BatchSummary::from_reports(&reports);
    println!();
    println!("=== Batch summary ===");
    println!("Total:      {}", summary.total);
    println!("Planned:    {} ({:.1}%)", summary.planned, summary.success_rate() * 100.0);
    println!("Failed:     {}", summary.failed);
    println!("Spirals:    {}", summary.with_spiral);
    println!("Avoidance:  {}", summary.with_avoidance);
    println!("Mean time:  {:.1} s", summary.mean_flight_time_s);
    println!("By mode:");
    for (mode, count) in &summary.by_mode {
        println!("  {mode:<18} {count}");
    }
    if !summary.by_failure.is_empty() {
        println!("By failure:");
        for (kind, count) in &summary.by_failure {
            println!("  {kind:<22} {count}");
        }
    }
    println!("Elapsed:    {:.2?}", elapsed);
    Ok(())
}
