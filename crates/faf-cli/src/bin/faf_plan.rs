//! Plan one scenario file and print (or write) the JSON report.
//!
//! Usage: cargo run --bin faf-plan -- scenario.json --dense --output report.json

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use faf_cli::{init_tracing, Config, RunReport, ScenarioFile};
use faf_core::AircraftClass;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan a trajectory to the FAF for one scenario")]
struct Args {
    /// Scenario JSON file
    scenario: PathBuf,

    /// Override the scenario's aircraft class
    #[arg(long, value_enum)]
    class: Option<ClassArg>,

    /// Planner rules override (takes precedence over FAF_RULES)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Include the full trajectory and parameter arrays
    #[arg(long, default_value_t = false)]
    dense: bool,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ClassArg {
    Light,
    Commercial,
    Cargo,
}

impl From<ClassArg> for AircraftClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Light => AircraftClass::Light,
            ClassArg::Commercial => AircraftClass::Commercial,
            ClassArg::Cargo => AircraftClass::Cargo,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env();
    if args.rules.is_some() {
        config.rules_path = args.rules.clone();
    }
    init_tracing(&config)?;

    let rules = config.load_rules()?;
    let mut scenario = ScenarioFile::load(&args.scenario)?;
    if let Some(class) = args.class {
        scenario.aircraft.class_name = AircraftClass::from(class).as_str().to_string();
    }
    for warning in scenario.warnings() {
        tracing::warn!("{warning}");
    }

    let inputs = scenario.to_inputs();
    let result = inputs.plan(&rules);
    let report = RunReport::from_result(&inputs.name, inputs.aircraft.class, &result, args.dense);
    let json = serde_json::to_string_pretty(&report)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", report.summary_line());
            println!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Err(err) = result {
        anyhow::bail!("planning failed: {err}");
    }
    Ok(())
}
