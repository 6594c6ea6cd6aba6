//! Run the built-in demonstration scenarios and print a summary table.

use anyhow::{bail, Result};
use clap::Parser;
use faf_cli::demo::{builtin_scenarios, find};
use faf_cli::{init_tracing, Config, RunReport};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the built-in FAF approach scenarios")]
struct Args {
    /// Run a single scenario by name
    #[arg(long)]
    only: Option<String>,

    /// List scenario names and exit
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Print JSON reports instead of the table
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(&config)?;
    let rules = config.load_rules()?;

    let scenarios = match &args.only {
        Some(name) => match find(name) {
            Some(scenario) => vec![scenario],
            None => bail!("unknown scenario '{name}' (see --list)"),
        },
        None => builtin_scenarios(),
    };

    if args.list {
        for scenario in &scenarios {
            let inputs = scenario.to_inputs();
            println!(
                "{:<28} {:<10} ({:.1}, {:.1}, {:.1}) hdg {:>3.0}",
                inputs.name,
                inputs.aircraft.class.as_str(),
                inputs.pose.position.x,
                inputs.pose.position.y,
                inputs.pose.position.z,
                inputs.pose.heading_deg
            );
        }
        return Ok(());
    }

    let mut failures = 0;
    for scenario in &scenarios {
        let inputs = scenario.to_inputs();
        let result = inputs.plan(&rules);
        let report = RunReport::from_result(&inputs.name, inputs.aircraft.class, &result, false);
        if !report.is_planned() {
            failures += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}", report.summary_line());
        }
    }

    if !args.json {
        println!();
        println!("{} scenarios, {} planned, {} failed", scenarios.len(), scenarios.len() - failures, failures);
    }
    Ok(())
}
