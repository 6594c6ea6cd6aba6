//! Command-line front end for the FAF trajectory planner.
//!
//! Scenario files, run reports, the built-in demonstration set and the
//! randomized batch runner live here; the binaries under `src/bin` are thin
//! wrappers around these modules.

pub mod batch;
pub mod config;
pub mod demo;
pub mod report;
pub mod scenario;

pub use batch::{generate_scenarios, run_batch, BatchConfig, BatchSummary};
pub use config::{init_tracing, Config};
pub use report::{RunReport, RunStatus};
pub use scenario::{PlanInputs, ScenarioFile};
