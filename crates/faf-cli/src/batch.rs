//! Randomized batch evaluation.
//!
//! Scenarios are drawn from a seeded RNG so a batch can be replayed exactly.
//! Each planner call is independent, so evaluation fans out over a rayon pool.

use crate::report::RunReport;
use crate::scenario::PlanInputs;
use anyhow::{Context, Result};
use faf_core::{AircraftClass, Environment, Obstacle, PlannerRules, Pose, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub count: usize,
    pub seed: u64,
    /// Upper bound on cylinders per scenario
    pub max_obstacles: usize,
    /// Airspace box the aircraft is placed in (km)
    pub size: Vec3,
    pub environment: Environment,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 100,
            seed: 42,
            max_obstacles: 3,
            size: Vec3::new(50.0, 50.0, 5.0),
            environment: Environment::new(Vec3::new(5.0, 25.0, 0.0), Vec3::new(20.0, 25.0, 1.0)),
        }
    }
}

/// Draw `config.count` scenarios. The same config always yields the same list.
pub fn generate_scenarios(config: &BatchConfig) -> Vec<PlanInputs> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    (0..config.count)
        .map(|index| random_scenario(&mut rng, index, config))
        .collect()
}

fn random_scenario(rng: &mut StdRng, index: usize, config: &BatchConfig) -> PlanInputs {
    let class = AircraftClass::ALL[rng.random_range(0..AircraftClass::ALL.len())];
    let aircraft = class.profile();
    let size = config.size;
    let position = Vec3::new(
        rng.random_range(0.0..=size.x),
        rng.random_range(0.0..=size.y),
        rng.random_range(0.3..=size.z),
    );
    let heading = rng.random_range(0.0..360.0);
    let speed = rng.random_range(aircraft.min_speed_kmh..=aircraft.max_speed_kmh);

    let faf = config.environment.faf.xy();
    let start = position.xy();
    let wanted = if config.max_obstacles == 0 {
        0
    } else {
        rng.random_range(0..=config.max_obstacles)
    };
    let mut obstacles = Vec::with_capacity(wanted);
    for _ in 0..wanted {
        let obstacle = Obstacle::new(
            rng.random_range(0.0..=size.x),
            rng.random_range(0.0..=size.y),
            rng.random_range(0.5..=3.0),
            rng.random_range(0.5..=size.z),
        );
        // Cylinders swallowing the start or the FAF make the scenario pointless
        if clear_of(&obstacle, start) && clear_of(&obstacle, faf) {
            obstacles.push(obstacle);
        }
    }

    PlanInputs {
        name: format!("random-{index:04}"),
        pose: Pose::new(position, heading, speed),
        aircraft,
        environment: config.environment,
        obstacles,
    }
}

fn clear_of(obstacle: &Obstacle, point: Vec2) -> bool {
    obstacle.clearance(point) > 1.0
}

/// Plan every scenario, in parallel. Reports come back in input order.
pub fn run_batch(
    scenarios: &[PlanInputs],
    rules: &PlannerRules,
    workers: Option<usize>,
    dense: bool,
) -> Result<Vec<RunReport>> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = workers {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build().context("Failed to build worker pool")?;
    info!(scenarios = scenarios.len(), threads = pool.current_num_threads(), "running batch");

    let reports = pool.install(|| {
        scenarios
            .par_iter()
            .map(|inputs| {
                let result = inputs.plan(rules);
                debug!(scenario = %inputs.name, ok = result.is_ok(), "scenario evaluated");
                RunReport::from_result(&inputs.name, inputs.aircraft.class, &result, dense)
            })
            .collect()
    });
    Ok(reports)
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub planned: usize,
    pub failed: usize,
    pub with_spiral: usize,
    pub with_avoidance: usize,
    pub by_mode: BTreeMap<String, usize>,
    pub by_failure: BTreeMap<String, usize>,
    pub mean_flight_time_s: f64,
}

impl BatchSummary {
    pub fn from_reports(reports: &[RunReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };
        let mut flight_time = 0.0;
        for report in reports {
            if report.is_planned() {
                summary.planned += 1;
                flight_time += report.flight_time_s;
                if let Some(mode) = report.mode {
                    *summary.by_mode.entry(mode.as_str().to_string()).or_default() += 1;
                }
                if report.spiral.is_some() {
                    summary.with_spiral += 1;
                }
                if report.avoidance_waypoints > 0 {
                    summary.with_avoidance += 1;
                }
            } else {
                summary.failed += 1;
                let kind = report.error_kind.clone().unwrap_or_else(|| "unknown".to_string());
                *summary.by_failure.entry(kind).or_default() += 1;
            }
        }
        if summary.planned > 0 {
            summary.mean_flight_time_s = flight_time / summary.planned as f64;
        }
        summary
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.planned as f64 / self.total as f64
        }
    }
}
