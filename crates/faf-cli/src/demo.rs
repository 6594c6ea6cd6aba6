//! Built-in demonstration scenarios.
//!
//! All of them share the reference approach: FAF at (20, 25, 1) km, airport
//! 15 km further west, final approach on heading 270.

use crate::scenario::ScenarioFile;
use faf_core::{AircraftClass, Environment, Obstacle, Pose, Vec3};

pub fn reference_environment() -> Environment {
    Environment::new(Vec3::new(5.0, 25.0, 0.0), Vec3::new(20.0, 25.0, 1.0))
}

fn scenario(name: &str, class: AircraftClass, at: (f64, f64, f64), heading: f64, speed: f64) -> ScenarioFile {
    ScenarioFile::new(
        name,
        class,
        Pose::new(Vec3::new(at.0, at.1, at.2), heading, speed),
        reference_environment(),
        Vec::new(),
    )
}

fn with_obstacles(mut scenario: ScenarioFile, obstacles: Vec<Obstacle>) -> ScenarioFile {
    scenario.cylinders = obstacles;
    scenario
}

/// The demonstration set, in display order.
pub fn builtin_scenarios() -> Vec<ScenarioFile> {
    use AircraftClass::{Cargo, Commercial, Light};
    vec![
        // Classic approaches
        scenario("north-east-southbound", Light, (40.0, 10.0, 3.0), 180.0, 180.0),
        scenario("north-high", Light, (25.0, 40.0, 5.0), 0.0, 180.0),
        scenario("south-low-eastbound", Light, (30.0, 15.0, 0.5), 90.0, 180.0),
        scenario("far-northeast-commercial", Commercial, (40.0, 35.0, 4.0), 45.0, 250.0),
        scenario("close-above-faf", Light, (25.0, 25.0, 3.0), 270.0, 180.0),
        // Same start, three performance envelopes
        scenario("southwest-commercial", Commercial, (10.0, 10.0, 3.0), 0.0, 250.0),
        scenario("southwest-cargo", Cargo, (10.0, 10.0, 3.0), 0.0, 220.0),
        scenario("southwest-light", Light, (10.0, 10.0, 3.0), 0.0, 180.0),
        scenario("origin-cargo-high", Cargo, (0.0, 0.0, 5.0), 0.0, 220.0),
        scenario("northeast-commercial", Commercial, (35.0, 35.0, 3.0), 0.0, 250.0),
        // Reference checks. A flies parallel to the runway 15 km off the axis;
        // a heading parallel to the axis never closes on it, so the alignment
        // curve is the turn.
        scenario("a-parallel-offset", Light, (40.0, 10.0, 3.0), 270.0, 180.0),
        scenario("b-established", Light, (45.0, 25.0, 3.0), 270.0, 180.0),
        with_obstacles(
            scenario("c-obstacle-on-axis", Light, (45.0, 25.0, 3.5), 270.0, 180.0),
            vec![Obstacle::new(32.0, 25.0, 3.0, 4.0)],
        ),
        scenario("d-too-high", Light, (26.0, 25.0, 4.0), 270.0, 180.0),
        scenario("e-axis-out-of-reach", Light, (40.0, 40.0, 2.0), 0.0, 180.0),
    ]
}

pub fn find(name: &str) -> Option<ScenarioFile> {
    builtin_scenarios()
        .into_iter()
        .find(|scenario| scenario.name.as_deref() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use faf_core::{PlanMode, PlannerRules};
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let scenarios = builtin_scenarios();
        let names: HashSet<_> = scenarios.iter().filter_map(|s| s.name.clone()).collect();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn builtin_scenarios_are_clean() {
        for scenario in builtin_scenarios() {
            assert!(scenario.warnings().is_empty(), "{:?}: {:?}", scenario.name, scenario.warnings());
        }
    }

    #[test]
    fn reference_checks_plan_as_expected() {
        let rules = PlannerRules::default();
        let plan = |name: &str| find(name).map(|s| s.to_inputs().plan(&rules));

        let a = plan("a-parallel-offset").and_then(Result::ok).expect("scenario A");
        let last = a.trajectory.last().expect("non-empty");
        assert!(last.distance(reference_environment().faf) < 1e-9);
        assert_eq!(a.mode, PlanMode::RunwayAlignment);
        assert!(a.turn.is_none());

        let c = plan("c-obstacle-on-axis").and_then(Result::ok).expect("scenario C");
        assert!(!c.avoidance_waypoints.is_empty());

        let d = plan("d-too-high").and_then(Result::ok).expect("scenario D");
        assert!(d.spiral.is_some());

        let e = plan("e-axis-out-of-reach").and_then(Result::ok).expect("scenario E");
        assert_eq!(e.mode, PlanMode::RunwayAlignment);
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(find("nowhere").is_none());
    }
}
