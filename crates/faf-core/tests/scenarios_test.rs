//! End-to-end planning scenarios.
//!
//! Every scenario shares one approach: FAF at (20, 25, 1) km with the airport
//! 15 km to the west, so the final approach is flown on heading 270.

use faf_core::geometry::{heading_difference, tightest_turn_radius};
use faf_core::{
    plan, plan_with_rules, scan_trajectory, solve_tangent_turn, AircraftClass, AircraftProfile, Environment,
    Obstacle, PlanError, PlanMode, PlanOutcome, PlannerRules, Pose, SegmentKind, Vec3,
};

fn environment() -> Environment {
    Environment::new(Vec3::new(5.0, 25.0, 0.0), Vec3::new(20.0, 25.0, 1.0))
}

fn light() -> AircraftProfile {
    AircraftClass::Light.profile()
}

fn pose(x: f64, y: f64, z: f64, heading_deg: f64) -> Pose {
    Pose::new(Vec3::new(x, y, z), heading_deg, 180.0)
}

fn final_heading(outcome: &PlanOutcome) -> f64 {
    let points = &outcome.trajectory.points;
    let n = points.len();
    (points[n - 1].xy() - points[n - 2].xy()).heading_deg()
}

fn assert_slope_bound(outcome: &PlanOutcome, aircraft: &AircraftProfile) {
    let climb = aircraft.max_climb_slope_deg;
    let descent = aircraft.max_descent_slope_deg.abs();
    for (i, slope) in outcome.parameters.slope_deg.iter().enumerate() {
        assert!(
            *slope <= climb + 1e-6 && *slope >= -(descent + 1e-6),
            "slope {slope:.4}° at point {i} outside [-{descent}, {climb}]"
        );
    }
}

fn assert_ends(outcome: &PlanOutcome, start: &Pose, env: &Environment) {
    let first = outcome.trajectory.first().expect("non-empty trajectory");
    let last = outcome.trajectory.last().expect("non-empty trajectory");
    assert!(first.distance(start.position) < 1e-9, "starts at {first:?}");
    assert!(last.distance(env.faf) < 1e-9, "ends at {last:?}");
}

fn assert_turns_flyable(outcome: &PlanOutcome, start: &Pose, aircraft: &AircraftProfile) {
    let radius = aircraft.min_turn_radius_km(start.speed_kmh);
    let tightest = tightest_turn_radius(&outcome.trajectory.points);
    let floor = radius * (1.0 - PlannerRules::default().turn_radius_tolerance);
    assert!(tightest >= floor, "turns at {tightest:.4} km, minimum {radius:.4} km");
}

/// Offset aircraft flying parallel to the runway. A heading parallel to the
/// axis never closes on it, so no tangent turn exists and the alignment
/// curve itself is the turn onto the runway heading.
#[test]
fn test_offset_aircraft_uses_runway_alignment() {
    let env = environment();
    let start = pose(40.0, 10.0, 3.0, 270.0);
    let radius = light().min_turn_radius_km(start.speed_kmh);
    let axis = env.approach_axis().expect("axis");
    assert!(solve_tangent_turn(start.horizontal_position(), start.direction(), radius, env.faf.xy(), axis).is_none());

    let outcome = plan(&start, &light(), &env, &[]).expect("plan");

    assert_eq!(outcome.mode, PlanMode::RunwayAlignment);
    assert_ends(&outcome, &start, &env);
    assert!(heading_difference(final_heading(&outcome), 270.0) < 1.0);
    assert_slope_bound(&outcome, &light());
    assert!(outcome
        .rejected
        .iter()
        .any(|attempt| attempt.mode == PlanMode::TangentTurn));
    assert_eq!(outcome.trajectory.segments_of(SegmentKind::Arc).count(), 0);
    assert_turns_flyable(&outcome, &start, &light());
}

/// Already established on the axis: straight in, no turn.
#[test]
fn test_established_aircraft_flies_straight() {
    let env = environment();
    let start = pose(45.0, 25.0, 3.0, 270.0);
    let outcome = plan(&start, &light(), &env, &[]).expect("plan");

    assert_eq!(outcome.mode, PlanMode::TangentTurn);
    assert!(outcome.turn.is_none());
    assert_eq!(outcome.trajectory.segments_of(SegmentKind::Arc).count(), 0);
    assert!(outcome.trajectory.points.iter().all(|p| (p.y - 25.0).abs() < 1e-9));
    assert_ends(&outcome, &start, &env);
    assert_slope_bound(&outcome, &light());
    // Cruise first, then decelerating to approach speed
    let speeds = &outcome.parameters.speed_kmh;
    assert_eq!(speeds[0], 180.0);
    assert!((speeds[speeds.len() - 1] - light().approach_speed_kmh).abs() < 1e-9);
}

/// Obstacle astride the approach axis forces avoidance waypoints.
#[test]
fn test_obstacle_on_axis_is_avoided() {
    let env = environment();
    let start = pose(45.0, 25.0, 3.5, 270.0);
    let obstacles = [Obstacle::new(32.0, 25.0, 3.0, 4.0)];
    let outcome = plan(&start, &light(), &env, &obstacles).expect("plan");

    assert!(!outcome.avoidance_waypoints.is_empty());
    assert!(!scan_trajectory(&outcome.trajectory.points, &obstacles).collided);
    assert!(outcome
        .trajectory
        .points
        .iter()
        .all(|p| p.xy().distance(obstacles[0].center()) > obstacles[0].radius));
    assert_ends(&outcome, &start, &env);
    assert_slope_bound(&outcome, &light());
}

/// Too high and too close: a spiral burns altitude before the approach.
#[test]
fn test_steep_descent_spirals_first() {
    let env = environment();
    let start = pose(26.0, 25.0, 4.0, 270.0);
    let outcome = plan(&start, &light(), &env, &[]).expect("plan");

    let spiral = outcome.spiral.expect("spiral flown");
    assert!(spiral.exit_altitude_km < 4.0 && spiral.exit_altitude_km > 1.0);
    let spiral_segment = outcome
        .trajectory
        .segments_of(SegmentKind::Spiral)
        .next()
        .expect("spiral segment");
    assert_eq!(spiral_segment.end_index, spiral.exit_index);
    let after_spiral = outcome
        .trajectory
        .segments
        .iter()
        .filter(|segment| segment.kind != SegmentKind::Spiral)
        .map(|segment| segment.start_index)
        .max()
        .expect("approach follows");
    assert!(after_spiral >= spiral.exit_index);

    let exit = outcome.trajectory.points[spiral.exit_index];
    let residual = (exit.z - env.faf.z) / exit.horizontal_distance(env.faf);
    assert!(residual <= light().max_descent_slope_deg.abs().to_radians().tan());
    assert_ends(&outcome, &start, &env);
    assert_slope_bound(&outcome, &light());
}

/// Turn circle never reaches the axis: negative discriminant, fall back.
#[test]
fn test_unreachable_axis_falls_back_to_runway_alignment() {
    let env = environment();
    let start = pose(40.0, 40.0, 2.0, 0.0);
    let outcome = plan(&start, &light(), &env, &[]).expect("plan");

    assert_eq!(outcome.mode, PlanMode::RunwayAlignment);
    assert_ends(&outcome, &start, &env);
    assert!(heading_difference(final_heading(&outcome), 270.0) < 1.0);
    assert_turns_flyable(&outcome, &start, &light());
}

/// The approach after a spiral starts close to the FAF, where a bare
/// alignment curve would hook round far inside the turn circle.
#[test]
fn test_post_spiral_approach_respects_turn_radius() {
    let env = environment();
    let cases = [
        Pose::new(Vec3::new(26.0, 25.0, 4.0), 270.0, 180.0),
        Pose::new(Vec3::new(14.94, 25.24, 4.93), 318.7, 198.0),
    ];
    for start in cases {
        let outcome = plan(&start, &light(), &env, &[]).expect("plan");
        assert!(outcome.spiral.is_some(), "spiral expected from {:?}", start.position);
        assert_ends(&outcome, &start, &env);
        assert_turns_flyable(&outcome, &start, &light());
        assert_slope_bound(&outcome, &light());
    }
}

/// Where the tangent turn meets the axis the heading carries straight on.
#[test]
fn test_tangent_turn_joins_axis_without_heading_step() {
    let env = environment();
    let start = pose(40.0, 24.0, 3.0, 0.0);
    let outcome = plan(&start, &light(), &env, &[]).expect("plan");
    assert_eq!(outcome.mode, PlanMode::TangentTurn);
    let turn = outcome.turn.expect("turn flown");
    assert!((turn.intercept.y - 25.0).abs() < 1e-9);
    let headings = &outcome.parameters.heading_deg;
    let join = outcome
        .trajectory
        .points
        .iter()
        .position(|p| p.xy().distance(turn.intercept) < 1e-9)
        .expect("intercept on the path");
    for i in join.saturating_sub(3)..(join + 3).min(headings.len() - 1) {
        let step = heading_difference(headings[i], headings[i + 1]);
        assert!(step < 1.0, "heading jumps {step:.2} deg at point {i}");
    }
    assert_turns_flyable(&outcome, &start, &light());
}

#[test]
fn test_planning_is_deterministic() {
    let env = environment();
    let start = pose(40.0, 10.0, 3.0, 270.0);
    let obstacles = [Obstacle::new(30.0, 15.0, 1.5, 5.0)];
    let first = plan(&start, &light(), &env, &obstacles);
    let second = plan(&start, &light(), &env, &obstacles);
    assert_eq!(first, second);
}

#[test]
fn test_parameters_are_index_aligned_and_finite() {
    let env = environment();
    let start = pose(40.0, 10.0, 3.0, 270.0);
    let outcome = plan(&start, &light(), &env, &[]).expect("plan");
    let params = &outcome.parameters;
    let n = outcome.trajectory.len();
    for series in [
        &params.time_s,
        &params.altitude_km,
        &params.slope_deg,
        &params.heading_deg,
        &params.turn_rate_deg_s,
        &params.speed_kmh,
    ] {
        assert_eq!(series.len(), n);
        assert!(series.iter().all(|v| v.is_finite()));
    }
    assert!(params.time_s.windows(2).all(|w| w[1] >= w[0]));
    assert!(params.heading_deg.iter().all(|h| (0.0..360.0).contains(h)));
    assert!((params.flight_time_s - params.time_s[n - 1]).abs() < 1e-12);
}

#[test]
fn test_climb_to_faf_respects_climb_limit() {
    let env = environment();
    let start = pose(45.0, 25.0, 0.5, 270.0);
    let aircraft = AircraftClass::Cargo.profile();
    let start = Pose { speed_kmh: 220.0, ..start };
    let outcome = plan(&start, &aircraft, &env, &[]).expect("plan");
    assert_ends(&outcome, &start, &env);
    assert!(outcome.parameters.slope_deg.iter().all(|s| *s >= -1e-9));
    assert_slope_bound(&outcome, &aircraft);
}

#[test]
fn test_aircraft_on_faf_gets_trivial_trajectory() {
    let env = environment();
    let start = Pose::new(env.faf, 90.0, 180.0);
    let outcome = plan(&start, &light(), &env, &[]).expect("plan");
    assert_eq!(outcome.mode, PlanMode::Vertical);
    assert_eq!(outcome.trajectory.len(), 10);
    assert_eq!(outcome.parameters.flight_time_s, 0.0);
}

#[test]
fn test_unavoidable_obstacle_is_reported() {
    let env = environment();
    let start = pose(45.0, 25.0, 3.0, 270.0);
    // Enclose the FAF itself: every path must end inside it
    let obstacles = [Obstacle::new(20.0, 25.0, 2.0, 5.0)];
    let err = plan(&start, &light(), &env, &obstacles).unwrap_err();
    match err {
        PlanError::ObstacleUnavoidable { obstacles, rejected, .. } => {
            assert_eq!(obstacles, vec![0]);
            assert!(!rejected.is_empty());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_custom_rules_change_sampling() {
    let env = environment();
    let start = pose(45.0, 25.0, 3.0, 270.0);
    let coarse = PlannerRules {
        straight_points_per_km: 10.0,
        ..PlannerRules::default()
    };
    let dense = plan(&start, &light(), &env, &[]).expect("plan");
    let sparse = plan_with_rules(&start, &light(), &env, &[], &coarse).expect("plan");
    assert!(sparse.trajectory.len() * 5 < dense.trajectory.len());
    assert_eq!(sparse.trajectory.last(), dense.trajectory.last());
}
