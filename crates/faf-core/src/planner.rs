//! Top-level planning: pick a strategy, build, validate, derive parameters.
//!
//! Order of decisions:
//! 1. Over the FAF horizontally: vertical mode.
//! 2. Straight-line slope beyond the limit: spiral prefix, then continue from
//!    the spiral exit pose.
//! 3. Strategy chain (tangent turn, runway alignment, direct line). A strategy
//!    that declines or cannot clear the obstacles hands over to the next one.
//!
//! The assembled trajectory is scanned against every obstacle and checked
//! against the slope limit before parameters are extracted.

use crate::builders::{
    Attempt, BuiltPath, DirectLineBuilder, PlanContext, RunwayAlignmentBuilder, TangentTurnBuilder, TryPlan,
    VerticalBuilder,
};
use crate::avoidance::scan_trajectory;
use crate::error::PlanError;
use crate::models::{
    AircraftProfile, Environment, Obstacle, PlanMode, PlanOutcome, Pose, RejectedAttempt, SpiralSummary, Trajectory,
};
use crate::parameters::{extract, SpeedProfile};
use crate::rules::PlannerRules;
use crate::spiral::{needs_spiral, plan_spiral, SpiralLeg};
use tracing::{debug, info, warn};

/// Plan with default rules.
pub fn plan(
    pose: &Pose,
    aircraft: &AircraftProfile,
    environment: &Environment,
    obstacles: &[Obstacle],
) -> Result<PlanOutcome, PlanError> {
    plan_with_rules(pose, aircraft, environment, obstacles, &PlannerRules::default())
}

pub fn plan_with_rules(
    pose: &Pose,
    aircraft: &AircraftProfile,
    environment: &Environment,
    obstacles: &[Obstacle],
    rules: &PlannerRules,
) -> Result<PlanOutcome, PlanError> {
    validate_inputs(pose, aircraft, environment, obstacles, rules)?;

    let ctx = PlanContext {
        pose: *pose,
        aircraft,
        environment,
        obstacles,
        rules,
    };
    info!(
        class = %aircraft.class,
        x = pose.position.x,
        y = pose.position.y,
        z = pose.position.z,
        heading_deg = pose.heading_deg,
        distance_km = ctx.horizontal_distance(),
        obstacles = obstacles.len(),
        "planning approach to FAF"
    );

    let mut rejected = Vec::new();
    let (spiral_leg, main_ctx) = if ctx.horizontal_distance() >= rules.vertical_threshold_km && needs_spiral(&ctx) {
        let leg = plan_spiral(&ctx)?;
        let next = ctx.from_pose(leg.exit_pose);
        if next.horizontal_distance() >= rules.vertical_threshold_km && needs_spiral(&next) {
            return Err(PlanError::SlopeInfeasible {
                required_deg: residual_slope_deg(&next),
                limit_deg: next.slope_limit_deg(),
                reason: "spiral exit still too steep for the remaining distance".to_string(),
            });
        }
        (Some(leg), next)
    } else {
        (None, ctx)
    };

    let built = select_strategy(&main_ctx, &mut rejected)?;
    let (trajectory, speeds, spiral) = assemble(spiral_leg, &built, pose.speed_kmh);

    let report = scan_trajectory(&trajectory.points, obstacles);
    if report.collided {
        warn!(mode = %built.mode, obstacles = ?report.obstacle_indices, "assembled trajectory collides");
        rejected.push(RejectedAttempt {
            mode: built.mode,
            margin_km: built.margin_km,
            reason: "assembled trajectory collides".to_string(),
            colliding_obstacles: report.obstacle_indices.clone(),
        });
        return Err(PlanError::ObstacleUnavoidable {
            mode: built.mode,
            obstacles: report.obstacle_indices,
            attempts: rejected.len(),
            rejected,
        });
    }

    let parameters = extract(&trajectory.points, &speeds);

    if built.mode != PlanMode::Vertical {
        let tolerance = rules.slope_tolerance_deg;
        let climb = aircraft.slope_limit_deg(true);
        let descent = aircraft.slope_limit_deg(false);
        let worst = parameters
            .slope_deg
            .iter()
            .copied()
            .find(|slope| *slope > climb + tolerance || *slope < -(descent + tolerance));
        if let Some(slope) = worst {
            let limit_deg = if slope > 0.0 { climb } else { descent };
            return Err(PlanError::SlopeInfeasible {
                required_deg: slope.abs(),
                limit_deg,
                reason: format!("{} trajectory exceeds the slope limit", built.mode),
            });
        }
    }

    info!(
        mode = %built.mode,
        points = trajectory.len(),
        distance_km = parameters.total_distance_km,
        flight_time_s = parameters.flight_time_s,
        spiral = spiral.is_some(),
        "trajectory planned"
    );

    rejected.extend(built.rejected.iter().cloned());
    Ok(PlanOutcome {
        mode: built.mode,
        trajectory,
        parameters,
        turn: built.turn,
        spiral,
        avoidance_waypoints: built.waypoints.clone(),
        margin_km: built.margin_km,
        rejected,
    })
}

fn validate_inputs(
    pose: &Pose,
    aircraft: &AircraftProfile,
    environment: &Environment,
    obstacles: &[Obstacle],
    rules: &PlannerRules,
) -> Result<(), PlanError> {
    let mut errors = pose.validate();
    errors.extend(aircraft.validate());
    errors.extend(environment.validate());
    for (index, obstacle) in obstacles.iter().enumerate() {
        errors.extend(obstacle.validate().into_iter().map(|e| format!("obstacle {index}: {e}")));
    }
    errors.extend(rules.validate());
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlanError::invalid(errors))
    }
}

fn residual_slope_deg(ctx: &PlanContext<'_>) -> f64 {
    ((ctx.faf().z - ctx.pose.position.z).abs() / ctx.horizontal_distance())
        .atan()
        .to_degrees()
}

/// Run the strategies in order until one produces a trajectory.
fn select_strategy(ctx: &PlanContext<'_>, rejected: &mut Vec<RejectedAttempt>) -> Result<BuiltPath, PlanError> {
    let chain: Vec<Box<dyn TryPlan>> = if ctx.horizontal_distance() < ctx.rules.vertical_threshold_km {
        vec![Box::new(VerticalBuilder)]
    } else if ctx.approach_axis().is_none() {
        vec![Box::new(DirectLineBuilder)]
    } else {
        vec![
            Box::new(TangentTurnBuilder),
            Box::new(RunwayAlignmentBuilder),
            Box::new(DirectLineBuilder),
        ]
    };

    let mut last_failure: Option<(PlanMode, Vec<usize>)> = None;
    for strategy in &chain {
        let mode = strategy.mode();
        match strategy.try_plan(ctx) {
            Ok(Attempt::Built(built)) => {
                debug!(%mode, "strategy succeeded");
                return Ok(built);
            }
            Ok(Attempt::NotApplicable(reason)) => {
                debug!(%mode, %reason, "strategy not applicable");
                rejected.push(RejectedAttempt {
                    mode,
                    margin_km: None,
                    reason,
                    colliding_obstacles: Vec::new(),
                });
            }
            Err(PlanError::ObstacleUnavoidable {
                obstacles,
                rejected: attempts,
                ..
            }) => {
                warn!(%mode, ?obstacles, "strategy could not clear obstacles, falling back");
                rejected.extend(attempts);
                last_failure = Some((mode, obstacles));
            }
            Err(other) => return Err(other),
        }
    }

    match last_failure {
        Some((mode, obstacles)) => Err(PlanError::ObstacleUnavoidable {
            mode,
            obstacles,
            attempts: rejected.len(),
            rejected: rejected.clone(),
        }),
        None => {
            let mode = chain.last().map(|s| s.mode()).unwrap_or(PlanMode::DirectLine);
            let reason = rejected
                .last()
                .map(|r| r.reason.clone())
                .unwrap_or_else(|| "no strategy applies".to_string());
            Err(PlanError::GeometryInfeasible { mode, reason })
        }
    }
}

/// Join an optional spiral prefix with the strategy's trajectory.
fn assemble(spiral: Option<SpiralLeg>, built: &BuiltPath, cruise_kmh: f64) -> (Trajectory, SpeedProfile, Option<SpiralSummary>) {
    match spiral {
        None => (built.trajectory.clone(), built.speeds.clone(), None),
        Some(leg) => {
            let prefix_len = leg.trajectory.len();
            let shared = match (leg.trajectory.last(), built.trajectory.first()) {
                (Some(a), Some(b)) => a.distance(b) < 1e-9,
                _ => false,
            };
            let speeds = SpeedProfile::Constant(cruise_kmh).join(
                prefix_len,
                &built.speeds,
                built.trajectory.len(),
                shared,
            );
            let mut trajectory = leg.trajectory;
            trajectory.append(built.trajectory.clone());
            (trajectory, speeds, Some(leg.summary))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::models::AircraftClass;

    fn environment() -> Environment {
        Environment::new(Vec3::new(5.0, 25.0, 0.0), Vec3::new(20.0, 25.0, 1.0))
    }

    #[test]
    fn rejects_non_positive_speed() {
        let pose = Pose::new(Vec3::new(40.0, 25.0, 3.0), 270.0, 0.0);
        let err = plan(&pose, &AircraftClass::Light.profile(), &environment(), &[]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn rejects_bad_obstacle() {
        let pose = Pose::new(Vec3::new(40.0, 25.0, 3.0), 270.0, 180.0);
        let obstacles = [Obstacle::new(30.0, 25.0, -1.0, 2.0)];
        let err = plan(&pose, &AircraftClass::Light.profile(), &environment(), &obstacles).unwrap_err();
        match err {
            PlanError::InvalidInput(message) => assert!(message.contains("obstacle 0"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_inverted_rule_bounds_before_building() {
        let rules = PlannerRules {
            min_initial_leg_km: 8.0,
            max_initial_leg_km: 5.0,
            min_vertical_points: 0,
            ..PlannerRules::default()
        };
        let env = environment();
        let aircraft = AircraftClass::Light.profile();
        for pose in [
            Pose::new(Vec3::new(40.0, 10.0, 2.0), 270.0, 180.0),
            Pose::new(Vec3::new(20.0, 25.0, 3.0), 0.0, 180.0),
        ] {
            let err = plan_with_rules(&pose, &aircraft, &env, &[], &rules).unwrap_err();
            match err {
                PlanError::InvalidInput(message) => {
                    assert!(message.contains("min_initial_leg_km"), "{message}");
                    assert!(message.contains("min_vertical_points"), "{message}");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn degenerate_axis_uses_direct_line() {
        let env = Environment::new(Vec3::new(20.0, 25.0, 0.0), Vec3::new(20.0, 25.0, 1.0));
        let pose = Pose::new(Vec3::new(40.0, 25.0, 2.0), 90.0, 180.0);
        let outcome = plan(&pose, &AircraftClass::Light.profile(), &env, &[]).expect("plan");
        assert_eq!(outcome.mode, PlanMode::DirectLine);
        assert_eq!(outcome.trajectory.last(), Some(env.faf));
    }

    #[test]
    fn vertical_mode_skips_slope_guard() {
        let pose = Pose::new(Vec3::new(20.02, 25.0, 3.0), 0.0, 180.0);
        let outcome = plan(&pose, &AircraftClass::Light.profile(), &environment(), &[]).expect("plan");
        assert_eq!(outcome.mode, PlanMode::Vertical);
        assert!(outcome.parameters.max_abs_slope_deg() > 10.0);
    }

    #[test]
    fn parameters_align_with_trajectory() {
        let pose = Pose::new(Vec3::new(40.0, 10.0, 3.0), 270.0, 180.0);
        let outcome = plan(&pose, &AircraftClass::Light.profile(), &environment(), &[]).expect("plan");
        assert_eq!(outcome.parameters.len(), outcome.trajectory.len());
        assert_eq!(outcome.parameters.speed_kmh.len(), outcome.trajectory.len());
        assert!(outcome.parameters.flight_time_s > 0.0);
    }
}
