//! Minimum-radius turn onto the approach axis, then straight in to the FAF.

use super::{lift, turn_radius_violation, Attempt, BuiltPath, PlanContext, TryPlan};
use crate::avoidance::{adjust_turn_radius, escalate, knots_through, synthesize_waypoints, Candidate};
use crate::error::PlanError;
use crate::geometry::{heading_difference, solve_tangent_turn, HorizontalPath, TangentTurn, Vec2, LENGTH_EPSILON_KM};
use crate::models::{PlanMode, SegmentKind, TurnSummary};
use crate::parameters::approach_speed_profile;

pub struct TangentTurnBuilder;

impl TangentTurnBuilder {
    /// Already flying the axis toward the FAF: no turn needed.
    fn is_established(ctx: &PlanContext<'_>, axis: Vec2) -> bool {
        let start = ctx.start();
        let faf = ctx.faf().xy();
        let offset = start - faf;
        heading_difference(ctx.pose.heading_deg, axis.heading_deg()) <= ctx.rules.alignment_tolerance_deg
            && axis.cross(offset).abs() <= ctx.rules.alignment_offset_km
            && axis.dot(offset) < 0.0
    }
}

impl TryPlan for TangentTurnBuilder {
    fn mode(&self) -> PlanMode {
        PlanMode::TangentTurn
    }

    fn try_plan(&self, ctx: &PlanContext<'_>) -> Result<Attempt, PlanError> {
        let Some(axis) = ctx.approach_axis() else {
            return Ok(Attempt::NotApplicable("no approach axis".to_string()));
        };
        let rules = ctx.rules;
        let start = ctx.start();
        let faf = ctx.faf();
        let target = faf.xy();
        let heading = ctx.pose.direction();

        let turn: Option<TangentTurn> = if Self::is_established(ctx, axis) {
            None
        } else {
            let first_margin = rules.avoidance_margins().first().copied().unwrap_or_default();
            let solved = adjust_turn_radius(
                ctx.turn_radius(),
                &rules.turn_radius_factors,
                ctx.obstacles,
                ctx.floor_altitude(),
                first_margin,
                |radius| solve_tangent_turn(start, heading, radius, target, axis),
            );
            match solved {
                Some(turn) => Some(turn),
                None => {
                    return Ok(Attempt::NotApplicable(
                        "no turn ends tangent to the approach axis before the FAF".to_string(),
                    ))
                }
            }
        };
        if let Some(turn) = turn {
            let misalignment = heading_difference(turn.exit_direction().heading_deg(), axis.heading_deg());
            if misalignment > rules.alignment_tolerance_deg {
                return Ok(Attempt::NotApplicable(format!(
                    "turn leaves the circle {misalignment:.1} deg off the approach course"
                )));
            }
        }
        let approach_from = turn.map(|t| t.intercept).unwrap_or(start);

        let escalated = escalate(PlanMode::TangentTurn, ctx.obstacles, rules.avoidance_margins(), |margin| {
            let mut path = HorizontalPath::new(start);
            if let Some(turn) = turn {
                if turn.lead_km() > LENGTH_EPSILON_KM {
                    path.push_line(turn.turn_start, rules.straight_points_per_km, SegmentKind::Straight);
                }
                path.push_arc(turn.center, turn.arc_angle, rules.arc_points_per_turn, SegmentKind::Arc);
                path.snap_end(turn.intercept);
            }
            let waypoints = synthesize_waypoints(approach_from, target, ctx.obstacles, ctx.floor_altitude(), margin);
            if waypoints.is_empty() {
                path.push_line(target, rules.straight_points_per_km, SegmentKind::Approach);
            } else {
                let knots = knots_through(approach_from, &waypoints, target);
                path.push_bezier_chain(
                    &knots,
                    axis,
                    axis,
                    rules.bezier_handle_ratio,
                    ctx.turn_radius(),
                    rules.straight_points_per_km,
                    SegmentKind::Approach,
                );
            }
            let profile = ctx.altitude_profile(path.length());
            Ok(Candidate {
                trajectory: lift(path, &profile, faf),
                waypoints,
            })
        })?;

        let trajectory = escalated.candidate.trajectory;
        if let Some(reason) = turn_radius_violation(ctx, &trajectory) {
            return Ok(Attempt::NotApplicable(reason));
        }
        let approach_start = trajectory
            .segments_of(SegmentKind::Approach)
            .next()
            .map(|segment| segment.start_index)
            .unwrap_or(0);
        let speeds = approach_speed_profile(
            &trajectory.points,
            approach_start,
            ctx.pose.speed_kmh,
            ctx.aircraft.approach_speed_kmh,
            rules.deceleration_start_ratio,
        );

        Ok(Attempt::Built(BuiltPath {
            mode: PlanMode::TangentTurn,
            trajectory,
            speeds,
            waypoints: escalated.candidate.waypoints,
            margin_km: Some(escalated.margin_km),
            turn: turn.map(|t| TurnSummary {
                center: t.center,
                radius_km: t.radius,
                lead_km: t.lead_km(),
                arc_angle_deg: t.arc_angle.to_degrees(),
                intercept: t.intercept,
            }),
            rejected: escalated.rejected,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::{built, Scene};
    use crate::geometry::{tightest_turn_radius, Vec3};
    use crate::models::Pose;

    #[test]
    fn established_aircraft_flies_straight_in() {
        let scene = Scene::standard();
        let ctx = scene.context(Pose::new(Vec3::new(45.0, 25.0, 3.0), 270.0, 180.0));
        let path = built(TangentTurnBuilder.try_plan(&ctx).expect("plan"));
        assert!(path.turn.is_none());
        assert_eq!(path.trajectory.segments_of(SegmentKind::Arc).count(), 0);
        assert!(path.trajectory.points.iter().all(|p| (p.y - 25.0).abs() < 1e-9));
    }

    #[test]
    fn turns_onto_axis_and_decelerates() {
        let scene = Scene::standard();
        let ctx = scene.context(Pose::new(Vec3::new(40.0, 24.0, 3.0), 0.0, 180.0));
        let path = built(TangentTurnBuilder.try_plan(&ctx).expect("plan"));
        let turn = path.turn.expect("turn flown");
        assert!(turn.arc_angle_deg > 0.0, "left turn expected");
        assert!((turn.arc_angle_deg - 90.0).abs() < 1e-6);
        assert!((turn.intercept.y - 25.0).abs() < 1e-9);
        assert!(turn.lead_km > 0.0);
        assert_eq!(path.trajectory.segments_of(SegmentKind::Straight).count(), 1);
        let speeds = path.speeds.to_vec(path.trajectory.len());
        assert_eq!(speeds[0], 180.0);
        assert!((speeds[speeds.len() - 1] - scene.aircraft.approach_speed_kmh).abs() < 1e-9);
        assert_eq!(path.trajectory.last(), Some(scene.environment.faf));
    }

    #[test]
    fn heading_is_continuous_where_the_arc_meets_the_axis() {
        let scene = Scene::standard();
        for (x, y, heading) in [(40.0, 24.0, 0.0), (40.0, 24.7, 0.0), (35.0, 30.0, 200.0), (30.0, 18.0, 45.0)] {
            let ctx = scene.context(Pose::new(Vec3::new(x, y, 3.0), heading, 180.0));
            let path = built(TangentTurnBuilder.try_plan(&ctx).expect("plan"));
            let turn = path.turn.expect("turn flown");
            let points = &path.trajectory.points;
            let join = points
                .iter()
                .position(|p| p.xy().distance(turn.intercept) < 1e-9)
                .expect("intercept on the path");
            let before = (points[join].xy() - points[join - 1].xy()).heading_deg();
            let after = (points[join + 1].xy() - points[join].xy()).heading_deg();
            let step = heading_difference(before, after);
            assert!(step < 2.0, "heading steps {step:.2} deg at the join from ({x}, {y})");
            assert!(heading_difference(after, 270.0) < 1e-6);
        }
    }

    #[test]
    fn flown_radius_never_below_minimum() {
        let scene = Scene::standard();
        let ctx = scene.context(Pose::new(Vec3::new(40.0, 24.7, 3.0), 0.0, 180.0));
        let path = built(TangentTurnBuilder.try_plan(&ctx).expect("plan"));
        let tightest = tightest_turn_radius(&path.trajectory.points);
        assert!(tightest >= ctx.turn_radius() * (1.0 - ctx.rules.turn_radius_tolerance));
    }

    #[test]
    fn declines_when_circle_misses_axis() {
        let scene = Scene::standard();
        let ctx = scene.context(Pose::new(Vec3::new(40.0, 40.0, 2.0), 0.0, 180.0));
        assert!(matches!(TangentTurnBuilder.try_plan(&ctx), Ok(Attempt::NotApplicable(_))));
    }
}
