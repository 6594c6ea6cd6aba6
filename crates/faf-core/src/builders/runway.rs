//! Short initial leg on the current heading, then a Bézier onto the runway
//! heading that lands on the FAF already aligned. When that curve bends
//! tighter than the aircraft can turn, the leg is followed by a minimum-radius
//! turn toward the FAF and the Bézier starts from there.

use super::{lift, turn_radius_violation, Attempt, BuiltPath, PlanContext, TryPlan};
use crate::avoidance::{escalate, knots_through, synthesize_waypoints, Candidate};
use crate::error::PlanError;
use crate::geometry::{distance_to_segment, solve_turn_toward, HorizontalPath, Vec2};
use crate::models::{Obstacle, PlanMode, SegmentKind};
use crate::parameters::SpeedProfile;
use tracing::debug;

pub struct RunwayAlignmentBuilder;

impl RunwayAlignmentBuilder {
    /// Length of the initial straight leg. Dropped entirely when an obstacle
    /// sits near it, so the curve can start steering away immediately.
    fn initial_leg_km(ctx: &PlanContext<'_>, distance: f64, heading: Vec2, margin: f64) -> f64 {
        let rules = ctx.rules;
        let leg = (rules.initial_leg_ratio * distance)
            .clamp(rules.min_initial_leg_km, rules.max_initial_leg_km)
            .min(0.5 * distance);
        let start = ctx.start();
        let end = start + heading * leg;
        let blocked = ctx.obstacles.iter().any(|o: &Obstacle| {
            o.reaches(ctx.floor_altitude()) && distance_to_segment(o.center(), start, end) < o.radius + margin
        });
        if blocked {
            0.0
        } else {
            leg
        }
    }
}

impl TryPlan for RunwayAlignmentBuilder {
    fn mode(&self) -> PlanMode {
        PlanMode::RunwayAlignment
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
        let distance = start.distance(target);
        if distance < rules.endpoint_tolerance_km {
            return Ok(Attempt::NotApplicable("aircraft is above the FAF".to_string()));
        }

        let mut rejected = Vec::new();
        let mut reason = String::new();
        for turn_first in [false, true] {
            let escalated = escalate(PlanMode::RunwayAlignment, ctx.obstacles, rules.avoidance_margins(), |margin| {
                let leg = Self::initial_leg_km(ctx, distance, heading, margin);
                let mut path = HorizontalPath::new(start);
                if leg > 0.0 {
                    path.push_line(start + heading * leg, rules.straight_points_per_km, SegmentKind::Straight);
                }
                let mut curve_heading = heading;
                if turn_first {
                    if let Some(turn) = solve_turn_toward(path.end(), heading, ctx.turn_radius(), target) {
                        if turn.sweep != 0.0 {
                            path.push_arc(turn.center, turn.sweep, rules.arc_points_per_turn, SegmentKind::Arc);
                            path.snap_end(turn.exit);
                        }
                        curve_heading = (target - turn.exit).normalized().unwrap_or(axis);
                    }
                }
                let curve_start = path.end();
                let waypoints = synthesize_waypoints(curve_start, target, ctx.obstacles, ctx.floor_altitude(), margin);
                let knots = knots_through(curve_start, &waypoints, target);
                path.push_bezier_chain(
                    &knots,
                    curve_heading,
                    axis,
                    rules.bezier_handle_ratio,
                    ctx.turn_radius(),
                    rules.straight_points_per_km,
                    SegmentKind::Bezier,
                );
                let profile = ctx.altitude_profile(path.length());
                Ok(Candidate {
                    trajectory: lift(path, &profile, faf),
                    waypoints,
                })
            })?;

            let trajectory = escalated.candidate.trajectory;
            if let Some(violation) = turn_radius_violation(ctx, &trajectory) {
                debug!(turn_first, %violation, "alignment curve too tight");
                rejected.extend(escalated.rejected);
                reason = violation;
                continue;
            }
            rejected.extend(escalated.rejected);

            return Ok(Attempt::Built(BuiltPath {
                mode: PlanMode::RunwayAlignment,
                trajectory,
                speeds: SpeedProfile::Constant(ctx.pose.speed_kmh),
                waypoints: escalated.candidate.waypoints,
                margin_km: Some(escalated.margin_km),
                turn: None,
                rejected,
            }));
        }
        Ok(Attempt::NotApplicable(reason))
    }
}
