//! Minimum-radius turn until the nose points at the FAF, then straight there,
//! bent around obstacles when needed.

use super::{lift, turn_radius_violation, Attempt, BuiltPath, PlanContext, TryPlan};
use crate::avoidance::{escalate, knots_through, synthesize_waypoints, Candidate};
use crate::error::PlanError;
use crate::geometry::{solve_turn_toward, HorizontalPath};
use crate::models::{PlanMode, SegmentKind};
use crate::parameters::SpeedProfile;

pub struct DirectLineBuilder;

impl TryPlan for DirectLineBuilder {
    fn mode(&self) -> PlanMode {
        PlanMode::DirectLine
    }

    fn try_plan(&self, ctx: &PlanContext<'_>) -> Result<Attempt, PlanError> {
        let start = ctx.start();
        let faf = ctx.faf();
        let target = faf.xy();
        if (target - start).normalized().is_none() {
            return Ok(Attempt::NotApplicable("aircraft is above the FAF".to_string()));
        }
        let rules = ctx.rules;

        let Some(turn) = solve_turn_toward(start, ctx.pose.direction(), ctx.turn_radius(), target) else {
            return Ok(Attempt::NotApplicable("no turn points the aircraft at the FAF".to_string()));
        };
        let leg_start = turn.exit;
        let Some(direction) = (target - leg_start).normalized() else {
            return Ok(Attempt::NotApplicable("turn ends on the FAF".to_string()));
        };

        let escalated = escalate(PlanMode::DirectLine, ctx.obstacles, rules.avoidance_margins(), |margin| {
            let mut path = HorizontalPath::new(start);
            if turn.sweep != 0.0 {
                path.push_arc(turn.center, turn.sweep, rules.arc_points_per_turn, SegmentKind::Arc);
                path.snap_end(leg_start);
            }
            let waypoints = synthesize_waypoints(leg_start, target, ctx.obstacles, ctx.floor_altitude(), margin);
            if waypoints.is_empty() {
                path.push_line(target, rules.straight_points_per_km, SegmentKind::Straight);
            } else {
                let knots = knots_through(leg_start, &waypoints, target);
                let n = knots.len();
                let last = (knots[n - 1] - knots[n - 2]).normalized().unwrap_or(direction);
                path.push_bezier_chain(
                    &knots,
                    direction,
                    last,
                    rules.bezier_handle_ratio,
                    ctx.turn_radius(),
                    rules.straight_points_per_km,
                    SegmentKind::Bezier,
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

        Ok(Attempt::Built(BuiltPath {
            mode: PlanMode::DirectLine,
            trajectory,
            speeds: SpeedProfile::Constant(ctx.pose.speed_kmh),
            waypoints: escalated.candidate.waypoints,
            margin_km: Some(escalated.margin_km),
            turn: None,
            rejected: escalated.rejected,
        }))
    }
}
