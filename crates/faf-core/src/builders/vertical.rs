//! Climb or descend in place when the aircraft is already over the FAF.
//!
//! Vertical mode is the one strategy exempt from the slope limit: with no
//! horizontal distance to spread the altitude change over, the only option
//! is a smooth vertical transition.

use super::{Attempt, BuiltPath, PlanContext, TryPlan};
use crate::error::PlanError;
use crate::geometry::smoothstep3;
use crate::models::{PlanMode, SegmentKind, Trajectory, TrajectorySegment};
use crate::parameters::SpeedProfile;

pub struct VerticalBuilder;

impl TryPlan for VerticalBuilder {
    fn mode(&self) -> PlanMode {
        PlanMode::Vertical
    }

    fn try_plan(&self, ctx: &PlanContext<'_>) -> Result<Attempt, PlanError> {
        let distance = ctx.horizontal_distance();
        if distance >= ctx.rules.vertical_threshold_km {
            return Ok(Attempt::NotApplicable(format!(
                "{distance:.3} km from the FAF horizontally"
            )));
        }

        let start = ctx.pose.position;
        let target = ctx.faf();
        let delta = (target.z - start.z).abs();

        let points = if start.distance(target) < ctx.rules.endpoint_tolerance_km {
            vec![target; ctx.rules.min_trajectory_points]
        } else {
            let count = ((delta * ctx.rules.vertical_points_per_km).ceil() as usize)
                .max(ctx.rules.min_vertical_points);
            let mut points: Vec<_> = (0..count)
                .map(|i| start.lerp(target, smoothstep3(i as f64 / (count - 1) as f64)))
                .collect();
            points[0] = start;
            points[count - 1] = target;
            points
        };

        let segment = TrajectorySegment {
            kind: SegmentKind::Vertical,
            start_index: 0,
            end_index: points.len() - 1,
        };
        Ok(Attempt::Built(BuiltPath {
            mode: PlanMode::Vertical,
            trajectory: Trajectory::new(points, vec![segment]),
            speeds: SpeedProfile::Constant(ctx.rules.vertical_speed_kmh),
            waypoints: Vec::new(),
            margin_km: None,
            turn: None,
            rejected: Vec::new(),
        }))
    }
}
