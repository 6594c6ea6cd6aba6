//! Obstacle collision checks and avoidance waypoint synthesis.
//!
//! Obstacles are vertical cylinders rising from the ground. A path segment is
//! routed around every cylinder tall enough to matter by inserting an entry
//! and an exit waypoint on the far side from the cylinder centre. When the
//! curve through those waypoints still cuts a cylinder, the margin grows and
//! the path is rebuilt.

use crate::error::PlanError;
use crate::geometry::{arc_points, distance_to_segment, project_onto_segment, TangentTurn, Vec2, Vec3};
use crate::models::{Obstacle, PlanMode, RejectedAttempt, Trajectory, Waypoint, WaypointTag};
use crate::rules::MAX_AVOIDANCE_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Waypoints closer than this to a segment end are dropped (km).
const ENDPOINT_TOLERANCE_KM: f64 = 1e-3;

/// Result of scanning a trajectory against the obstacle set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionReport {
    pub collided: bool,
    /// Sorted, deduplicated indices of the obstacles hit
    pub obstacle_indices: Vec<usize>,
    /// First trajectory point inside any obstacle
    pub first_point_index: Option<usize>,
}

/// Scan every point of a trajectory against every obstacle.
pub fn scan_trajectory(points: &[Vec3], obstacles: &[Obstacle]) -> CollisionReport {
    let mut hit = BTreeSet::new();
    let mut first_point_index = None;
    for (i, point) in points.iter().enumerate() {
        for (j, obstacle) in obstacles.iter().enumerate() {
            if obstacle.contains(*point) {
                first_point_index.get_or_insert(i);
                hit.insert(j);
            }
        }
    }
    CollisionReport {
        collided: !hit.is_empty(),
        obstacle_indices: hit.into_iter().collect(),
        first_point_index,
    }
}

/// Entry/exit waypoints steering the segment `from`-`to` around obstacles.
///
/// An obstacle is considered when it reaches `floor_altitude_km` (the lowest
/// altitude flown on the segment) and its centre lies closer to the segment
/// than `radius + margin`. Waypoints are returned in along-track order.
pub fn synthesize_waypoints(
    from: Vec2,
    to: Vec2,
    obstacles: &[Obstacle],
    floor_altitude_km: f64,
    margin_km: f64,
) -> Vec<Waypoint> {
    let Some(dir) = (to - from).normalized() else {
        return Vec::new();
    };
    let length = from.distance(to);
    let normal = dir.left_normal();

    let mut placed: Vec<(f64, Waypoint)> = Vec::new();
    for (index, obstacle) in obstacles.iter().enumerate() {
        if !obstacle.reaches(floor_altitude_km) {
            continue;
        }
        let center = obstacle.center();
        let clearance = obstacle.radius + margin_km;
        let projection = project_onto_segment(center, from, to);
        if projection.distance >= clearance {
            continue;
        }

        // Bulge to the side opposite the obstacle centre
        let side = if dir.cross(center - from) > 0.0 { -1.0 } else { 1.0 };
        let offset = normal * (side * clearance);
        let foot = projection.along;

        for (tag, along) in [
            (WaypointTag::Entry, (foot - clearance).clamp(0.0, length)),
            (WaypointTag::Exit, (foot + clearance).clamp(0.0, length)),
        ] {
            let position = push_clear(from + dir * along + offset, center, clearance);
            placed.push((
                along,
                Waypoint {
                    position,
                    tag: Some(tag),
                    obstacle: Some(index),
                },
            ));
        }
    }

    placed.sort_by(|a, b| a.0.total_cmp(&b.0));
    placed
        .into_iter()
        .map(|(_, waypoint)| waypoint)
        .filter(|waypoint| {
            waypoint.position.distance(from) > ENDPOINT_TOLERANCE_KM
                && waypoint.position.distance(to) > ENDPOINT_TOLERANCE_KM
        })
        .collect()
}

/// Knot sequence `from`, waypoints..., `to`.
pub fn knots_through(from: Vec2, waypoints: &[Waypoint], to: Vec2) -> Vec<Vec2> {
    std::iter::once(from)
        .chain(waypoints.iter().map(|w| w.position))
        .chain(std::iter::once(to))
        .collect()
}

fn push_clear(point: Vec2, center: Vec2, clearance: f64) -> Vec2 {
    let away = point - center;
    if away.length() >= clearance {
        return point;
    }
    match away.normalized() {
        Some(direction) => center + direction * clearance,
        None => point,
    }
}

/// Smallest horizontal clearance between a turn (lead and arc) and the
/// cylinders that reach `floor_altitude_km`, measured wall to path.
/// `INFINITY` when none do.
pub fn arc_clearance(turn: &TangentTurn, obstacles: &[Obstacle], floor_altitude_km: f64) -> f64 {
    let relevant: Vec<&Obstacle> = obstacles.iter().filter(|o| o.reaches(floor_altitude_km)).collect();
    if relevant.is_empty() {
        return f64::INFINITY;
    }
    let lead = relevant
        .iter()
        .map(|o| distance_to_segment(o.center(), turn.start, turn.turn_start) - o.radius)
        .fold(f64::INFINITY, f64::min);
    let start_angle = (turn.turn_start - turn.center).angle();
    let samples = arc_points(turn.center, turn.radius, start_angle, turn.arc_angle, 180.0);
    samples
        .iter()
        .flat_map(|p| relevant.iter().map(move |o| o.clearance(*p)))
        .fold(lead, f64::min)
}

/// Try enlarged turn radii until the arc clears the obstacles by `margin_km`.
///
/// `solve` returns the turn for a given radius, or `None` when no tangency
/// exists. The first solvable turn is kept as a fallback so the caller can
/// still route (and later reject) it through margin escalation.
pub fn adjust_turn_radius<F>(
    base_radius: f64,
    factors: &[f64],
    obstacles: &[Obstacle],
    floor_altitude_km: f64,
    margin_km: f64,
    mut solve: F,
) -> Option<TangentTurn>
where
    F: FnMut(f64) -> Option<TangentTurn>,
{
    let mut first = None;
    let factors: &[f64] = if factors.is_empty() { &[1.0] } else { factors };
    for factor in factors {
        let Some(turn) = solve(base_radius * factor) else {
            continue;
        };
        if arc_clearance(&turn, obstacles, floor_altitude_km) >= margin_km {
            return Some(turn);
        }
        debug!(radius_km = turn.radius, "turn arc conflicts with obstacle, widening");
        first.get_or_insert(turn);
    }
    first
}

/// A trajectory built at a given avoidance margin.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub trajectory: Trajectory,
    pub waypoints: Vec<Waypoint>,
}

/// An accepted, collision-free candidate.
#[derive(Debug, Clone)]
pub struct Escalated {
    pub candidate: Candidate,
    pub margin_km: f64,
    pub rejected: Vec<RejectedAttempt>,
}

/// Build with each margin in turn until the result clears every obstacle.
///
/// At most [`MAX_AVOIDANCE_ATTEMPTS`] builds are made. Each collision is
/// recorded as a rejected attempt; when all fail the error carries them.
pub fn escalate<F>(mode: PlanMode, obstacles: &[Obstacle], margins: &[f64], mut build: F) -> Result<Escalated, PlanError>
where
    F: FnMut(f64) -> Result<Candidate, PlanError>,
{
    let margins: &[f64] = if margins.is_empty() { &[0.0] } else { margins };
    let mut rejected = Vec::new();
    let mut last_hits = Vec::new();

    for &margin in margins.iter().take(MAX_AVOIDANCE_ATTEMPTS) {
        let candidate = build(margin)?;
        let report = scan_trajectory(&candidate.trajectory.points, obstacles);
        if !report.collided {
            return Ok(Escalated {
                candidate,
                margin_km: margin,
                rejected,
            });
        }
        debug!(
            %mode,
            margin_km = margin,
            obstacles = ?report.obstacle_indices,
            "avoidance attempt collided"
        );
        rejected.push(RejectedAttempt {
            mode,
            margin_km: Some(margin),
            reason: format!(
                "collision from point {}",
                report.first_point_index.unwrap_or_default()
            ),
            colliding_obstacles: report.obstacle_indices.clone(),
        });
        last_hits = report.obstacle_indices;
    }

    Err(PlanError::ObstacleUnavoidable {
        mode,
        obstacles: last_hits,
        attempts: rejected.len(),
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::solve_tangent_turn;

    #[test]
    fn scan_reports_sorted_unique_hits() {
        let obstacles = vec![
            Obstacle::new(5.0, 0.0, 1.0, 3.0),
            Obstacle::new(2.0, 0.0, 0.5, 3.0),
            Obstacle::new(8.0, 0.0, 1.0, 0.5),
        ];
        let points: Vec<Vec3> = (0..=10).map(|i| Vec3::new(i as f64, 0.0, 1.0)).collect();
        let report = scan_trajectory(&points, &obstacles);
        assert!(report.collided);
        assert_eq!(report.obstacle_indices, vec![0, 1]);
        assert_eq!(report.first_point_index, Some(2));
    }

    #[test]
    fn waypoints_bulge_away_from_centre() {
        // Centre slightly left of the track: waypoints go right (negative y)
        let obstacles = vec![Obstacle::new(10.0, 0.5, 2.0, 5.0)];
        let waypoints = synthesize_waypoints(Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0), &obstacles, 1.0, 0.5);
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].tag, Some(WaypointTag::Entry));
        assert_eq!(waypoints[1].tag, Some(WaypointTag::Exit));
        for waypoint in &waypoints {
            assert!(waypoint.position.y < 0.0);
            assert!(obstacles[0].clearance(waypoint.position) >= 0.5 - 1e-9);
        }
        assert!(waypoints[0].position.x < waypoints[1].position.x);
    }

    #[test]
    fn low_or_distant_obstacles_are_ignored() {
        let obstacles = vec![
            Obstacle::new(10.0, 0.0, 2.0, 0.8),
            Obstacle::new(10.0, 10.0, 2.0, 5.0),
        ];
        let waypoints = synthesize_waypoints(Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0), &obstacles, 1.0, 0.5);
        assert!(waypoints.is_empty());
    }

    #[test]
    fn escalation_stops_at_first_clear_margin() {
        let obstacles = vec![Obstacle::new(0.0, 0.0, 1.0, 1.0)];
        let mut seen = Vec::new();
        let result = escalate(PlanMode::DirectLine, &obstacles, &[0.5, 1.0, 1.5], |margin| {
            seen.push(margin);
            let z = if margin < 1.0 { 0.5 } else { 2.0 };
            Ok(Candidate {
                trajectory: Trajectory::new(vec![Vec3::new(0.0, 0.0, z)], Vec::new()),
                waypoints: Vec::new(),
            })
        })
        .expect("second margin clears");
        assert_eq!(seen, vec![0.5, 1.0]);
        assert_eq!(result.margin_km, 1.0);
        assert_eq!(result.rejected.len(), 1);
    }

    #[test]
    fn escalation_gives_up_after_five_attempts() {
        let obstacles = vec![Obstacle::new(0.0, 0.0, 1.0, 1.0)];
        let margins = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let mut calls = 0;
        let err = escalate(PlanMode::TangentTurn, &obstacles, &margins, |_| {
            calls += 1;
            Ok(Candidate {
                trajectory: Trajectory::new(vec![Vec3::new(0.0, 0.0, 0.5)], Vec::new()),
                waypoints: Vec::new(),
            })
        })
        .unwrap_err();
        assert_eq!(calls, MAX_AVOIDANCE_ATTEMPTS);
        match err {
            PlanError::ObstacleUnavoidable { obstacles, attempts, rejected, .. } => {
                assert_eq!(obstacles, vec![0]);
                assert_eq!(attempts, 5);
                assert_eq!(rejected.len(), 5);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn radius_grows_until_arc_clears() {
        let start = Vec2::new(30.0, 23.0);
        let heading = Vec2::from_heading(0.0);
        let faf = Vec2::new(20.0, 25.0);
        let axis = Vec2::new(-1.0, 0.0);
        // Sits on the radius-1 arc midway round the quarter turn
        let obstacles = vec![Obstacle::new(29.707, 24.707, 0.2, 5.0)];
        let turn = adjust_turn_radius(1.0, &[1.0, 1.5, 2.0], &obstacles, 1.0, 0.1, |r| {
            solve_tangent_turn(start, heading, r, faf, axis)
        })
        .expect("some radius solves");
        assert_eq!(turn.radius, 2.0);
        assert!(turn.lead_km() < 1e-9);
        assert!(arc_clearance(&turn, &obstacles, 1.0) >= 0.1);
    }
}
