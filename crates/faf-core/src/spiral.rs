//! Spiral altitude loss (or gain) when the straight-line slope is too steep.
//!
//! The aircraft optionally turns and flies a short lead, then circles at its
//! minimum turn radius until it reaches an altitude from which the FAF is
//! reachable within the slope limit. The circle is placed by a three-stage
//! search: scored preferred positions ahead of the aircraft, a radial grid
//! maximizing obstacle clearance, and finally an emergency sweep that accepts
//! any physically clear position.

use crate::builders::PlanContext;
use crate::error::PlanError;
use crate::geometry::{smoothstep5_integral, tangent_exit_angle, HorizontalPath, TurnSide, Vec2, Vec3};
use crate::models::{Pose, SegmentKind, SpiralSearch, SpiralSummary, Trajectory, TrajectorySegment};
use std::f64::consts::TAU;
use tracing::{debug, info};

/// Extra sweep so the chord-sampled spiral never needs more than the limit.
const SWEEP_ALLOWANCE: f64 = 1.001;

/// Exit-to-target distance (in radii) below which no tangent alignment is attempted.
const ALIGNMENT_MIN_RADII: f64 = 1.05;

/// Spiral prefix and the pose it hands over to the regular strategies.
#[derive(Debug, Clone)]
pub struct SpiralLeg {
    pub trajectory: Trajectory,
    pub exit_pose: Pose,
    pub summary: SpiralSummary,
}

/// True when a straight descent (or climb) to the FAF would exceed the limit.
pub fn needs_spiral(ctx: &PlanContext<'_>) -> bool {
    let distance = ctx.horizontal_distance();
    let height = (ctx.faf().z - ctx.pose.position.z).abs();
    if height < 1e-12 {
        return false;
    }
    height / distance > ctx.slope_limit_deg().to_radians().tan()
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    turn_deg: f64,
    lead_km: f64,
    side: TurnSide,
}

#[derive(Debug, Clone)]
struct Layout {
    entry: HorizontalPath,
    side: TurnSide,
    center: Vec2,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    exit_altitude: f64,
    clearance: f64,
    score: f64,
}

/// Place and generate a spiral from the current pose.
pub fn plan_spiral(ctx: &PlanContext<'_>) -> Result<SpiralLeg, PlanError> {
    let rules = ctx.rules;
    let limit_deg = ctx.slope_limit_deg();
    let required_deg = ((ctx.faf().z - ctx.pose.position.z).abs() / ctx.horizontal_distance())
        .atan()
        .to_degrees();
    let margin = rules.spiral_safety_margin_km;
    let sides = [TurnSide::Left, TurnSide::Right];

    let preferred: Vec<Placement> = rules
        .spiral_leads_km
        .iter()
        .flat_map(|&lead_km| {
            sides.iter().map(move |&side| Placement {
                turn_deg: 0.0,
                lead_km,
                side,
            })
        })
        .collect();
    let best = best_by(ctx, &preferred, |layout| {
        (layout.clearance >= margin && layout.score >= rules.spiral_min_score).then_some(layout.score)
    });
    if let Some(layout) = best {
        return Ok(generate(ctx, layout, SpiralSearch::Preferred));
    }

    let grid = grid_placements(&rules.spiral_grid_turns_deg, &rules.spiral_grid_leads_km);
    if let Some(layout) = best_by(ctx, &grid, |layout| (layout.clearance >= margin).then_some(layout.clearance)) {
        debug!("preferred spiral positions rejected, using radial grid");
        return Ok(generate(ctx, layout, SpiralSearch::RadialGrid));
    }

    let emergency = grid_placements(&rules.spiral_emergency_turns_deg, &rules.spiral_emergency_leads_km);
    if let Some(layout) = best_by(ctx, &emergency, |layout| (layout.clearance >= 0.0).then_some(layout.clearance)) {
        debug!("radial grid exhausted, using emergency spiral position");
        return Ok(generate(ctx, layout, SpiralSearch::Emergency));
    }

    Err(PlanError::SlopeInfeasible {
        required_deg,
        limit_deg,
        reason: "no spiral position clears the obstacles".to_string(),
    })
}

fn grid_placements(turns_deg: &[f64], leads_km: &[f64]) -> Vec<Placement> {
    let mut placements = Vec::new();
    for &turn_deg in turns_deg {
        for &lead_km in leads_km {
            for side in [TurnSide::Left, TurnSide::Right] {
                placements.push(Placement {
                    turn_deg,
                    lead_km,
                    side,
                });
            }
        }
    }
    placements
}

/// Highest-ranked layout; ties keep the earliest placement.
fn best_by<F>(ctx: &PlanContext<'_>, placements: &[Placement], rank: F) -> Option<Layout>
where
    F: Fn(&Layout) -> Option<f64>,
{
    let mut best: Option<(f64, Layout)> = None;
    for placement in placements {
        let Some(layout) = lay_out(ctx, *placement) else {
            continue;
        };
        let Some(value) = rank(&layout) else {
            continue;
        };
        if best.as_ref().map(|(current, _)| value > *current).unwrap_or(true) {
            best = Some((value, layout));
        }
    }
    best.map(|(_, layout)| layout)
}

fn lay_out(ctx: &PlanContext<'_>, placement: Placement) -> Option<Layout> {
    let rules = ctx.rules;
    let start = ctx.start();
    let faf = ctx.faf();
    let target = faf.xy();
    let start_z = ctx.pose.position.z;
    let climbing = ctx.climbing();
    let rate = ctx.slope_limit_deg().to_radians().tan();
    let radius = ctx.turn_radius();

    // Entry: optional turn, then the lead
    let mut entry = HorizontalPath::new(start);
    let mut heading = ctx.pose.direction();
    if placement.turn_deg.abs() > 1e-9 {
        let turn_side = if placement.turn_deg > 0.0 { TurnSide::Right } else { TurnSide::Left };
        let center = turn_side.circle_center(start, heading, radius);
        entry.push_arc(
            center,
            turn_side.sign() * placement.turn_deg.abs().to_radians(),
            rules.arc_points_per_turn,
            SegmentKind::Arc,
        );
        heading = Vec2::from_heading(ctx.pose.heading_deg + placement.turn_deg);
    }
    if placement.lead_km > 0.0 {
        entry.push_line(entry.end() + heading * placement.lead_km, rules.straight_points_per_km, SegmentKind::Straight);
    }

    let entry_point = entry.end();
    let center = placement.side.circle_center(entry_point, heading, radius);
    let low_distance = (center.distance(target) - radius).max(0.0);
    let offset = rules.spiral_exit_slope_factor * rate * low_distance;
    let exit_altitude = if climbing { faf.z - offset } else { faf.z + offset };
    let height = (exit_altitude - start_z).abs();
    let moving_toward_target = if climbing { exit_altitude > start_z } else { exit_altitude < start_z };
    if !moving_toward_target || height < 1e-9 {
        return None;
    }

    let ramp_share = (rules.spiral_entry_ratio + rules.spiral_exit_ratio) / 2.0;
    let needed_length = height / (rate * (1.0 - ramp_share));
    let min_sweep = needed_length / radius * SWEEP_ALLOWANCE;
    let start_angle = (entry_point - center).angle();
    let sweep = aligned_sweep(center, radius, start_angle, min_sweep, placement.side, target);

    let clearance = clearance(ctx, &entry, center, radius, exit_altitude);
    let score = score(ctx, &entry, center, heading, clearance, radius);

    Some(Layout {
        entry,
        side: placement.side,
        center,
        radius,
        start_angle,
        sweep,
        exit_altitude,
        clearance,
        score,
    })
}

/// Smallest sweep of at least `min_sweep` that leaves the circle on a tangent
/// through the target.
fn aligned_sweep(center: Vec2, radius: f64, start_angle: f64, min_sweep: f64, side: TurnSide, target: Vec2) -> f64 {
    if center.distance(target) <= radius * ALIGNMENT_MIN_RADII {
        return min_sweep;
    }
    let Some(exit_angle) = tangent_exit_angle(center, radius, side, target) else {
        return min_sweep;
    };
    let to_exit = (side.sign() * (exit_angle - start_angle)).rem_euclid(TAU);
    min_sweep + (to_exit - min_sweep).rem_euclid(TAU)
}

/// Minimum wall clearance beyond the safety margin of the entry path and the
/// full spiral circle. Positive means clear; `INFINITY` with no obstacles in reach.
fn clearance(ctx: &PlanContext<'_>, entry: &HorizontalPath, center: Vec2, radius: f64, exit_altitude: f64) -> f64 {
    let start_z = ctx.pose.position.z;
    let floor = start_z.min(exit_altitude);
    let mut clearance = f64::INFINITY;
    for obstacle in ctx.obstacles {
        if obstacle.reaches(floor) {
            let to_circle = (obstacle.center().distance(center) - radius).abs();
            clearance = clearance.min(to_circle - obstacle.radius);
        }
        if obstacle.reaches(start_z) {
            for point in entry.points() {
                clearance = clearance.min(obstacle.clearance(*point));
            }
        }
    }
    clearance
}

fn score(ctx: &PlanContext<'_>, entry: &HorizontalPath, center: Vec2, heading: Vec2, clearance: f64, radius: f64) -> f64 {
    let clearance_score = if clearance.is_infinite() {
        1.0
    } else {
        (clearance / (2.0 * radius)).clamp(0.0, 1.0)
    };
    let longest_lead = ctx.rules.spiral_leads_km.iter().copied().fold(1.0, f64::max);
    let distance_score = 1.0 - (entry.length() / longest_lead).min(1.0);
    let alignment_score = (ctx.faf().xy() - center)
        .normalized()
        .map(|dir| (1.0 + dir.dot(heading)) / 2.0)
        .unwrap_or(0.5);
    0.5 * clearance_score + 0.2 * distance_score + 0.3 * alignment_score
}

fn generate(ctx: &PlanContext<'_>, layout: Layout, search: SpiralSearch) -> SpiralLeg {
    let rules = ctx.rules;
    let start_z = ctx.pose.position.z;
    let Layout {
        entry,
        side,
        center,
        radius,
        start_angle,
        sweep,
        exit_altitude,
        ..
    } = layout;

    let steps = ((sweep / TAU * rules.arc_points_per_turn).ceil() as usize).max(2);
    let delta = sweep / steps as f64;
    let chord = 2.0 * radius * (delta / 2.0).sin();
    let length = chord * steps as f64;

    let altitudes = spiral_altitudes(start_z, exit_altitude, steps, chord, rules.spiral_entry_ratio, rules.spiral_exit_ratio);

    let (entry_points, mut segments) = entry.into_parts();
    let mut points: Vec<Vec3> = entry_points.iter().map(|p| p.with_altitude(start_z)).collect();
    let spiral_start = points.len() - 1;
    let mut exit_angle = start_angle;
    for (i, z) in altitudes.iter().enumerate().skip(1) {
        exit_angle = start_angle + side.sign() * delta * i as f64;
        points.push((center + Vec2::from_angle(exit_angle) * radius).with_altitude(*z));
    }
    segments.push(TrajectorySegment {
        kind: SegmentKind::Spiral,
        start_index: spiral_start,
        end_index: points.len() - 1,
    });

    let exit = points[points.len() - 1];
    let exit_heading = side.tangent_at(exit_angle).heading_deg();
    info!(
        center_x = center.x,
        center_y = center.y,
        turns = sweep / TAU,
        exit_altitude_km = exit_altitude,
        length_km = length,
        ?search,
        "spiral placed"
    );

    SpiralLeg {
        exit_pose: ctx.pose.moved_to(exit, exit_heading),
        summary: SpiralSummary {
            center,
            radius_km: radius,
            turns: sweep / TAU,
            entry_altitude_km: start_z,
            exit_altitude_km: exit_altitude,
            search,
            exit_index: points.len() - 1,
        },
        trajectory: Trajectory::new(points, segments),
    }
}

/// Altitudes for `steps + 1` equally spaced spiral points.
///
/// The slope ramps up over the entry share of the length, holds, then ramps
/// down over the exit share, so the spiral joins level flight at both ends.
/// A per-step clamp and a light smoothing pass follow; both keep every step
/// within the working slope.
fn spiral_altitudes(start: f64, end: f64, steps: usize, chord: f64, entry_ratio: f64, exit_ratio: f64) -> Vec<f64> {
    let total = (end - start).abs();
    let direction = (end - start).signum();
    let length = chord * steps as f64;
    let entry_len = entry_ratio * length;
    let exit_len = exit_ratio * length;
    let steady_len = length - entry_len - exit_len;
    let rate = total / (entry_len / 2.0 + steady_len + exit_len / 2.0);

    let change_at = |s: f64| -> f64 {
        if s < entry_len {
            rate * entry_len * smoothstep5_integral(s / entry_len)
        } else if s <= entry_len + steady_len {
            rate * (entry_len / 2.0 + (s - entry_len))
        } else if exit_len > 0.0 {
            total - rate * exit_len * smoothstep5_integral((length - s) / exit_len)
        } else {
            total
        }
    };

    let mut altitudes: Vec<f64> = (0..=steps)
        .map(|i| start + direction * change_at(chord * i as f64))
        .collect();

    let max_step = rate * chord;
    for i in 1..altitudes.len() {
        let previous = altitudes[i - 1];
        altitudes[i] = altitudes[i].clamp(previous - max_step, previous + max_step);
    }

    let raw = altitudes.clone();
    for i in 1..steps {
        altitudes[i] = 0.25 * raw[i - 1] + 0.5 * raw[i] + 0.25 * raw[i + 1];
    }
    altitudes[0] = start;
    altitudes[steps] = end;
    altitudes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::Scene;
    use crate::models::Obstacle;

    fn steep_pose() -> Pose {
        Pose::new(Vec3::new(26.0, 25.0, 4.0), 270.0, 180.0)
    }

    #[test]
    fn detects_steep_descent() {
        let scene = Scene::standard();
        assert!(needs_spiral(&scene.context(steep_pose())));
        let gentle = Pose::new(Vec3::new(45.0, 25.0, 3.0), 270.0, 180.0);
        assert!(!needs_spiral(&scene.context(gentle)));
    }

    #[test]
    fn spiral_exit_leaves_a_feasible_descent() {
        let scene = Scene::standard();
        let ctx = scene.context(steep_pose());
        let leg = plan_spiral(&ctx).expect("spiral");
        assert_eq!(leg.summary.search, SpiralSearch::Preferred);
        let exit = leg.exit_pose.position;
        let residual = (exit.z - 1.0) / exit.horizontal_distance(scene.environment.faf);
        assert!(residual <= 10f64.to_radians().tan());
        assert!(leg.summary.turns > 0.0);
        assert_eq!(leg.trajectory.first(), Some(ctx.pose.position));
        assert_eq!(leg.trajectory.last(), Some(exit));
    }

    #[test]
    fn spiral_respects_slope_limit() {
        let scene = Scene::standard();
        let ctx = scene.context(steep_pose());
        let leg = plan_spiral(&ctx).expect("spiral");
        let limit = 10f64.to_radians().tan();
        for pair in leg.trajectory.points.windows(2) {
            let dh = pair[0].horizontal_distance(pair[1]);
            if dh > 0.0 {
                assert!((pair[1].z - pair[0].z).abs() / dh <= limit + 1e-9);
            }
        }
    }

    #[test]
    fn blocked_preferred_positions_fall_back_to_grid() {
        // Obstacles around the aircraft's nose block every straight-ahead placement
        let scene = Scene::standard()
            .with_obstacle(Obstacle::new(24.5, 25.0, 1.2, 6.0))
            .with_obstacle(Obstacle::new(21.5, 25.0, 1.2, 6.0));
        let ctx = scene.context(steep_pose());
        let leg = plan_spiral(&ctx).expect("spiral");
        assert_ne!(leg.summary.search, SpiralSearch::Preferred);
        for obstacle in &scene.obstacles {
            assert!(leg.trajectory.points.iter().all(|p| !obstacle.contains(*p)));
        }
    }

    #[test]
    fn aligned_sweep_exits_on_tangent() {
        use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};
        let center = Vec2::new(0.0, 0.0);
        let target = Vec2::new(2.0, 0.0);
        let sweep = aligned_sweep(center, 1.0, -FRAC_PI_2, 0.1, TurnSide::Left, target);
        // Left-hand tangent point toward (2, 0) sits at -60°
        assert!((sweep - FRAC_PI_6).abs() < 1e-9, "sweep {sweep}");
        let exit_angle = -FRAC_PI_2 + sweep;
        let heading = TurnSide::Left.tangent_at(exit_angle);
        let to_target = (target - Vec2::from_angle(exit_angle)).normalized().expect("distinct");
        assert!(heading.cross(to_target).abs() < 1e-9);
        assert!(heading.dot(to_target) > 0.0);
        // A longer minimum sweep rolls over to the next full turn
        let longer = aligned_sweep(center, 1.0, -FRAC_PI_2, 1.0, TurnSide::Left, target);
        assert!((longer - (FRAC_PI_6 + TAU)).abs() < 1e-9);
    }
}
