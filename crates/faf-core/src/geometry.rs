//! Planar and spatial math for trajectory construction.
//!
//! Coordinates are kilometres in a local flat frame: `x` grows east, `y` grows
//! north and `z` is altitude. Headings are degrees clockwise from north, so a
//! heading of 90° points along `+x`.

use crate::models::{SegmentKind, TrajectorySegment};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

const GRAVITY_MPS2: f64 = 9.81;
/// Lengths below this are treated as zero (km).
pub const LENGTH_EPSILON_KM: f64 = 1e-9;

/// Fewest steps a straight or curved section is sampled with.
const MIN_SECTION_STEPS: usize = 9;

/// A horizontal vector or point (km).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector for a compass heading (0° = north, clockwise).
    pub fn from_heading(heading_deg: f64) -> Self {
        let rad = heading_deg.to_radians();
        Self::new(rad.sin(), rad.cos())
    }

    /// Unit vector for a mathematical angle (radians, counter-clockwise from +x).
    pub fn from_angle(angle_rad: f64) -> Self {
        Self::new(angle_rad.cos(), angle_rad.sin())
    }

    /// Compass heading of this vector, normalized to [0, 360).
    pub fn heading_deg(self) -> f64 {
        normalize_heading(self.x.atan2(self.y).to_degrees())
    }

    /// Mathematical angle of this vector (radians, counter-clockwise from +x).
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product. Positive when `other` lies
    /// counter-clockwise (to the left) of `self`.
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }

    pub fn normalized(self) -> Option<Vec2> {
        let length = self.length();
        if length < 1e-12 || !length.is_finite() {
            None
        } else {
            Some(self * (1.0 / length))
        }
    }

    /// Perpendicular rotated 90° counter-clockwise (left of travel).
    pub fn left_normal(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn with_altitude(self, z: f64) -> Vec3 {
        Vec3::new(self.x, self.y, z)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// A point in the local frame (km).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (other - self).length()
    }

    pub fn horizontal_distance(self, other: Vec3) -> f64 {
        self.xy().distance(other.xy())
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        self + (other - self) * t
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Normalize a heading to [0, 360).
pub fn normalize_heading(heading_deg: f64) -> f64 {
    let wrapped = heading_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle difference to [-180, 180].
pub fn wrap_degrees(delta_deg: f64) -> f64 {
    (delta_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Smallest unsigned angle between two headings (degrees).
pub fn heading_difference(a_deg: f64, b_deg: f64) -> f64 {
    wrap_degrees(b_deg - a_deg).abs()
}

/// Minimum turn radius (km) for a coordinated turn at `speed_kmh` and the
/// given bank angle: `r = v² / (g·tan(bank))`.
pub fn min_turn_radius_km(speed_kmh: f64, bank_angle_deg: f64) -> f64 {
    let v_mps = speed_kmh / 3.6;
    let tan_bank = bank_angle_deg.to_radians().tan();
    if tan_bank <= 0.0 {
        return f64::INFINITY;
    }
    (v_mps * v_mps) / (GRAVITY_MPS2 * tan_bank) / 1000.0
}

/// Cubic smoothstep `3t² − 2t³`.
pub fn smoothstep3(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Quintic smoothstep `6t⁵ − 15t⁴ + 10t³`.
pub fn smoothstep5(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (6.0 * t - 15.0) + 10.0)
}

/// Integral of [`smoothstep5`] over [0, t]. Equals 0.5 at t = 1.
pub fn smoothstep5_integral(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let t4 = t.powi(4);
    t4 * (t * t - 3.0 * t + 2.5)
}

/// Septic ease `−20t⁷ + 70t⁶ − 84t⁵ + 35t⁴`: first three derivatives vanish
/// at both ends.
pub fn ease7(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let t4 = t.powi(4);
    t4 * (35.0 + t * (-84.0 + t * (70.0 - 20.0 * t)))
}

/// Integral of [`ease7`] over [0, t]. Equals 0.5 at t = 1.
pub fn ease7_integral(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let t5 = t.powi(5);
    t5 * (7.0 + t * (-14.0 + t * (10.0 - 2.5 * t)))
}

/// Evaluate a cubic Bézier curve at `t` in [0, 1].
pub fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f64) -> Vec2 {
    let t = t.clamp(0.0, 1.0);
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

/// Length estimate from the chord and the control polygon.
pub fn bezier_length_estimate(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> f64 {
    let chord = p0.distance(p3);
    let net = p0.distance(p1) + p1.distance(p2) + p2.distance(p3);
    (chord + net) / 2.0
}

/// Orthogonal projection of a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Position along the segment (km from `a`), clamped to the segment
    pub along: f64,
    /// Closest point on the segment
    pub point: Vec2,
    /// Distance from the projected point to the segment
    pub distance: f64,
}

/// Project `p` onto segment `a`-`b`.
pub fn project_onto_segment(p: Vec2, a: Vec2, b: Vec2) -> SegmentProjection {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq < 1e-18 {
        // Segment is essentially a point
        return SegmentProjection {
            along: 0.0,
            point: a,
            distance: p.distance(a),
        };
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let point = a + ab * t;
    SegmentProjection {
        along: t * len_sq.sqrt(),
        point,
        distance: p.distance(point),
    }
}

/// Distance from a point to a segment (km).
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    project_onto_segment(p, a, b).distance
}

/// Side of the aircraft a turn circle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnSide {
    /// Counter-clockwise in the local frame
    Left,
    /// Clockwise in the local frame
    Right,
}

impl TurnSide {
    /// +1 for left (counter-clockwise), -1 for right.
    pub fn sign(self) -> f64 {
        match self {
            TurnSide::Left => 1.0,
            TurnSide::Right => -1.0,
        }
    }

    /// Centre of the turn circle entered at `position` with direction `heading`.
    pub fn circle_center(self, position: Vec2, heading: Vec2, radius: f64) -> Vec2 {
        position + heading.left_normal() * (self.sign() * radius)
    }

    /// Unit direction of travel at polar `angle` on a circle flown on this side.
    pub fn tangent_at(self, angle_rad: f64) -> Vec2 {
        Vec2::from_angle(angle_rad).left_normal() * self.sign()
    }
}

/// A straight lead on the current heading, then a turn arc that ends tangent
/// to the approach axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentTurn {
    pub start: Vec2,
    /// Where the lead ends and the arc begins
    pub turn_start: Vec2,
    /// Where the arc meets the approach axis
    pub intercept: Vec2,
    pub center: Vec2,
    pub radius: f64,
    /// Signed sweep in radians (positive = left/counter-clockwise)
    pub arc_angle: f64,
}

impl TangentTurn {
    pub fn side(&self) -> TurnSide {
        if self.arc_angle >= 0.0 {
            TurnSide::Left
        } else {
            TurnSide::Right
        }
    }

    pub fn lead_km(&self) -> f64 {
        self.start.distance(self.turn_start)
    }

    /// Direction of travel where the arc ends.
    pub fn exit_direction(&self) -> Vec2 {
        self.side().tangent_at((self.intercept - self.center).angle())
    }

    pub fn length_km(&self) -> f64 {
        self.lead_km() + self.radius * self.arc_angle.abs()
    }
}

/// Solve the turn onto the approach axis.
///
/// The axis is the line through `faf` along `approach_dir`. For a turn on
/// side `s` after a lead `L` on `heading`, the arc leaves the circle flying
/// `approach_dir` at `turn_start + s·R·n(heading) - s·R·n(approach_dir)`
/// (`n` the left normal). Requiring that point on the axis gives
///
/// `L = (s·R·(1 - d·h) - e) / (n(d)·h)`
///
/// with `e` the signed offset of `start` from the axis. Headings parallel to
/// the axis have no solution, nor do negative leads or intercepts at or past
/// the FAF. Of the two sides the shorter path wins.
pub fn solve_tangent_turn(
    start: Vec2,
    heading: Vec2,
    radius: f64,
    faf: Vec2,
    approach_dir: Vec2,
) -> Option<TangentTurn> {
    if !(radius.is_finite() && radius > 0.0) {
        return None;
    }
    let axis_normal = approach_dir.left_normal();
    let offset = axis_normal.dot(start - faf);
    let closing = axis_normal.dot(heading);
    if closing.abs() < 1e-9 {
        return None;
    }

    let mut best: Option<TangentTurn> = None;
    for side in [TurnSide::Left, TurnSide::Right] {
        let s = side.sign();
        let lead = (s * radius * (1.0 - approach_dir.dot(heading)) - offset) / closing;
        if lead < -LENGTH_EPSILON_KM {
            continue;
        }
        let turn_start = start + heading * lead.max(0.0);
        let center = side.circle_center(turn_start, heading, radius);
        let intercept = center - axis_normal * (s * radius);
        if approach_dir.dot(intercept - faf) >= -LENGTH_EPSILON_KM {
            continue;
        }
        let sweep = (s * (approach_dir.angle() - heading.angle())).rem_euclid(TAU);
        if sweep < 1e-9 || sweep > TAU - 1e-9 {
            continue;
        }
        let turn = TangentTurn {
            start,
            turn_start,
            intercept,
            center,
            radius,
            arc_angle: s * sweep,
        };
        if best.map(|current| turn.length_km() < current.length_km()).unwrap_or(true) {
            best = Some(turn);
        }
    }
    best
}

/// Polar angle on a circle flown on `side` where the direction of travel
/// points straight at `target`. `None` when the target is inside the circle.
pub fn tangent_exit_angle(center: Vec2, radius: f64, side: TurnSide, target: Vec2) -> Option<f64> {
    let to_target = target - center;
    let distance = to_target.length();
    if distance <= radius {
        return None;
    }
    let beta = (radius / distance).acos();
    let gamma = to_target.angle();
    Some(match side {
        TurnSide::Left => gamma - beta,
        TurnSide::Right => gamma + beta,
    })
}

/// Turn at `radius` until the nose points at a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnToward {
    pub center: Vec2,
    /// Signed sweep in radians; zero when already pointing at the target
    pub sweep: f64,
    /// Where the straight leg toward the target begins
    pub exit: Vec2,
}

/// Shortest minimum-radius turn that leaves `start` pointing at `target`.
/// `None` when neither turn circle can face the target.
pub fn solve_turn_toward(start: Vec2, heading: Vec2, radius: f64, target: Vec2) -> Option<TurnToward> {
    if !(radius.is_finite() && radius > 0.0) {
        return None;
    }
    let mut best: Option<TurnToward> = None;
    for side in [TurnSide::Left, TurnSide::Right] {
        let center = side.circle_center(start, heading, radius);
        let Some(exit_angle) = tangent_exit_angle(center, radius, side, target) else {
            continue;
        };
        let start_angle = (start - center).angle();
        let mut sweep = (side.sign() * (exit_angle - start_angle)).rem_euclid(TAU);
        if sweep < 1e-9 || sweep > TAU - 1e-9 {
            sweep = 0.0;
        }
        if best.map(|current| sweep < current.sweep.abs()).unwrap_or(true) {
            let exit = if sweep == 0.0 {
                start
            } else {
                center + Vec2::from_angle(exit_angle) * radius
            };
            best = Some(TurnToward {
                center,
                sweep: side.sign() * sweep,
                exit,
            });
        }
    }
    best
}

/// Tightest radius flown through consecutive horizontal positions.
///
/// Each run of three distinct points is fitted with its circumscribed
/// circle. A reversal on a straight line counts as radius zero.
pub fn tightest_turn_radius(points: &[Vec3]) -> f64 {
    let mut track: Vec<Vec2> = Vec::with_capacity(points.len());
    for point in points {
        let xy = point.xy();
        if track.last().map(|last| last.distance(xy) > LENGTH_EPSILON_KM).unwrap_or(true) {
            track.push(xy);
        }
    }
    track
        .windows(3)
        .map(|w| {
            let ab = w[1] - w[0];
            let bc = w[2] - w[1];
            let ac = w[2] - w[0];
            let twice_area = ab.cross(ac).abs();
            if twice_area < 1e-15 {
                return if ab.dot(bc) < 0.0 { 0.0 } else { f64::INFINITY };
            }
            ab.length() * bc.length() * ac.length() / (2.0 * twice_area)
        })
        .fold(f64::INFINITY, f64::min)
}

/// Points along an arc around `center`, excluding the start point.
pub fn arc_points(center: Vec2, radius: f64, start_angle: f64, sweep: f64, points_per_turn: f64) -> Vec<Vec2> {
    let steps = ((sweep.abs() / TAU * points_per_turn).ceil() as usize).max(2);
    (1..=steps)
        .map(|i| {
            let angle = start_angle + sweep * (i as f64 / steps as f64);
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}

/// A horizontal polyline assembled section by section.
///
/// Every builder lays out its 2D path here first; altitudes are assigned
/// afterwards as a function of cumulative distance along the polyline.
#[derive(Debug, Clone)]
pub struct HorizontalPath {
    points: Vec<Vec2>,
    segments: Vec<TrajectorySegment>,
}

impl HorizontalPath {
    pub fn new(start: Vec2) -> Self {
        Self {
            points: vec![start],
            segments: Vec::new(),
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn segments(&self) -> &[TrajectorySegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Vec2 {
        self.points[0]
    }

    pub fn end(&self) -> Vec2 {
        self.points[self.points.len() - 1]
    }

    /// Replace the last point, absorbing floating error at section joins.
    pub fn snap_end(&mut self, point: Vec2) {
        let last = self.points.len() - 1;
        self.points[last] = point;
    }

    pub fn push_line(&mut self, to: Vec2, points_per_km: f64, kind: SegmentKind) {
        let from = self.end();
        let length = from.distance(to);
        if length < LENGTH_EPSILON_KM {
            return;
        }
        let steps = section_steps(length, points_per_km);
        let first = self.points.len() - 1;
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            self.points.push(from + (to - from) * t);
        }
        self.points.push(to);
        self.record(kind, first);
    }

    /// Arc around `center` from the current end point, sweeping `sweep`
    /// radians (positive = counter-clockwise).
    pub fn push_arc(&mut self, center: Vec2, sweep: f64, points_per_turn: f64, kind: SegmentKind) {
        if sweep.abs() < 1e-12 {
            return;
        }
        let from = self.end();
        let radius = from.distance(center);
        let start_angle = (from - center).angle();
        let first = self.points.len() - 1;
        self.points
            .extend(arc_points(center, radius, start_angle, sweep, points_per_turn));
        self.record(kind, first);
    }

    pub fn push_bezier(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, points_per_km: f64, kind: SegmentKind) {
        let first = self.points.len() - 1;
        if self.sample_bezier(p1, p2, p3, points_per_km) {
            self.record(kind, first);
        }
    }

    /// Chain of cubic Bézier sections through `knots`.
    ///
    /// `knots[0]` must be the current end point. Interior tangents follow the
    /// neighbouring knots (Catmull-Rom style); handles are `handle_ratio`
    /// times the section chord, raised to `min_handle_km` but never past half
    /// the chord.
    #[allow(clippy::too_many_arguments)]
    pub fn push_bezier_chain(
        &mut self,
        knots: &[Vec2],
        start_tangent: Vec2,
        end_tangent: Vec2,
        handle_ratio: f64,
        min_handle_km: f64,
        points_per_km: f64,
        kind: SegmentKind,
    ) {
        if knots.len() < 2 {
            return;
        }
        let last = knots.len() - 1;
        let tangents: Vec<Vec2> = (0..knots.len())
            .map(|i| {
                if i == 0 {
                    start_tangent
                } else if i == last {
                    end_tangent
                } else {
                    (knots[i + 1] - knots[i - 1])
                        .normalized()
                        .or_else(|| (knots[i + 1] - knots[i]).normalized())
                        .unwrap_or(end_tangent)
                }
            })
            .collect();

        let first = self.points.len() - 1;
        let mut sampled = false;
        for i in 0..last {
            let chord = knots[i].distance(knots[i + 1]);
            if chord < LENGTH_EPSILON_KM {
                continue;
            }
            let handle = (chord * handle_ratio).max(min_handle_km.min(0.5 * chord));
            let p1 = knots[i] + tangents[i] * handle;
            let p2 = knots[i + 1] - tangents[i + 1] * handle;
            sampled |= self.sample_bezier(p1, p2, knots[i + 1], points_per_km);
        }
        if sampled {
            self.record(kind, first);
        }
    }

    /// Cumulative horizontal distance at each point (km).
    pub fn cumulative_distances(&self) -> Vec<f64> {
        let mut cumulative = Vec::with_capacity(self.points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in self.points.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }
        cumulative
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }

    pub fn into_parts(self) -> (Vec<Vec2>, Vec<TrajectorySegment>) {
        (self.points, self.segments)
    }

    fn sample_bezier(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, points_per_km: f64) -> bool {
        let p0 = self.end();
        let length = bezier_length_estimate(p0, p1, p2, p3);
        if length < LENGTH_EPSILON_KM {
            return false;
        }
        let steps = section_steps(length, points_per_km);
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            self.points.push(cubic_bezier(p0, p1, p2, p3, t));
        }
        self.points.push(p3);
        true
    }

    fn record(&mut self, kind: SegmentKind, start_index: usize) {
        let end_index = self.points.len() - 1;
        if end_index > start_index {
            self.segments.push(TrajectorySegment {
                kind,
                start_index,
                end_index,
            });
        }
    }
}

fn section_steps(length_km: f64, points_per_km: f64) -> usize {
    ((length_km * points_per_km).ceil() as usize).max(MIN_SECTION_STEPS)
}
