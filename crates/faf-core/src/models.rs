//! Core data models for FAF trajectory planning.

use crate::geometry::{min_turn_radius_km, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aircraft state at the start of a planning call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in km (x east, y north, z altitude)
    pub position: Vec3,
    /// Degrees clockwise from north
    pub heading_deg: f64,
    pub speed_kmh: f64,
}

impl Pose {
    pub fn new(position: Vec3, heading_deg: f64, speed_kmh: f64) -> Self {
        Self {
            position,
            heading_deg,
            speed_kmh,
        }
    }

    /// Unit vector of the current heading.
    pub fn direction(&self) -> Vec2 {
        Vec2::from_heading(self.heading_deg)
    }

    pub fn horizontal_position(&self) -> Vec2 {
        self.position.xy()
    }

    /// Copy of this pose at another position and heading, same speed.
    pub fn moved_to(&self, position: Vec3, heading_deg: f64) -> Self {
        Self {
            position,
            heading_deg,
            speed_kmh: self.speed_kmh,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.position.is_finite() {
            errors.push("Aircraft position must be finite".to_string());
        }
        if !self.heading_deg.is_finite() {
            errors.push("Aircraft heading must be finite".to_string());
        }
        if !(self.speed_kmh.is_finite() && self.speed_kmh > 0.0) {
            errors.push(format!(
                "Aircraft speed must be positive (got {} km/h)",
                self.speed_kmh
            ));
        }
        errors
    }
}

/// Aircraft performance categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AircraftClass {
    /// Light general aviation
    Light,
    /// Commercial airliner
    #[default]
    Commercial,
    /// Heavy cargo
    Cargo,
}

impl AircraftClass {
    pub const ALL: [AircraftClass; 3] = [
        AircraftClass::Light,
        AircraftClass::Commercial,
        AircraftClass::Cargo,
    ];

    pub fn profile(self) -> AircraftProfile {
        AircraftProfile::for_class(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AircraftClass::Light => "light",
            AircraftClass::Commercial => "commercial",
            AircraftClass::Cargo => "cargo",
        }
    }

    /// Parse a class name, falling back to the default class when unknown.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for AircraftClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown aircraft class '{0}' (expected light, commercial or cargo)")]
pub struct UnknownAircraftClass(pub String);

impl FromStr for AircraftClass {
    type Err = UnknownAircraftClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(AircraftClass::Light),
            "commercial" => Ok(AircraftClass::Commercial),
            "cargo" => Ok(AircraftClass::Cargo),
            _ => Err(UnknownAircraftClass(s.to_string())),
        }
    }
}

/// Performance envelope of an aircraft class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftProfile {
    pub class: AircraftClass,
    /// Steepest climb (degrees, positive)
    pub max_climb_slope_deg: f64,
    /// Steepest descent (degrees, negative)
    pub max_descent_slope_deg: f64,
    pub max_bank_angle_deg: f64,
    pub cruise_speed_kmh: f64,
    pub approach_speed_kmh: f64,
    pub faf_speed_kmh: f64,
    pub min_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

impl AircraftProfile {
    pub fn for_class(class: AircraftClass) -> Self {
        match class {
            AircraftClass::Light => Self {
                class,
                max_climb_slope_deg: 15.0,
                max_descent_slope_deg: -10.0,
                max_bank_angle_deg: 30.0,
                cruise_speed_kmh: 180.0,
                approach_speed_kmh: 120.0,
                faf_speed_kmh: 140.0,
                min_speed_kmh: 100.0,
                max_speed_kmh: 220.0,
            },
            AircraftClass::Commercial => Self {
                class,
                max_climb_slope_deg: 10.0,
                max_descent_slope_deg: -6.0,
                max_bank_angle_deg: 25.0,
                cruise_speed_kmh: 250.0,
                approach_speed_kmh: 180.0,
                faf_speed_kmh: 200.0,
                min_speed_kmh: 160.0,
                max_speed_kmh: 300.0,
            },
            AircraftClass::Cargo => Self {
                class,
                max_climb_slope_deg: 8.0,
                max_descent_slope_deg: -5.0,
                max_bank_angle_deg: 20.0,
                cruise_speed_kmh: 220.0,
                approach_speed_kmh: 160.0,
                faf_speed_kmh: 180.0,
                min_speed_kmh: 140.0,
                max_speed_kmh: 280.0,
            },
        }
    }

    pub fn with_max_descent_slope(mut self, slope_deg: f64) -> Self {
        self.max_descent_slope_deg = -slope_deg.abs();
        self
    }

    pub fn with_max_climb_slope(mut self, slope_deg: f64) -> Self {
        self.max_climb_slope_deg = slope_deg.abs();
        self
    }

    pub fn with_max_bank_angle(mut self, bank_deg: f64) -> Self {
        self.max_bank_angle_deg = bank_deg;
        self
    }

    /// Minimum turn radius (km) at the given ground speed.
    pub fn min_turn_radius_km(&self, speed_kmh: f64) -> f64 {
        min_turn_radius_km(speed_kmh, self.max_bank_angle_deg)
    }

    /// Slope limit magnitude (degrees) for a climb or a descent.
    pub fn slope_limit_deg(&self, climbing: bool) -> f64 {
        if climbing {
            self.max_climb_slope_deg.abs()
        } else {
            self.max_descent_slope_deg.abs()
        }
    }

    pub fn is_speed_valid(&self, speed_kmh: f64) -> bool {
        speed_kmh >= self.min_speed_kmh && speed_kmh <= self.max_speed_kmh
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.max_bank_angle_deg > 0.0 && self.max_bank_angle_deg < 90.0) {
            errors.push(format!(
                "Bank angle must be within (0, 90) degrees (got {})",
                self.max_bank_angle_deg
            ));
        }
        let descent = self.max_descent_slope_deg.abs();
        if !(descent > 0.0 && descent < 90.0) {
            errors.push(format!(
                "Descent slope must be within (0, 90) degrees (got {})",
                self.max_descent_slope_deg
            ));
        }
        if !(self.max_climb_slope_deg > 0.0 && self.max_climb_slope_deg < 90.0) {
            errors.push(format!(
                "Climb slope must be within (0, 90) degrees (got {})",
                self.max_climb_slope_deg
            ));
        }
        for (name, value) in [
            ("cruise", self.cruise_speed_kmh),
            ("approach", self.approach_speed_kmh),
            ("FAF", self.faf_speed_kmh),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{name} speed must be positive (got {value})"));
            }
        }
        errors
    }
}

impl Default for AircraftProfile {
    fn default() -> Self {
        Self::for_class(AircraftClass::default())
    }
}

/// Airport and Final Approach Fix geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub airport: Vec3,
    pub faf: Vec3,
}

impl Environment {
    pub fn new(airport: Vec3, faf: Vec3) -> Self {
        Self { airport, faf }
    }

    /// Horizontal FAF-to-airport separation (km).
    pub fn axis_length_km(&self) -> f64 {
        self.faf.horizontal_distance(self.airport)
    }

    /// Unit horizontal direction from the FAF toward the airport.
    pub fn approach_axis(&self) -> Option<Vec2> {
        (self.airport.xy() - self.faf.xy()).normalized()
    }

    /// Runway heading implied by the approach axis (degrees).
    pub fn runway_heading_deg(&self) -> Option<f64> {
        self.approach_axis().map(Vec2::heading_deg)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.airport.is_finite() {
            errors.push("Airport position must be finite".to_string());
        }
        if !self.faf.is_finite() {
            errors.push("FAF position must be finite".to_string());
        }
        errors
    }
}

/// Vertical cylinder from the ground up to `height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub height: f64,
}

impl Obstacle {
    pub fn new(x: f64, y: f64, radius: f64, height: f64) -> Self {
        Self {
            x,
            y,
            radius,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Collision test: inside the radius (inclusive) and between ground and top.
    pub fn contains(&self, point: Vec3) -> bool {
        point.xy().distance(self.center()) <= self.radius && point.z >= 0.0 && point.z <= self.height
    }

    /// Horizontal distance from `point` to the cylinder wall (negative inside).
    pub fn clearance(&self, point: Vec2) -> f64 {
        point.distance(self.center()) - self.radius
    }

    /// Whether the cylinder reaches up to `altitude_km`.
    pub fn reaches(&self, altitude_km: f64) -> bool {
        self.height >= altitude_km
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.x.is_finite() && self.y.is_finite()) {
            errors.push("Obstacle centre must be finite".to_string());
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            errors.push(format!("Obstacle radius must be positive (got {})", self.radius));
        }
        if !(self.height.is_finite() && self.height >= 0.0) {
            errors.push(format!(
                "Obstacle height cannot be negative (got {})",
                self.height
            ));
        }
        errors
    }
}

/// Role of an avoidance waypoint relative to its obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointTag {
    Entry,
    Exit,
}

/// Intermediate horizontal point a path is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec2,
    pub tag: Option<WaypointTag>,
    /// Index of the obstacle this waypoint steers around
    pub obstacle: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Straight,
    Arc,
    Bezier,
    /// Final leg on the approach axis
    Approach,
    Spiral,
    Vertical,
}

/// Index range of a trajectory section (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectorySegment {
    pub kind: SegmentKind,
    pub start_index: usize,
    pub end_index: usize,
}

/// Ordered 3D points from the aircraft to the FAF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<Vec3>,
    #[serde(default)]
    pub segments: Vec<TrajectorySegment>,
}

impl Trajectory {
    pub fn new(points: Vec<Vec3>, segments: Vec<TrajectorySegment>) -> Self {
        Self { points, segments }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Vec3> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Vec3> {
        self.points.last().copied()
    }

    /// 3D length along the polyline (km).
    pub fn length_km(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    pub fn horizontal_length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].horizontal_distance(w[1]))
            .sum()
    }

    pub fn segments_of(&self, kind: SegmentKind) -> impl Iterator<Item = &TrajectorySegment> {
        self.segments.iter().filter(move |segment| segment.kind == kind)
    }

    /// Append `other`, merging the shared join point.
    pub fn append(&mut self, other: Trajectory) {
        let mut points = other.points.into_iter().peekable();
        let mut offset = self.points.len();
        if let (Some(last), Some(first)) = (self.points.last(), points.peek()) {
            if last.distance(*first) < 1e-9 {
                points.next();
                offset -= 1;
            }
        }
        self.points.extend(points);
        self.segments
            .extend(other.segments.into_iter().map(|segment| TrajectorySegment {
                kind: segment.kind,
                start_index: segment.start_index + offset,
                end_index: segment.end_index + offset,
            }));
    }
}

/// Per-point flight parameters, index-aligned with the trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightParameters {
    pub time_s: Vec<f64>,
    pub altitude_km: Vec<f64>,
    pub slope_deg: Vec<f64>,
    pub heading_deg: Vec<f64>,
    pub turn_rate_deg_s: Vec<f64>,
    pub speed_kmh: Vec<f64>,
    pub total_distance_km: f64,
    pub flight_time_s: f64,
}

impl FlightParameters {
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn max_abs_slope_deg(&self) -> f64 {
        self.slope_deg.iter().fold(0.0, |acc, s| acc.max(s.abs()))
    }

    pub fn max_abs_turn_rate_deg_s(&self) -> f64 {
        self.turn_rate_deg_s.iter().fold(0.0, |acc, r| acc.max(r.abs()))
    }
}

/// Strategy that produced (or was tried for) a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Vertical,
    DirectLine,
    TangentTurn,
    RunwayAlignment,
}

impl PlanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanMode::Vertical => "vertical",
            PlanMode::DirectLine => "direct_line",
            PlanMode::TangentTurn => "tangent_turn",
            PlanMode::RunwayAlignment => "runway_alignment",
        }
    }
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy attempt that did not produce the final trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedAttempt {
    pub mode: PlanMode,
    /// Avoidance margin in force, when the attempt routed around obstacles
    pub margin_km: Option<f64>,
    pub reason: String,
    #[serde(default)]
    pub colliding_obstacles: Vec<usize>,
}

/// Geometry of the turn flown by the tangent-turn strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub center: Vec2,
    pub radius_km: f64,
    /// Straight distance flown on the initial heading before the turn
    #[serde(default)]
    pub lead_km: f64,
    /// Signed turn angle (positive = left)
    pub arc_angle_deg: f64,
    pub intercept: Vec2,
}

/// Which search stage produced the spiral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpiralSearch {
    Preferred,
    RadialGrid,
    Emergency,
}

/// Geometry of a spiral altitude-loss (or gain) segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralSummary {
    pub center: Vec2,
    pub radius_km: f64,
    pub turns: f64,
    pub entry_altitude_km: f64,
    pub exit_altitude_km: f64,
    pub search: SpiralSearch,
    /// Trajectory index where the spiral ends
    pub exit_index: usize,
}

/// Successful planning result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub mode: PlanMode,
    pub trajectory: Trajectory,
    pub parameters: FlightParameters,
    pub turn: Option<TurnSummary>,
    pub spiral: Option<SpiralSummary>,
    #[serde(default)]
    pub avoidance_waypoints: Vec<Waypoint>,
    /// Margin of the accepted avoidance attempt
    pub margin_km: Option<f64>,
    #[serde(default)]
    pub rejected: Vec<RejectedAttempt>,
}
