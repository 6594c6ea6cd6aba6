//! Interchangeable path construction strategies.
//!
//! Each strategy either builds a complete trajectory to the FAF, declines
//! because its preconditions do not hold, or fails with an error the planner
//! may recover from by trying the next strategy.

pub mod direct;
pub mod runway;
pub mod tangent;
pub mod vertical;

pub use direct::DirectLineBuilder;
pub use runway::RunwayAlignmentBuilder;
pub use tangent::TangentTurnBuilder;
pub use vertical::VerticalBuilder;

use crate::altitude::AltitudeProfile;
use crate::error::PlanError;
use crate::geometry::{tightest_turn_radius, HorizontalPath, Vec2, Vec3};
use crate::models::{
    AircraftProfile, Environment, Obstacle, PlanMode, Pose, RejectedAttempt, Trajectory, TurnSummary, Waypoint,
};
use crate::parameters::SpeedProfile;
use crate::rules::PlannerRules;

/// Everything a strategy needs to plan from the current pose.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub pose: Pose,
    pub aircraft: &'a AircraftProfile,
    pub environment: &'a Environment,
    pub obstacles: &'a [Obstacle],
    pub rules: &'a PlannerRules,
}

impl<'a> PlanContext<'a> {
    pub fn start(&self) -> Vec2 {
        self.pose.horizontal_position()
    }

    pub fn faf(&self) -> Vec3 {
        self.environment.faf
    }

    pub fn horizontal_distance(&self) -> f64 {
        self.pose.position.horizontal_distance(self.environment.faf)
    }

    /// Lowest altitude flown between the pose and the FAF.
    pub fn floor_altitude(&self) -> f64 {
        self.pose.position.z.min(self.environment.faf.z)
    }

    pub fn turn_radius(&self) -> f64 {
        self.aircraft.min_turn_radius_km(self.pose.speed_kmh)
    }

    pub fn climbing(&self) -> bool {
        self.environment.faf.z > self.pose.position.z
    }

    pub fn slope_limit_deg(&self) -> f64 {
        self.aircraft.slope_limit_deg(self.climbing())
    }

    /// Approach axis, or `None` when the FAF and airport coincide.
    pub fn approach_axis(&self) -> Option<Vec2> {
        if self.environment.axis_length_km() < self.rules.degenerate_axis_km {
            None
        } else {
            self.environment.approach_axis()
        }
    }

    /// Altitude profile from the pose down (or up) to the FAF over `distance_km`.
    pub fn altitude_profile(&self, distance_km: f64) -> AltitudeProfile {
        AltitudeProfile::for_aircraft(
            self.pose.position.z,
            self.environment.faf.z,
            distance_km,
            self.aircraft,
            self.rules,
        )
    }

    /// Same context, planning from another pose.
    pub fn from_pose(&self, pose: Pose) -> Self {
        Self { pose, ..*self }
    }
}

/// A finished strategy result.
#[derive(Debug, Clone)]
pub struct BuiltPath {
    pub mode: PlanMode,
    pub trajectory: Trajectory,
    pub speeds: SpeedProfile,
    pub waypoints: Vec<Waypoint>,
    pub margin_km: Option<f64>,
    pub turn: Option<TurnSummary>,
    /// Attempts this strategy discarded before succeeding
    pub rejected: Vec<RejectedAttempt>,
}

pub enum Attempt {
    Built(BuiltPath),
    /// Preconditions not met; the reason is recorded and the next strategy runs
    NotApplicable(String),
}

pub trait TryPlan {
    fn mode(&self) -> PlanMode;

    fn try_plan(&self, ctx: &PlanContext<'_>) -> Result<Attempt, PlanError>;
}

/// Reason to decline a path that turns tighter than the aircraft can fly.
pub fn turn_radius_violation(ctx: &PlanContext<'_>, trajectory: &Trajectory) -> Option<String> {
    let limit = ctx.turn_radius() * (1.0 - ctx.rules.turn_radius_tolerance);
    let tightest = tightest_turn_radius(&trajectory.points);
    (tightest < limit).then(|| format!("path turns at {tightest:.3} km radius, below the {limit:.3} km minimum"))
}

/// Lift a horizontal path with its altitude profile, pinning the end to the FAF.
pub fn lift(path: HorizontalPath, profile: &AltitudeProfile, faf: Vec3) -> Trajectory {
    let mut points = profile.apply(&path);
    if let Some(last) = points.last_mut() {
        *last = faf;
    }
    let (_, segments) = path.into_parts();
    Trajectory::new(points, segments)
}
