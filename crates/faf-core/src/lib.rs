pub mod altitude;
pub mod avoidance;
pub mod builders;
pub mod error;
pub mod geometry;
pub mod models;
pub mod parameters;
pub mod planner;
pub mod rules;
pub mod spiral;

pub use altitude::{AltitudePhase, AltitudeProfile};
pub use avoidance::{scan_trajectory, synthesize_waypoints, CollisionReport};
pub use builders::{Attempt, BuiltPath, PlanContext, TryPlan};
pub use error::PlanError;
pub use geometry::{
    min_turn_radius_km, solve_tangent_turn, solve_turn_toward, tightest_turn_radius, HorizontalPath, TangentTurn,
    TurnSide, TurnToward, Vec2, Vec3,
};
pub use models::{
    AircraftClass, AircraftProfile, Environment, FlightParameters, Obstacle, PlanMode, PlanOutcome, Pose,
    RejectedAttempt, SegmentKind, SpiralSearch, SpiralSummary, Trajectory, TrajectorySegment, TurnSummary,
    UnknownAircraftClass, Waypoint, WaypointTag,
};
pub use parameters::{extract, SpeedProfile};
pub use planner::{plan, plan_with_rules};
pub use rules::{PlannerRules, MAX_AVOIDANCE_ATTEMPTS};
pub use spiral::{needs_spiral, plan_spiral, SpiralLeg};
