//! Run reports: what a planning run produced, in a serializable form.

use chrono::{DateTime, Utc};
use faf_core::{
    AircraftClass, FlightParameters, PlanError, PlanMode, PlanOutcome, RejectedAttempt, SpiralSummary, Trajectory,
    TurnSummary,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Planned,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    pub generated_at: DateTime<Utc>,
    pub aircraft_class: AircraftClass,
    pub status: RunStatus,
    /// Strategy that produced the trajectory, or the one that failed last
    pub mode: Option<PlanMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub points: usize,
    pub total_distance_km: f64,
    pub flight_time_s: f64,
    pub max_slope_deg: f64,
    pub max_turn_rate_deg_s: f64,
    pub turn: Option<TurnSummary>,
    pub spiral: Option<SpiralSummary>,
    pub avoidance_waypoints: usize,
    pub margin_km: Option<f64>,
    #[serde(default)]
    pub rejected: Vec<RejectedAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Trajectory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<FlightParameters>,
}

impl RunReport {
    /// Build a report; `dense` keeps the full point and parameter arrays.
    pub fn from_result(
        scenario: &str,
        aircraft_class: AircraftClass,
        result: &Result<PlanOutcome, PlanError>,
        dense: bool,
    ) -> Self {
        let mut report = Self {
            scenario: scenario.to_string(),
            generated_at: Utc::now(),
            aircraft_class,
            status: RunStatus::Failed,
            mode: None,
            error_kind: None,
            error: None,
            points: 0,
            total_distance_km: 0.0,
            flight_time_s: 0.0,
            max_slope_deg: 0.0,
            max_turn_rate_deg_s: 0.0,
            turn: None,
            spiral: None,
            avoidance_waypoints: 0,
            margin_km: None,
            rejected: Vec::new(),
            trajectory: None,
            parameters: None,
        };

        match result {
            Ok(outcome) => {
                let params = &outcome.parameters;
                report.status = RunStatus::Planned;
                report.mode = Some(outcome.mode);
                report.points = outcome.trajectory.len();
                report.total_distance_km = params.total_distance_km;
                report.flight_time_s = params.flight_time_s;
                report.max_slope_deg = params.max_abs_slope_deg();
                report.max_turn_rate_deg_s = params.max_abs_turn_rate_deg_s();
                report.turn = outcome.turn;
                report.spiral = outcome.spiral;
                report.avoidance_waypoints = outcome.avoidance_waypoints.len();
                report.margin_km = outcome.margin_km;
                report.rejected = outcome.rejected.clone();
                if dense {
                    report.trajectory = Some(outcome.trajectory.clone());
                    report.parameters = Some(outcome.parameters.clone());
                }
            }
            Err(err) => {
                report.mode = err.mode();
                report.error_kind = Some(err.kind().to_string());
                report.error = Some(err.to_string());
                if let PlanError::ObstacleUnavoidable { rejected, .. } = err {
                    report.rejected = rejected.clone();
                }
            }
        }
        report
    }

    pub fn is_planned(&self) -> bool {
        self.status == RunStatus::Planned
    }

    /// One-line human summary.
    pub fn summary_line(&self) -> String {
        match self.status {
            RunStatus::Planned => {
                let mut line = format!(
                    "{:<28} {:<10} {:<16} {:>6} pts {:>7.2} km {:>7.1} s  max slope {:>5.2}°",
                    self.scenario,
                    self.aircraft_class.as_str(),
                    self.mode.map(PlanMode::as_str).unwrap_or("-"),
                    self.points,
                    self.total_distance_km,
                    self.flight_time_s,
                    self.max_slope_deg,
                );
                if let Some(spiral) = &self.spiral {
                    line.push_str(&format!("  spiral {:.2} turns", spiral.turns));
                }
                if self.avoidance_waypoints > 0 {
                    line.push_str(&format!("  {} avoidance wp", self.avoidance_waypoints));
                }
                line
            }
            RunStatus::Failed => format!(
                "{:<28} {:<10} FAILED ({}): {}",
                self.scenario,
                self.aircraft_class.as_str(),
                self.error_kind.as_deref().unwrap_or("unknown"),
                self.error.as_deref().unwrap_or(""),
            ),
        }
    }
}
