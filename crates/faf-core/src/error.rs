//! Planning failures.

use crate::models::{PlanMode, RejectedAttempt};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Malformed or non-physical inputs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested construction has no real solution.
    #[error("{mode} geometry infeasible: {reason}")]
    GeometryInfeasible { mode: PlanMode, reason: String },

    /// The altitude change cannot be made within the slope limit, and no
    /// spiral position clears the obstacles.
    #[error(
        "required slope {required_deg:.2}° exceeds the {limit_deg:.2}° limit and no safe spiral exists: {reason}"
    )]
    SlopeInfeasible {
        required_deg: f64,
        limit_deg: f64,
        reason: String,
    },

    /// Every avoidance attempt still intersects an obstacle.
    #[error("no obstacle-free {mode} path after {attempts} attempts (obstacles {obstacles:?})")]
    ObstacleUnavoidable {
        mode: PlanMode,
        obstacles: Vec<usize>,
        attempts: usize,
        rejected: Vec<RejectedAttempt>,
    },
}

impl PlanError {
    pub fn invalid(errors: Vec<String>) -> Self {
        PlanError::InvalidInput(errors.join("; "))
    }

    /// Stable identifier for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::InvalidInput(_) => "invalid_input",
            PlanError::GeometryInfeasible { .. } => "geometry_infeasible",
            PlanError::SlopeInfeasible { .. } => "slope_infeasible",
            PlanError::ObstacleUnavoidable { .. } => "obstacle_unavoidable",
        }
    }

    pub fn mode(&self) -> Option<PlanMode> {
        match self {
            PlanError::GeometryInfeasible { mode, .. } | PlanError::ObstacleUnavoidable { mode, .. } => {
                Some(*mode)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_strategy() {
        let err = PlanError::ObstacleUnavoidable {
            mode: PlanMode::RunwayAlignment,
            obstacles: vec![0, 2],
            attempts: 5,
            rejected: Vec::new(),
        };
        let message = err.to_string();
        assert!(message.contains("runway_alignment"), "{message}");
        assert!(message.contains("[0, 2]"), "{message}");
        assert_eq!(err.kind(), "obstacle_unavoidable");
        assert_eq!(err.mode(), Some(PlanMode::RunwayAlignment));
    }

    #[test]
    fn invalid_joins_all_problems() {
        let err = PlanError::invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "invalid input: a; b");
        assert_eq!(err.mode(), None);
    }
}
