//! Tunable thresholds for trajectory planning.

use serde::{Deserialize, Serialize};

/// Upper bound on avoidance attempts per strategy.
pub const MAX_AVOIDANCE_ATTEMPTS: usize = 5;

/// Configuration for the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerRules {
    /// Below this horizontal distance to the FAF the plan is vertical (km)
    pub vertical_threshold_km: f64,
    /// FAF-to-airport separation below which there is no usable axis (km)
    pub degenerate_axis_km: f64,
    /// Distance at which generated endpoints count as coincident (km)
    pub endpoint_tolerance_km: f64,

    /// Sampling density on straight and Bézier sections
    pub straight_points_per_km: f64,
    /// Sampling density on arcs (0.5° spacing at 720)
    pub arc_points_per_turn: f64,
    /// Vertical mode samples per km of altitude change
    pub vertical_points_per_km: f64,
    pub min_vertical_points: usize,
    /// Points emitted when the aircraft already sits on the FAF
    pub min_trajectory_points: usize,
    /// Speed reported while climbing or descending in place (km/h)
    pub vertical_speed_kmh: f64,

    /// Nominal transition length as a fraction of the sloped distance
    pub transition_ratio: f64,
    pub min_transition_km: f64,
    pub max_transition_km: f64,
    /// Transition share of the distance when the descent is compressed
    pub degraded_transition_ratio: f64,

    /// Heading tolerance for treating the aircraft as established (degrees)
    pub alignment_tolerance_deg: f64,
    /// Lateral tolerance from the approach axis for the same check (km)
    pub alignment_offset_km: f64,
    /// Multipliers tried on the minimum turn radius when the arc conflicts
    pub turn_radius_factors: Vec<f64>,
    /// Share of the minimum turn radius a sampled path may undercut
    pub turn_radius_tolerance: f64,

    pub initial_leg_ratio: f64,
    pub min_initial_leg_km: f64,
    pub max_initial_leg_km: f64,
    /// Bézier handle length as a fraction of the section chord
    pub bezier_handle_ratio: f64,

    /// Fraction of the approach leg flown at cruise before decelerating
    pub deceleration_start_ratio: f64,

    /// Avoidance margins tried in order (km)
    pub margin_schedule_km: Vec<f64>,

    /// Fraction of the slope limit used to size the spiral exit altitude
    pub spiral_exit_slope_factor: f64,
    pub spiral_entry_ratio: f64,
    pub spiral_exit_ratio: f64,
    pub spiral_safety_margin_km: f64,
    /// Lowest acceptable score for a preferred spiral position
    pub spiral_min_score: f64,
    pub spiral_leads_km: Vec<f64>,
    pub spiral_grid_turns_deg: Vec<f64>,
    pub spiral_grid_leads_km: Vec<f64>,
    pub spiral_emergency_turns_deg: Vec<f64>,
    pub spiral_emergency_leads_km: Vec<f64>,

    /// Numerical tolerance on the slope guard (degrees)
    pub slope_tolerance_deg: f64,
}

impl Default for PlannerRules {
    fn default() -> Self {
        Self {
            vertical_threshold_km: 0.1,
            degenerate_axis_km: 0.1,
            endpoint_tolerance_km: 1e-3,
            straight_points_per_km: 100.0,
            arc_points_per_turn: 720.0,
            vertical_points_per_km: 200.0,
            min_vertical_points: 300,
            min_trajectory_points: 10,
            vertical_speed_kmh: 10.0,
            transition_ratio: 0.5,
            min_transition_km: 3.0,
            max_transition_km: 12.0,
            degraded_transition_ratio: 0.3,
            alignment_tolerance_deg: 2.0,
            alignment_offset_km: 0.05,
            turn_radius_factors: vec![1.0, 1.25, 1.5, 2.0],
            turn_radius_tolerance: 0.02,
            initial_leg_ratio: 0.2,
            min_initial_leg_km: 1.0,
            max_initial_leg_km: 5.0,
            bezier_handle_ratio: 0.35,
            deceleration_start_ratio: 0.33,
            margin_schedule_km: vec![0.5, 1.0, 1.5, 2.5, 4.0],
            spiral_exit_slope_factor: 0.9,
            spiral_entry_ratio: 0.15,
            spiral_exit_ratio: 0.15,
            spiral_safety_margin_km: 0.5,
            spiral_min_score: 0.5,
            spiral_leads_km: vec![0.0, 1.0, 2.0, 4.0],
            spiral_grid_turns_deg: vec![-90.0, -60.0, -30.0, 0.0, 30.0, 60.0, 90.0],
            spiral_grid_leads_km: vec![1.0, 2.0, 4.0, 6.0, 8.0, 12.0],
            spiral_emergency_turns_deg: vec![-150.0, -120.0, 120.0, 150.0, 180.0],
            spiral_emergency_leads_km: vec![2.0, 5.0, 10.0, 15.0],
            slope_tolerance_deg: 1e-6,
        }
    }
}

impl PlannerRules {
    /// Margins actually tried, capped at [`MAX_AVOIDANCE_ATTEMPTS`].
    pub fn avoidance_margins(&self) -> &[f64] {
        let count = self.margin_schedule_km.len().min(MAX_AVOIDANCE_ATTEMPTS);
        &self.margin_schedule_km[..count]
    }

    /// Validate rule values.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("vertical_threshold_km", self.vertical_threshold_km),
            ("straight_points_per_km", self.straight_points_per_km),
            ("arc_points_per_turn", self.arc_points_per_turn),
            ("vertical_points_per_km", self.vertical_points_per_km),
            ("vertical_speed_kmh", self.vertical_speed_kmh),
            ("bezier_handle_ratio", self.bezier_handle_ratio),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{name} must be positive (got {value})"));
            }
        }

        for (name, value) in [
            ("alignment_tolerance_deg", self.alignment_tolerance_deg),
            ("alignment_offset_km", self.alignment_offset_km),
            ("min_initial_leg_km", self.min_initial_leg_km),
            ("max_initial_leg_km", self.max_initial_leg_km),
            ("spiral_min_score", self.spiral_min_score),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!("{name} must be finite and non-negative (got {value})"));
            }
        }

        if self.min_initial_leg_km > self.max_initial_leg_km {
            errors.push(format!(
                "min_initial_leg_km ({}) must not exceed max_initial_leg_km ({})",
                self.min_initial_leg_km, self.max_initial_leg_km
            ));
        }
        if self.min_vertical_points < 2 {
            errors.push("min_vertical_points must be at least 2".to_string());
        }
        if !(0.0..1.0).contains(&self.turn_radius_tolerance) {
            errors.push("turn_radius_tolerance must be within [0, 1)".to_string());
        }
        if self.min_transition_km > self.max_transition_km {
            errors.push(format!(
                "min_transition_km ({}) must not exceed max_transition_km ({})",
                self.min_transition_km, self.max_transition_km
            ));
        }
        if !(0.0..1.0).contains(&self.degraded_transition_ratio) {
            errors.push("degraded_transition_ratio must be within [0, 1)".to_string());
        }
        if !(0.0..1.0).contains(&self.deceleration_start_ratio) {
            errors.push("deceleration_start_ratio must be within [0, 1)".to_string());
        }
        if self.spiral_entry_ratio + self.spiral_exit_ratio >= 1.0 {
            errors.push("spiral entry and exit ramps must leave room for a steady descent".to_string());
        }
        if !(self.spiral_exit_slope_factor > 0.0 && self.spiral_exit_slope_factor <= 1.0) {
            errors.push("spiral_exit_slope_factor must be within (0, 1]".to_string());
        }
        if self.margin_schedule_km.is_empty() {
            errors.push("margin_schedule_km must list at least one margin".to_string());
        }
        if self.margin_schedule_km.iter().any(|m| !(m.is_finite() && *m >= 0.0)) {
            errors.push("avoidance margins cannot be negative".to_string());
        }
        if self.turn_radius_factors.iter().any(|f| !(f.is_finite() && *f >= 1.0)) {
            errors.push("turn_radius_factors must all be at least 1.0".to_string());
        }
        if self.min_trajectory_points < 2 {
            errors.push("min_trajectory_points must be at least 2".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let rules = PlannerRules::default();
        assert!(rules.is_valid(), "{:?}", rules.validate());
        assert_eq!(rules.avoidance_margins().len(), 5);
    }

    #[test]
    fn margin_schedule_is_capped() {
        let rules = PlannerRules {
            margin_schedule_km: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7],
            ..PlannerRules::default()
        };
        assert_eq!(rules.avoidance_margins(), &[0.1, 0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let rules: PlannerRules =
            serde_json::from_str(r#"{ "margin_schedule_km": [1.0, 2.0] }"#).expect("parse");
        assert_eq!(rules.margin_schedule_km, vec![1.0, 2.0]);
        assert_eq!(rules.arc_points_per_turn, 720.0);
    }

    #[test]
    fn bad_values_are_reported() {
        let rules = PlannerRules {
            spiral_entry_ratio: 0.6,
            spiral_exit_ratio: 0.5,
            margin_schedule_km: Vec::new(),
            ..PlannerRules::default()
        };
        assert_eq!(rules.validate().len(), 2);
    }

    #[test]
    fn inverted_or_degenerate_bounds_are_reported() {
        let rules = PlannerRules {
            min_initial_leg_km: 8.0,
            max_initial_leg_km: 5.0,
            min_vertical_points: 0,
            ..PlannerRules::default()
        };
        let errors = rules.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.starts_with("min_initial_leg_km")));
        assert!(errors.iter().any(|e| e.starts_with("min_vertical_points")));

        let rules = PlannerRules {
            alignment_offset_km: f64::NAN,
            spiral_min_score: f64::INFINITY,
            max_initial_leg_km: -1.0,
            turn_radius_tolerance: 1.0,
            ..PlannerRules::default()
        };
        let errors = rules.validate();
        assert!(errors.iter().any(|e| e.starts_with("alignment_offset_km")));
        assert!(errors.iter().any(|e| e.starts_with("spiral_min_score")));
        assert!(errors.iter().any(|e| e.starts_with("max_initial_leg_km")));
        assert!(errors.iter().any(|e| e.starts_with("turn_radius_tolerance")));
    }
}
