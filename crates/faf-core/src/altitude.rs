//! Altitude as a function of horizontal distance flown.
//!
//! A profile has three consecutive phases: a level segment at the starting
//! altitude, a transition in which the slope eases from zero to the working
//! rate, and a constant-slope segment that ends exactly on the target
//! altitude. The transition shapes the *slope* with a septic ease so the
//! altitude stays C¹ at both phase boundaries and the slope never exceeds the
//! working rate anywhere.

use crate::geometry::{ease7, ease7_integral, HorizontalPath, Vec3};
use crate::models::AircraftProfile;
use crate::rules::PlannerRules;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudePhase {
    Level,
    Transition,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeProfile {
    pub start_km: f64,
    pub target_km: f64,
    /// Horizontal distance the profile spans
    pub distance_km: f64,
    pub level_km: f64,
    pub transition_km: f64,
    pub constant_km: f64,
    /// Working slope as rise over run (magnitude)
    pub rate: f64,
    /// Slope limit the profile was built against (rise over run)
    pub limit_rate: f64,
    /// Set when the level segment was dropped to fit the distance
    pub degraded: bool,
}

impl AltitudeProfile {
    /// Build a profile between two altitudes over `distance_km`, never steeper
    /// than `max_slope_deg` when the distance allows it.
    pub fn new(start_km: f64, target_km: f64, distance_km: f64, max_slope_deg: f64, rules: &PlannerRules) -> Self {
        let height = (target_km - start_km).abs();
        let distance = distance_km.max(0.0);
        let limit_rate = max_slope_deg.abs().to_radians().tan();

        let mut profile = Self {
            start_km,
            target_km,
            distance_km: distance,
            level_km: distance,
            transition_km: 0.0,
            constant_km: 0.0,
            rate: 0.0,
            limit_rate,
            degraded: false,
        };
        if height < 1e-12 || distance < 1e-12 {
            profile.degraded = height >= 1e-12;
            return profile;
        }

        let sloped = if limit_rate > 0.0 { height / limit_rate } else { f64::INFINITY };
        let nominal_transition = (sloped * rules.transition_ratio)
            .clamp(rules.min_transition_km, rules.max_transition_km)
            .min(sloped);

        if sloped + nominal_transition < distance {
            profile.transition_km = nominal_transition;
            profile.constant_km = sloped - nominal_transition / 2.0;
            profile.level_km = distance - nominal_transition - profile.constant_km;
        } else {
            // Not enough room for a level segment: compress the transition so
            // the working slope stays within the limit whenever possible.
            let transition = (rules.degraded_transition_ratio * distance)
                .min(2.0 * (distance - sloped))
                .max(0.0);
            profile.level_km = 0.0;
            profile.transition_km = transition;
            profile.constant_km = distance - transition;
            profile.degraded = true;
        }
        profile.rate = height / (profile.constant_km + profile.transition_km / 2.0);
        profile
    }

    /// Profile using the aircraft's climb or descent limit as appropriate.
    pub fn for_aircraft(
        start_km: f64,
        target_km: f64,
        distance_km: f64,
        aircraft: &AircraftProfile,
        rules: &PlannerRules,
    ) -> Self {
        let climbing = target_km > start_km;
        Self::new(start_km, target_km, distance_km, aircraft.slope_limit_deg(climbing), rules)
    }

    /// +1 for a climb, -1 for a descent, 0 when level.
    pub fn direction(&self) -> f64 {
        let delta = self.target_km - self.start_km;
        if delta.abs() < 1e-12 {
            0.0
        } else {
            delta.signum()
        }
    }

    /// True when the working slope stays within the limit it was built for.
    pub fn within_limit(&self) -> bool {
        self.rate <= self.limit_rate * (1.0 + 1e-12)
    }

    pub fn phase_at(&self, distance_km: f64) -> AltitudePhase {
        let d = distance_km.clamp(0.0, self.distance_km);
        if self.rate == 0.0 || d < self.level_km {
            AltitudePhase::Level
        } else if d < self.level_km + self.transition_km {
            AltitudePhase::Transition
        } else {
            AltitudePhase::Constant
        }
    }

    pub fn altitude_at(&self, distance_km: f64) -> f64 {
        let direction = self.direction();
        if direction == 0.0 {
            return self.start_km;
        }
        if self.distance_km <= 0.0 {
            return self.target_km;
        }
        let d = distance_km.clamp(0.0, self.distance_km);
        match self.phase_at(d) {
            AltitudePhase::Level => self.start_km,
            AltitudePhase::Transition => {
                let t = (d - self.level_km) / self.transition_km;
                self.start_km + direction * self.rate * self.transition_km * ease7_integral(t)
            }
            // Measured back from the end so the profile lands on the target exactly
            AltitudePhase::Constant => self.target_km - direction * self.rate * (self.distance_km - d),
        }
    }

    /// Signed slope (rise over run) at `distance_km`.
    pub fn slope_at(&self, distance_km: f64) -> f64 {
        let d = distance_km.clamp(0.0, self.distance_km);
        let direction = self.direction();
        match self.phase_at(d) {
            AltitudePhase::Level => 0.0,
            AltitudePhase::Transition => {
                let t = (d - self.level_km) / self.transition_km;
                direction * self.rate * ease7(t)
            }
            AltitudePhase::Constant => direction * self.rate,
        }
    }

    pub fn slope_deg_at(&self, distance_km: f64) -> f64 {
        self.slope_at(distance_km).atan().to_degrees()
    }

    /// Lift a horizontal path into 3D using cumulative distance along it.
    pub fn apply(&self, path: &HorizontalPath) -> Vec<Vec3> {
        let cumulative = path.cumulative_distances();
        let mut points: Vec<Vec3> = path
            .points()
            .iter()
            .zip(cumulative)
            .map(|(p, d)| p.with_altitude(self.altitude_at(d)))
            .collect();
        if let Some(last) = points.last_mut() {
            last.z = self.target_km;
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descent(start: f64, target: f64, distance: f64, slope_deg: f64) -> AltitudeProfile {
        AltitudeProfile::new(start, target, distance, slope_deg, &PlannerRules::default())
    }

    fn max_sampled_slope(profile: &AltitudeProfile) -> f64 {
        let steps = 20_000;
        let dx = profile.distance_km / steps as f64;
        (0..steps)
            .map(|i| {
                let a = profile.altitude_at(i as f64 * dx);
                let b = profile.altitude_at((i + 1) as f64 * dx);
                (b - a).abs() / dx
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn long_descent_has_three_phases() {
        let profile = descent(3.0, 1.0, 60.0, 6.0);
        assert!(!profile.degraded);
        assert!(profile.level_km > 0.0 && profile.transition_km > 0.0);
        assert_eq!(profile.altitude_at(0.0), 3.0);
        assert_eq!(profile.altitude_at(60.0), 1.0);
        assert_eq!(profile.phase_at(1.0), AltitudePhase::Level);
        assert!((profile.rate - 6f64.to_radians().tan()).abs() < 1e-12);
        assert!(max_sampled_slope(&profile) <= profile.limit_rate + 1e-9);
    }

    #[test]
    fn altitude_is_continuous_at_phase_boundaries() {
        let profile = descent(4.0, 1.0, 50.0, 6.0);
        for boundary in [profile.level_km, profile.level_km + profile.transition_km] {
            let before = profile.altitude_at(boundary - 1e-7);
            let after = profile.altitude_at(boundary + 1e-7);
            assert!((before - after).abs() < 1e-6, "jump at {boundary}: {before} vs {after}");
            let slope_before = profile.slope_at(boundary - 1e-7);
            let slope_after = profile.slope_at(boundary + 1e-7);
            assert!((slope_before - slope_after).abs() < 1e-5);
        }
    }

    #[test]
    fn short_distance_degrades_without_exceeding_limit() {
        // 2 km at 10° needs ~11.3 km; 13 km is enough but leaves no level segment
        let profile = descent(3.0, 1.0, 13.0, 10.0);
        assert!(profile.degraded);
        assert_eq!(profile.level_km, 0.0);
        assert!(profile.within_limit());
        assert!(max_sampled_slope(&profile) <= profile.limit_rate + 1e-9);
        assert!((profile.altitude_at(13.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn impossible_distance_is_flagged() {
        let profile = descent(3.0, 1.0, 5.0, 6.0);
        assert!(profile.degraded);
        assert!(!profile.within_limit());
        assert!((profile.altitude_at(0.0) - 3.0).abs() < 1e-9);
        assert_eq!(profile.altitude_at(5.0), 1.0);
    }

    #[test]
    fn climbs_mirror_descents() {
        let profile = AltitudeProfile::for_aircraft(
            1.0,
            2.0,
            40.0,
            &AircraftProfile::default(),
            &PlannerRules::default(),
        );
        assert_eq!(profile.direction(), 1.0);
        assert!(profile.slope_at(39.0) > 0.0);
        assert!((profile.limit_rate - 10f64.to_radians().tan()).abs() < 1e-12);
        let mid = profile.altitude_at(20.0);
        assert!((1.0..=2.0).contains(&mid));
    }

    #[test]
    fn level_profile_holds_altitude() {
        let profile = descent(2.0, 2.0, 10.0, 6.0);
        assert_eq!(profile.altitude_at(5.0), 2.0);
        assert_eq!(profile.slope_at(5.0), 0.0);
        assert!(!profile.degraded);
    }
}
