//! Scenario files.
//!
//! Same layout as the interactive tool's saved configuration:
//!
//! ```json
//! {
//!   "environment": { "size_x": 50, "size_y": 50, "size_z": 5,
//!                    "airport": { "x": 5, "y": 25, "z": 0 },
//!                    "faf": { "x": 20, "y": 25, "z": 1 } },
//!   "cylinders": [ { "x": 30, "y": 25, "radius": 2, "height": 3 } ],
//!   "aircraft": { "type": "light", "position": { "x": 40, "y": 10, "z": 3 },
//!                 "speed": 180, "heading": 270 }
//! }
//! ```

use anyhow::{Context, Result};
use faf_core::{
    plan_with_rules, AircraftClass, AircraftProfile, Environment, Obstacle, PlanError, PlanOutcome, PlannerRules, Pose,
    Vec3,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub environment: EnvironmentSection,
    #[serde(default)]
    pub cylinders: Vec<Obstacle>,
    pub aircraft: AircraftSection,
}

/// Airspace box plus the airport and FAF positions (km).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSection {
    #[serde(default = "default_size_xy")]
    pub size_x: f64,
    #[serde(default = "default_size_xy")]
    pub size_y: f64,
    #[serde(default = "default_size_z")]
    pub size_z: f64,
    pub airport: Vec3,
    pub faf: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSection {
    /// Class name; unknown names fall back to the default class
    #[serde(rename = "type", default)]
    pub class_name: String,
    pub position: Vec3,
    /// Ground speed (km/h); the class cruise speed when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: f64,
}

fn default_size_xy() -> f64 {
    50.0
}

fn default_size_z() -> f64 {
    5.0
}

/// Everything one planner call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInputs {
    pub name: String,
    pub pose: Pose,
    pub aircraft: AircraftProfile,
    pub environment: Environment,
    pub obstacles: Vec<Obstacle>,
}

impl PlanInputs {
    pub fn plan(&self, rules: &PlannerRules) -> Result<PlanOutcome, PlanError> {
        plan_with_rules(&self.pose, &self.aircraft, &self.environment, &self.obstacles, rules)
    }
}

impl ScenarioFile {
    pub fn new(
        name: impl Into<String>,
        class: AircraftClass,
        pose: Pose,
        environment: Environment,
        cylinders: Vec<Obstacle>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            environment: EnvironmentSection {
                size_x: default_size_xy(),
                size_y: default_size_xy(),
                size_z: default_size_z(),
                airport: environment.airport,
                faf: environment.faf,
            },
            cylinders,
            aircraft: AircraftSection {
                class_name: class.as_str().to_string(),
                position: pose.position,
                speed: Some(pose.speed_kmh),
                heading: pose.heading_deg,
            },
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse scenario JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let mut scenario = Self::from_json(&text).with_context(|| format!("Invalid scenario {}", path.display()))?;
        if scenario.name.is_none() {
            scenario.name = path.file_stem().map(|stem| stem.to_string_lossy().into_owned());
        }
        Ok(scenario)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize scenario")
    }

    pub fn aircraft_class(&self) -> AircraftClass {
        let class = AircraftClass::parse_or_default(&self.aircraft.class_name);
        if class.as_str() != self.aircraft.class_name.trim().to_ascii_lowercase() {
            warn!(requested = %self.aircraft.class_name, using = %class, "unknown aircraft class");
        }
        class
    }

    pub fn to_inputs(&self) -> PlanInputs {
        let aircraft = self.aircraft_class().profile();
        let speed_kmh = self.aircraft.speed.unwrap_or(aircraft.cruise_speed_kmh);
        PlanInputs {
            name: self.name.clone().unwrap_or_else(|| "scenario".to_string()),
            pose: Pose::new(self.aircraft.position, self.aircraft.heading, speed_kmh),
            aircraft,
            environment: Environment::new(self.environment.airport, self.environment.faf),
            obstacles: self.cylinders.clone(),
        }
    }

    /// Positions outside the airspace box and speeds outside the class
    /// envelope. Planning still runs; these are reported to the user.
    pub fn warnings(&self) -> Vec<String> {
        let env = &self.environment;
        let mut warnings = Vec::new();
        let inside = |p: Vec3| {
            (0.0..=env.size_x).contains(&p.x) && (0.0..=env.size_y).contains(&p.y) && (0.0..=env.size_z).contains(&p.z)
        };
        if env.size_x <= 0.0 || env.size_y <= 0.0 || env.size_z <= 0.0 {
            warnings.push("Airspace dimensions must be positive".to_string());
        }
        for (label, point) in [
            ("Aircraft", self.aircraft.position),
            ("Airport", env.airport),
            ("FAF", env.faf),
        ] {
            if !inside(point) {
                warnings.push(format!(
                    "{label} position ({:.2}, {:.2}, {:.2}) outside the {} x {} x {} km airspace",
                    point.x, point.y, point.z, env.size_x, env.size_y, env.size_z
                ));
            }
        }
        let inputs = self.to_inputs();
        if !inputs.aircraft.is_speed_valid(inputs.pose.speed_kmh) {
            warnings.push(format!(
                "Speed {:.0} km/h outside the {} envelope [{:.0}, {:.0}]",
                inputs.pose.speed_kmh,
                inputs.aircraft.class,
                inputs.aircraft.min_speed_kmh,
                inputs.aircraft.max_speed_kmh
            ));
        }
        warnings
    }
}
