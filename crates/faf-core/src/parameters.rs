//! Per-point flight parameters derived from a finished trajectory.

use crate::geometry::{normalize_heading, wrap_degrees, Vec3};
use crate::models::FlightParameters;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const MIN_MOVE_KM: f64 = 1e-12;

/// Ground speed assignment along a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeedProfile {
    Constant(f64),
    PerPoint(Vec<f64>),
}

impl SpeedProfile {
    /// Expand to one speed per point. A short per-point list is padded with
    /// its last value.
    pub fn to_vec(&self, len: usize) -> Vec<f64> {
        match self {
            SpeedProfile::Constant(speed) => vec![*speed; len],
            SpeedProfile::PerPoint(speeds) => {
                let fill = speeds.last().copied().unwrap_or_default();
                (0..len).map(|i| speeds.get(i).copied().unwrap_or(fill)).collect()
            }
        }
    }

    /// Concatenate `prefix_len` points of `self` with `next`, dropping the
    /// first speed of `next` when the join point is shared.
    pub fn join(&self, prefix_len: usize, next: &SpeedProfile, next_len: usize, shared_join: bool) -> SpeedProfile {
        let mut speeds = self.to_vec(prefix_len);
        let tail = next.to_vec(next_len);
        let skip = usize::from(shared_join && !speeds.is_empty());
        speeds.extend(tail.into_iter().skip(skip));
        SpeedProfile::PerPoint(speeds)
    }
}

/// Cruise speed up to a fraction of the approach leg, then a cosine
/// deceleration reaching `approach_kmh` at the final point.
pub fn approach_speed_profile(
    points: &[Vec3],
    approach_start: usize,
    cruise_kmh: f64,
    approach_kmh: f64,
    deceleration_start_ratio: f64,
) -> SpeedProfile {
    let mut speeds = vec![cruise_kmh; points.len()];
    if approach_start + 1 >= points.len() {
        return SpeedProfile::PerPoint(speeds);
    }

    let mut cumulative = vec![0.0; points.len()];
    for i in approach_start + 1..points.len() {
        cumulative[i] = cumulative[i - 1] + points[i - 1].horizontal_distance(points[i]);
    }
    let total = cumulative[points.len() - 1];
    if total <= 0.0 {
        return SpeedProfile::PerPoint(speeds);
    }

    let hold = deceleration_start_ratio * total;
    for i in approach_start..points.len() {
        let d = cumulative[i];
        if d <= hold {
            continue;
        }
        let progress = ((d - hold) / (total - hold)).clamp(0.0, 1.0);
        let eased = (1.0 - (progress * PI).cos()) / 2.0;
        speeds[i] = cruise_kmh + eased * (approach_kmh - cruise_kmh);
    }
    SpeedProfile::PerPoint(speeds)
}

/// Derive time, slope, heading, turn rate and speed at every point.
///
/// Time steps use the 3D segment length over the mean of the endpoint speeds.
/// Zero-length moves keep the previous heading and report no turn rate.
pub fn extract(points: &[Vec3], speeds: &SpeedProfile) -> FlightParameters {
    let n = points.len();
    if n == 0 {
        return FlightParameters::default();
    }
    let speed_kmh = speeds.to_vec(n);

    let mut time_s = vec![0.0; n];
    let mut slope_deg = vec![0.0; n];
    let mut headings: Vec<Option<f64>> = vec![None; n];
    let mut total_distance_km = 0.0;

    for i in 1..n {
        let (a, b) = (points[i - 1], points[i]);
        let step = a.distance(b);
        total_distance_km += step;

        let mean_speed = 0.5 * (speed_kmh[i - 1] + speed_kmh[i]);
        let dt = if mean_speed > 0.0 && step > 0.0 {
            step / mean_speed * 3600.0
        } else {
            0.0
        };
        time_s[i] = time_s[i - 1] + dt;

        let dz = b.z - a.z;
        let dh = a.horizontal_distance(b);
        slope_deg[i] = if dh > MIN_MOVE_KM {
            dz.atan2(dh).to_degrees()
        } else if dz.abs() > MIN_MOVE_KM {
            90f64.copysign(dz)
        } else {
            0.0
        };
        if dh > MIN_MOVE_KM {
            headings[i] = Some(normalize_heading((b.x - a.x).atan2(b.y - a.y).to_degrees()));
        }
    }

    // Carry headings across zero-length moves; leading gaps take the first known one
    let first_known = headings.iter().flatten().next().copied().unwrap_or(0.0);
    let mut heading_deg = Vec::with_capacity(n);
    let mut current = first_known;
    for heading in headings {
        if let Some(h) = heading {
            current = h;
        }
        heading_deg.push(current);
    }

    let mut turn_rate_deg_s = vec![0.0; n];
    for i in 1..n {
        let dt = time_s[i] - time_s[i - 1];
        if dt > 0.0 {
            turn_rate_deg_s[i] = wrap_degrees(heading_deg[i] - heading_deg[i - 1]) / dt;
        }
    }

    if n > 1 {
        slope_deg[0] = slope_deg[1];
        turn_rate_deg_s[0] = turn_rate_deg_s[1];
    }

    FlightParameters {
        altitude_km: points.iter().map(|p| p.z).collect(),
        flight_time_s: time_s[n - 1],
        time_s,
        slope_deg,
        heading_deg,
        turn_rate_deg_s,
        speed_kmh,
        total_distance_km,
    }
}
