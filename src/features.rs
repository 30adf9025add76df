//! Feature derivation for model inputs.
//!
//! Converts an ordered storm observation history into the raw plus derived
//! feature rows the forecast models consume. Every derivation is causal:
//! a row only uses observations at or before its own time.
//!
//! **Critical for correctness**: derived values must match the training
//! pipeline exactly to avoid train/serve skew. The model vector ordering and
//! index constants below are fixed by the trained scaler.

use crate::track::Observation;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Width of the model input vector.
pub const MODEL_FEATURE_COUNT: usize = 11;

/// Scaler-space index of latitude.
pub const LAT_INDEX: usize = 0;

/// Scaler-space index of longitude.
pub const LON_INDEX: usize = 1;

/// Scaler-space index of running-maximum wind.
pub const WIND_INDEX: usize = 2;

/// Hours per observation interval in the reference deployment.
pub const INTERVAL_HOURS: f64 = 6.0;

/// One observation together with its derived features.
///
/// Rows are derived fresh on every inference call and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub time: DateTime<Utc>,
    pub wind: f64,
    pub lat: f64,
    pub lon: f64,
    pub pressure: f64,
    /// Maximum wind up to and including this observation.
    pub max_wind: f64,
    /// Change in running-maximum wind over the lag window, per six-hour
    /// interval.
    pub delta_wind: f64,
    /// Minimum pressure up to and including this observation.
    pub min_pressure: f64,
    /// Latitudinal rate of motion over the lag window, degrees per hour.
    pub zonal_speed: f64,
    /// Longitudinal rate of motion over the lag window, degrees per hour.
    pub meridional_speed: f64,
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub hour: f64,
}

impl FeatureRow {
    /// Model input vector in the fixed training order.
    pub fn to_model_vector(&self) -> [f64; MODEL_FEATURE_COUNT] {
        [
            self.lat,
            self.lon,
            self.max_wind,
            self.delta_wind,
            self.min_pressure,
            self.zonal_speed,
            self.meridional_speed,
            self.year,
            self.month,
            self.day,
            self.hour,
        ]
    }
}

/// Derive the feature table for one storm.
///
/// `lag` is the number of observation intervals used as the lookback window
/// for the rate-of-change features. The first `lag` rows have no lag history
/// and are excluded, so the output holds at most `observations.len() - lag`
/// rows and never contains undefined values. Fewer than `lag + 1`
/// observations produce an empty table; callers treat that as insufficient
/// data for the storm, not as an error.
pub fn derive_features(observations: &[Observation], lag: usize) -> Vec<FeatureRow> {
    let mut obs: Vec<Observation> = observations.to_vec();
    obs.sort_by_key(|o| o.time);

    let n = obs.len();
    if n <= lag {
        return Vec::new();
    }

    // Running extrema up to each observation.
    let mut max_wind = vec![0.0; n];
    let mut min_pressure = vec![0.0; n];
    let mut wind_high = f64::NEG_INFINITY;
    let mut pressure_low = f64::INFINITY;
    for (i, o) in obs.iter().enumerate() {
        wind_high = wind_high.max(o.wind);
        pressure_low = pressure_low.min(o.pressure);
        max_wind[i] = wind_high;
        min_pressure[i] = pressure_low;
    }

    let mut rows = Vec::with_capacity(n - lag);
    for i in lag..n {
        let current = &obs[i];
        let lagged = &obs[i - lag];

        let elapsed_hours = (current.time - lagged.time).num_seconds() as f64 / 3600.0;
        if elapsed_hours <= 0.0 {
            // Zero elapsed time leaves the rate features undefined; the row
            // is dropped rather than emitted with NaN.
            debug!(time = %current.time, "dropping feature row with zero-length lag interval");
            continue;
        }

        rows.push(FeatureRow {
            time: current.time,
            wind: current.wind,
            lat: current.lat,
            lon: current.lon,
            pressure: current.pressure,
            max_wind: max_wind[i],
            delta_wind: (max_wind[i] - max_wind[i - lag]) / (elapsed_hours / INTERVAL_HOURS),
            min_pressure: min_pressure[i],
            zonal_speed: (current.lat - lagged.lat) / elapsed_hours,
            meridional_speed: (current.lon - lagged.lon) / elapsed_hours,
            year: current.time.year() as f64,
            month: current.time.month() as f64,
            day: current.time.day() as f64,
            hour: current.time.hour() as f64,
        });
    }

    rows
}
