//! Inference orchestration.
//!
//! Assembles per-storm feature windows, invokes the forecast model, and
//! organizes descaled outputs per horizon. Single-pass mode forecasts from
//! the most recent observation; batch mode repeats the same pass at every
//! eligible anchor timestamp in the storm's history. Both modes share one
//! code path.

use crate::features::derive_features;
use crate::model::{HorizonPredictor, StepForecast};
use crate::track::StormTrack;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Orchestration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Observation intervals used as the derived-feature lookback window.
    pub lag: usize,
    /// Forecast horizons to report, in hours from the anchor.
    pub horizons: Vec<i64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lag: 5,
            horizons: vec![6, 12, 24, 36, 48],
        }
    }
}

impl ForecastConfig {
    /// Minimum observation count before a storm is forecast at all.
    pub fn min_observations(&self) -> usize {
        self.lag + 1
    }
}

/// Observed values at a forecast valid time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValues {
    pub wind: f64,
    pub lat: f64,
    pub lon: f64,
}

/// One reported horizon of a forecast issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonForecast {
    pub horizon_hours: i64,
    pub valid_time: DateTime<Utc>,
    pub forecast: StepForecast,
    /// Ground truth at the valid time, when the track contains it.
    pub truth: Option<TruthValues>,
}

impl HorizonForecast {
    /// Truth minus forecast wind, when truth is available.
    pub fn wind_error(&self) -> Option<f64> {
        self.truth.map(|t| t.wind - self.forecast.wind)
    }

    pub fn lat_error(&self) -> Option<f64> {
        self.truth.map(|t| t.lat - self.forecast.lat)
    }

    pub fn lon_error(&self) -> Option<f64> {
        self.truth.map(|t| t.lon - self.forecast.lon)
    }
}

/// A complete forecast for one storm at one issuance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormForecast {
    pub storm_id: String,
    pub anchor_time: DateTime<Utc>,
    pub horizons: Vec<HorizonForecast>,
}

/// Single-pass inference anchored at the storm's most recent observation.
///
/// Storms with fewer than `lag + 1` observations are reported as
/// [`Error::InsufficientData`]; callers skip them without touching the
/// model.
pub fn forecast_storm<P: HorizonPredictor>(
    track: &StormTrack,
    predictor: &mut P,
    config: &ForecastConfig,
) -> Result<StormForecast> {
    forecast_at(track, track.len(), predictor, config)
}

/// Single-pass inference over the observation prefix of length `take`,
/// with truth looked up against the full track.
fn forecast_at<P: HorizonPredictor>(
    track: &StormTrack,
    take: usize,
    predictor: &mut P,
    config: &ForecastConfig,
) -> Result<StormForecast> {
    let observations = &track.observations()[..take];
    if observations.len() < config.min_observations() {
        return Err(Error::InsufficientData {
            storm: track.id.clone(),
            observations: observations.len(),
            required: config.min_observations(),
        });
    }

    let rows = derive_features(observations, config.lag);
    let Some(last_row) = rows.last() else {
        // Enough observations on paper, but every lag interval degenerated.
        return Err(Error::InsufficientData {
            storm: track.id.clone(),
            observations: observations.len(),
            required: config.min_observations(),
        });
    };
    let anchor_time = last_row.time;

    let steps = predictor.predict(&rows)?;
    if steps.len() < config.horizons.len() {
        debug!(
            storm = %track.id,
            emitted = steps.len(),
            requested = config.horizons.len(),
            "model emits fewer steps than requested horizons"
        );
    }

    let horizons = config
        .horizons
        .iter()
        .zip(steps)
        .map(|(&horizon_hours, forecast)| {
            let valid_time = anchor_time + Duration::hours(horizon_hours);
            let truth = track.observation_at(valid_time).map(|o| TruthValues {
                wind: o.wind,
                lat: o.lat,
                lon: o.lon,
            });
            HorizonForecast {
                horizon_hours,
                valid_time,
                forecast,
                truth,
            }
        })
        .collect();

    Ok(StormForecast {
        storm_id: track.id.clone(),
        anchor_time,
        horizons,
    })
}

/// Batch inference: one independent single pass per eligible anchor.
///
/// An anchor is eligible when the observation prefix through it derives at
/// least one feature row. Calls share nothing but the model handle, and the
/// underlying session is released with the handle, so memory stays bounded
/// over the batch.
pub fn forecast_all_anchors<P: HorizonPredictor>(
    track: &StormTrack,
    predictor: &mut P,
    config: &ForecastConfig,
) -> Result<BTreeMap<DateTime<Utc>, StormForecast>> {
    if track.len() < config.min_observations() {
        return Err(Error::InsufficientData {
            storm: track.id.clone(),
            observations: track.len(),
            required: config.min_observations(),
        });
    }

    let mut results = BTreeMap::new();
    for take in config.min_observations()..=track.len() {
        match forecast_at(track, take, predictor, config) {
            Ok(forecast) => {
                results.insert(forecast.anchor_time, forecast);
            }
            Err(Error::InsufficientData { .. }) => {
                // A degenerate prefix skips its anchor, not the storm.
                debug!(storm = %track.id, take, "skipping anchor without derivable features");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(results)
}

/// Storm skipped during a multi-storm run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedStorm {
    pub storm_id: String,
    pub reason: String,
}

/// Outcome of a multi-storm run: completed forecasts plus the skip list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FleetOutcome {
    pub forecasts: Vec<StormForecast>,
    pub skipped: Vec<SkippedStorm>,
}

/// Run single-pass inference across a set of storms.
///
/// Storms with insufficient history are logged and recorded as skipped;
/// they never stop the batch. Artifact and session failures abort the run.
pub fn forecast_fleet<P: HorizonPredictor>(
    tracks: &[StormTrack],
    predictor: &mut P,
    config: &ForecastConfig,
) -> Result<FleetOutcome> {
    let mut outcome = FleetOutcome::default();
    for track in tracks {
        match forecast_storm(track, predictor, config) {
            Ok(forecast) => outcome.forecasts.push(forecast),
            Err(e @ Error::InsufficientData { .. }) => {
                warn!(storm = %track.id, name = %track.name, "skipping storm: {e}");
                outcome.skipped.push(SkippedStorm {
                    storm_id: track.id.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}
