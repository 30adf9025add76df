//! Storm track containers for inference input.
//!
//! Holds the ordered observation history for one storm along with the
//! sufficiency checks run before any feature derivation. Tracks are
//! append-only inputs produced by an external ingestion collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statute miles per hour in one knot.
///
/// Live feeds report sustained wind in mph; archives report knots. All wind
/// values inside this crate are knots, and this constant is the single
/// conversion point.
pub const MPH_PER_KNOT: f64 = 1.151;

/// A single track observation.
///
/// Units: wind in knots, coordinates in decimal degrees, barometric
/// pressure in millibars. Immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub wind: f64,
    pub lat: f64,
    pub lon: f64,
    pub pressure: f64,
}

impl Observation {
    /// Build an observation whose wind is already in knots.
    pub fn new(time: DateTime<Utc>, wind: f64, lat: f64, lon: f64, pressure: f64) -> Self {
        Self {
            time,
            wind,
            lat,
            lon,
            pressure,
        }
    }

    /// Build an observation from a feed reporting wind in mph.
    ///
    /// Feeds that already report knots must use [`Observation::new`]; no
    /// other code converts units.
    pub fn from_mph_wind(
        time: DateTime<Utc>,
        wind_mph: f64,
        lat: f64,
        lon: f64,
        pressure: f64,
    ) -> Self {
        Self::new(time, wind_mph / MPH_PER_KNOT, lat, lon, pressure)
    }
}

#[derive(Deserialize)]
struct RawTrack {
    id: String,
    name: String,
    observations: Vec<Observation>,
}

impl From<RawTrack> for StormTrack {
    fn from(raw: RawTrack) -> Self {
        StormTrack::new(raw.id, raw.name, raw.observations)
    }
}

/// The full observation history for one storm, ordered by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawTrack")]
pub struct StormTrack {
    pub id: String,
    pub name: String,
    observations: Vec<Observation>,
}

impl StormTrack {
    /// Create a track, sorting the observations by time.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mut observations: Vec<Observation>,
    ) -> Self {
        observations.sort_by_key(|o| o.time);
        Self {
            id: id.into(),
            name: name.into(),
            observations,
        }
    }

    /// Append an observation, keeping the history ordered.
    pub fn push(&mut self, observation: Observation) {
        let idx = self
            .observations
            .partition_point(|o| o.time <= observation.time);
        self.observations.insert(idx, observation);
    }

    /// The observation history, oldest to newest.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations in the track.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if the track holds no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Check whether the track holds enough history for inference.
    pub fn has_sufficient_data(&self, min_observations: usize) -> bool {
        self.observations.len() >= min_observations
    }

    /// The observation at an exact timestamp, if the track contains one.
    pub fn observation_at(&self, time: DateTime<Utc>) -> Option<&Observation> {
        self.observations.iter().find(|o| o.time == time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 9, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_new_sorts_by_time() {
        let track = StormTrack::new(
            "al202020",
            "TEST",
            vec![
                Observation::new(ts(12), 40.0, 21.0, -60.0, 990.0),
                Observation::new(ts(0), 30.0, 20.0, -59.0, 1000.0),
                Observation::new(ts(6), 35.0, 20.5, -59.5, 995.0),
            ],
        );

        let times: Vec<_> = track.observations().iter().map(|o| o.time).collect();
        assert_eq!(times, vec![ts(0), ts(6), ts(12)]);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut track = StormTrack::new(
            "al202020",
            "TEST",
            vec![
                Observation::new(ts(0), 30.0, 20.0, -59.0, 1000.0),
                Observation::new(ts(12), 40.0, 21.0, -60.0, 990.0),
            ],
        );
        track.push(Observation::new(ts(6), 35.0, 20.5, -59.5, 995.0));

        let winds: Vec<_> = track.observations().iter().map(|o| o.wind).collect();
        assert_eq!(winds, vec![30.0, 35.0, 40.0]);
    }

    #[test]
    fn test_has_sufficient_data() {
        let track = StormTrack::new(
            "al202020",
            "TEST",
            vec![
                Observation::new(ts(0), 30.0, 20.0, -59.0, 1000.0),
                Observation::new(ts(6), 35.0, 20.5, -59.5, 995.0),
            ],
        );

        assert!(track.has_sufficient_data(2));
        assert!(!track.has_sufficient_data(3));
    }

    #[test]
    fn test_mph_conversion_single_sourced() {
        let obs = Observation::from_mph_wind(ts(0), 60.0 * MPH_PER_KNOT, 20.0, -59.0, 1000.0);
        assert!((obs.wind - 60.0).abs() < 1e-10);
    }

    #[test]
    fn test_observation_at() {
        let track = StormTrack::new(
            "al202020",
            "TEST",
            vec![
                Observation::new(ts(0), 30.0, 20.0, -59.0, 1000.0),
                Observation::new(ts(6), 35.0, 20.5, -59.5, 995.0),
            ],
        );

        assert_eq!(track.observation_at(ts(6)).map(|o| o.wind), Some(35.0));
        assert!(track.observation_at(ts(3)).is_none());
    }

    #[test]
    fn test_deserialized_track_is_sorted() {
        let json = r#"{
            "id": "al202020",
            "name": "TEST",
            "observations": [
                {"time": "2020-09-15T06:00:00Z", "wind": 35.0, "lat": 20.5, "lon": -59.5, "pressure": 995.0},
                {"time": "2020-09-15T00:00:00Z", "wind": 30.0, "lat": 20.0, "lon": -59.0, "pressure": 1000.0}
            ]
        }"#;
        let track: StormTrack = serde_json::from_str(json).unwrap();

        assert_eq!(track.observations()[0].wind, 30.0);
        assert_eq!(track.observations()[1].wind, 35.0);
    }
}
