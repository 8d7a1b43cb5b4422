//! Input record types for the enrichment pipeline: raw water-temperature
//! observations as delivered by the upstream collectors, and the distinct
//! station list derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A single daily water-temperature observation from an upstream provider.
///
/// Observations are produced by the external collection step and are treated
/// as read-only inputs here. `dataset` tags the provider (e.g. "UNBC").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub dataset: String,
    pub station_id: String,
    pub date: NaiveDate,
    pub water_temp_c: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// A monitoring station, derived as the distinct (id, coordinate) pairs
/// across all observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub station_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error)]
pub enum ObservationError {
    #[error(
        "station '{station_id}' has conflicting coordinates: ({lat_a}, {lon_a}) vs ({lat_b}, {lon_b})"
    )]
    StationCoordinateConflict {
        station_id: String,
        lat_a: f64,
        lon_a: f64,
        lat_b: f64,
        lon_b: f64,
    },
}

/// Derives the distinct station list from a batch of observations.
///
/// A station id must map to exactly one coordinate pair across the whole
/// batch; a conflict means the upstream normalization is broken and is
/// surfaced as an error rather than resolved by picking one.
pub fn distinct_stations(observations: &[Observation]) -> Result<Vec<Station>, ObservationError> {
    let mut seen: HashMap<&str, (f64, f64)> = HashMap::new();
    let mut stations = Vec::new();

    for obs in observations {
        match seen.get(obs.station_id.as_str()) {
            Some(&(lat, lon)) => {
                if lat != obs.latitude || lon != obs.longitude {
                    return Err(ObservationError::StationCoordinateConflict {
                        station_id: obs.station_id.clone(),
                        lat_a: lat,
                        lon_a: lon,
                        lat_b: obs.latitude,
                        lon_b: obs.longitude,
                    });
                }
            }
            None => {
                seen.insert(obs.station_id.as_str(), (obs.latitude, obs.longitude));
                stations.push(Station {
                    station_id: obs.station_id.clone(),
                    latitude: obs.latitude,
                    longitude: obs.longitude,
                });
            }
        }
    }

    Ok(stations)
}
