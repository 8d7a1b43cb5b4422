//! The merge join: observations left-joined with extracted air temperatures
//! and watershed membership.
//!
//! The join is written over explicit typed records rather than dataframe
//! operations so its cardinality and null handling are a checkable contract:
//! every observation yields exactly one output row, and an unmatched date is
//! an absent value, never an error.

use crate::types::observation::Observation;
use crate::types::records::{AirTempRecord, MergedRecord};
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("duplicate air temperature record for station '{station_id}' on {date}")]
    DuplicateAirTemp {
        station_id: String,
        date: NaiveDate,
    },
}

/// Left-outer joins observations with air-temperature records on
/// (station_id, date) and attaches watershed membership per station.
///
/// Upstream invariants guarantee at most one air-temperature record per
/// (station, date); a duplicate means extraction went wrong and is surfaced
/// as an error rather than resolved by picking one. Output rows preserve the
/// input observation order.
pub fn merge_records(
    observations: &[Observation],
    air_temps: &[AirTempRecord],
    watershed_by_station: &HashMap<String, String>,
) -> Result<Vec<MergedRecord>, MergeError> {
    let mut air_index: HashMap<(&str, NaiveDate), (f64, bool)> =
        HashMap::with_capacity(air_temps.len());
    for record in air_temps {
        let key = (record.station_id.as_str(), record.date);
        if air_index
            .insert(key, (record.air_temp_c, record.clamped))
            .is_some()
        {
            return Err(MergeError::DuplicateAirTemp {
                station_id: record.station_id.clone(),
                date: record.date,
            });
        }
    }

    Ok(observations
        .iter()
        .map(|obs| {
            let matched = air_index.get(&(obs.station_id.as_str(), obs.date));
            MergedRecord {
                dataset: obs.dataset.clone(),
                station_id: obs.station_id.clone(),
                date: obs.date,
                water_temp_c: obs.water_temp_c,
                air_temp_c: matched.map(|&(temp, _)| temp),
                air_temp_clamped: matched.map(|&(_, clamped)| clamped).unwrap_or(false),
                watershed_id: watershed_by_station.get(&obs.station_id).cloned(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(station_id: &str, date: &str, water_temp_c: f64) -> Observation {
        Observation {
            dataset: "UNBC".to_string(),
            station_id: station_id.to_string(),
            date: date.parse().unwrap(),
            water_temp_c,
            latitude: 54.1,
            longitude: -124.5,
        }
    }

    fn air(station_id: &str, date: &str, temp: f64, clamped: bool) -> AirTempRecord {
        AirTempRecord {
            station_id: station_id.to_string(),
            date: date.parse().unwrap(),
            tile_id: 9100,
            air_temp_c: temp,
            clamped,
        }
    }

    #[test]
    fn every_observation_survives_with_water_temp_unchanged() {
        let observations = vec![
            obs("S1", "2023-06-01", 9.5),
            obs("S1", "2023-06-02", 10.2),
            obs("S2", "2023-06-01", 7.1),
        ];
        let air_temps = vec![air("S1", "2023-06-01", 17.0, false)];
        let merged = merge_records(&observations, &air_temps, &HashMap::new()).unwrap();

        assert_eq!(merged.len(), observations.len());
        for (m, o) in merged.iter().zip(&observations) {
            assert_eq!(m.station_id, o.station_id);
            assert_eq!(m.date, o.date);
            assert_eq!(m.water_temp_c, o.water_temp_c);
        }
    }

    #[test]
    fn unmatched_dates_get_absent_air_temp() {
        let observations = vec![obs("S1", "2023-06-01", 9.5), obs("S1", "2023-06-02", 10.2)];
        let air_temps = vec![air("S1", "2023-06-01", 17.0, false)];
        let merged = merge_records(&observations, &air_temps, &HashMap::new()).unwrap();

        assert_eq!(merged[0].air_temp_c, Some(17.0));
        assert_eq!(merged[1].air_temp_c, None);
        assert!(!merged[1].air_temp_clamped);
    }

    #[test]
    fn clamped_flag_is_carried_through() {
        let observations = vec![obs("S1", "2031-06-01", 11.0)];
        let air_temps = vec![air("S1", "2031-06-01", 17.0, true)];
        let merged = merge_records(&observations, &air_temps, &HashMap::new()).unwrap();
        assert_eq!(merged[0].air_temp_c, Some(17.0));
        assert!(merged[0].air_temp_clamped);
    }

    #[test]
    fn watershed_membership_is_attached_per_station() {
        let observations = vec![obs("S1", "2023-06-01", 9.5), obs("S2", "2023-06-01", 7.1)];
        let mut watersheds = HashMap::new();
        watersheds.insert("S1".to_string(), "nechako-upper".to_string());
        let merged = merge_records(&observations, &[], &watersheds).unwrap();
        assert_eq!(merged[0].watershed_id.as_deref(), Some("nechako-upper"));
        assert_eq!(merged[1].watershed_id, None);
    }

    #[test]
    fn duplicate_air_temp_records_are_a_defect() {
        let observations = vec![obs("S1", "2023-06-01", 9.5)];
        let air_temps = vec![
            air("S1", "2023-06-01", 17.0, false),
            air("S1", "2023-06-01", 16.0, false),
        ];
        let err = merge_records(&observations, &air_temps, &HashMap::new()).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateAirTemp { .. }));
    }
}
