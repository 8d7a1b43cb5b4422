//! Extraction of per-station air-temperature series from cached tile
//! artifacts, and their replication onto the requested years an artifact
//! serves.
//!
//! Tile data uses the Daymet calendar: every year has days 1..=365, leap
//! years include Feb 29 and drop Dec 31. Air temperature is the daily mean
//! of tmax and tmin.

use crate::tiles::error::ExtractionError;
use crate::tiles::locator::grid_cell;
use crate::types::records::AirTempRecord;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// The daily mean air-temperature series of one grid cell for the fetched
/// year, ready to be replicated onto requested years.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeries {
    pub tile_id: u32,
    pub fetch_year: i32,
    values: Vec<(NaiveDate, f64)>,
}

impl StationSeries {
    pub fn values(&self) -> &[(NaiveDate, f64)] {
        &self.values
    }
}

/// Pulls the station's grid-cell series out of a tile artifact.
///
/// The cell is derived from the station coordinate with the same grid math
/// that chose the tile, so an empty result means the artifact's contents
/// disagree with the tiling scheme. That is a logic defect, not missing
/// data, and it is fatal.
pub fn extract_station_series(
    frame: LazyFrame,
    tile_id: u32,
    fetch_year: i32,
    lat: f64,
    lon: f64,
) -> Result<StationSeries, ExtractionError> {
    let cell =
        grid_cell(lat, lon).ok_or(ExtractionError::CoordinateOutsideTile { tile_id, lat, lon })?;

    let df = frame
        .filter(
            col("cell_row")
                .eq(lit(i64::from(cell.row)))
                .and(col("cell_col").eq(lit(i64::from(cell.col)))),
        )
        .select([
            col("yday").cast(DataType::Int64),
            col("tmax").cast(DataType::Float64),
            col("tmin").cast(DataType::Float64),
        ])
        .collect()?;

    if df.height() == 0 {
        return Err(ExtractionError::CellNotFound {
            tile_id,
            year: fetch_year,
            cell_row: cell.row,
            cell_col: cell.col,
        });
    }

    let ydays = df.column("yday")?.i64()?;
    let tmaxs = df.column("tmax")?.f64()?;
    let tmins = df.column("tmin")?.f64()?;

    let mut values = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let Some(yday) = ydays.get(i) else { continue };
        // A masked raster value is a legitimate gap, not an error.
        let (Some(tmax), Some(tmin)) = (tmaxs.get(i), tmins.get(i)) else {
            continue;
        };
        if !(1..=365).contains(&yday) {
            return Err(ExtractionError::BadDayOfYear {
                tile_id,
                year: fetch_year,
                yday,
            });
        }
        let date = NaiveDate::from_yo_opt(fetch_year, yday as u32).ok_or(
            ExtractionError::BadDayOfYear {
                tile_id,
                year: fetch_year,
                yday,
            },
        )?;
        values.push((date, (tmax + tmin) / 2.0));
    }
    values.sort_by_key(|(date, _)| *date);

    Ok(StationSeries {
        tile_id,
        fetch_year,
        values,
    })
}

/// Materializes air-temperature records for one requested year.
///
/// When the requested year is the fetched year the series dates are used
/// directly. Otherwise the fetched series stands in as a proxy: each value
/// is re-dated onto the requested year by month and day and flagged as
/// clamped. A month/day with no counterpart in the requested year (Feb 29
/// onto a non-leap year) is skipped and simply stays unmatched in the join.
pub fn records_for_year(
    series: &StationSeries,
    station_id: &str,
    requested_year: i32,
) -> Vec<AirTempRecord> {
    let clamped = requested_year != series.fetch_year;
    series
        .values
        .iter()
        .filter_map(|&(date, air_temp_c)| {
            let target = if clamped {
                NaiveDate::from_ymd_opt(requested_year, date.month(), date.day())?
            } else {
                date
            };
            Some(AirTempRecord {
                station_id: station_id.to_string(),
                date: target,
                tile_id: series.tile_id,
                air_temp_c,
                clamped,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::locator::grid_cell;

    // Coordinate landing in cell (100, 50) of its tile.
    const LAT: f64 = 55.005;
    const LON: f64 = -125.495;
    const TILE: u32 = 10307;

    fn tile_frame(rows: &[(i64, i64, i64, f64, f64)]) -> LazyFrame {
        let cell_row: Vec<i64> = rows.iter().map(|r| r.0).collect();
        let cell_col: Vec<i64> = rows.iter().map(|r| r.1).collect();
        let yday: Vec<i64> = rows.iter().map(|r| r.2).collect();
        let tmax: Vec<f64> = rows.iter().map(|r| r.3).collect();
        let tmin: Vec<f64> = rows.iter().map(|r| r.4).collect();
        df!(
            "cell_row" => cell_row,
            "cell_col" => cell_col,
            "yday" => yday,
            "tmax" => tmax,
            "tmin" => tmin,
        )
        .unwrap()
        .lazy()
    }

    #[test]
    fn test_coordinate_maps_to_expected_cell() {
        let cell = grid_cell(LAT, LON).unwrap();
        assert_eq!((cell.row, cell.col), (100, 50));
    }

    #[test]
    fn extracts_daily_means_for_the_fetch_year() {
        // 2024 is a leap year: yday 153 is June 1.
        let frame = tile_frame(&[
            (100, 50, 153, 22.0, 12.0),
            (100, 50, 152, 20.0, 10.0),
            (99, 50, 152, -5.0, -15.0), // other cell, ignored
        ]);
        let series = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap();
        assert_eq!(
            series.values(),
            &[
                ("2024-05-31".parse().unwrap(), 15.0),
                ("2024-06-01".parse().unwrap(), 17.0),
            ]
        );
    }

    #[test]
    fn fetch_year_records_are_not_flagged() {
        let frame = tile_frame(&[(100, 50, 153, 22.0, 12.0)]);
        let series = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap();
        let records = records_for_year(&series, "S1", 2024);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "2024-06-01".parse().unwrap());
        assert_eq!(records[0].air_temp_c, 17.0);
        assert!(!records[0].clamped);
    }

    #[test]
    fn clamped_years_reuse_the_series_aligned_by_month_and_day() {
        let frame = tile_frame(&[(100, 50, 152, 20.0, 10.0), (100, 50, 153, 22.0, 12.0)]);
        let series = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap();

        for year in [2025, 2031] {
            let records = records_for_year(&series, "S1", year);
            assert_eq!(records.len(), 2);
            let june1 = records
                .iter()
                .find(|r| r.date == NaiveDate::from_ymd_opt(year, 6, 1).unwrap())
                .unwrap();
            assert_eq!(june1.air_temp_c, 17.0);
            assert!(june1.clamped);
        }
    }

    #[test]
    fn leap_day_is_skipped_for_non_leap_requested_years() {
        // yday 60 of 2024 is Feb 29.
        let frame = tile_frame(&[(100, 50, 60, 2.0, -2.0), (100, 50, 61, 4.0, 0.0)]);
        let series = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap();
        assert_eq!(series.values()[0].0, "2024-02-29".parse().unwrap());

        let records = records_for_year(&series, "S1", 2025);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "2025-03-01".parse().unwrap());
    }

    #[test]
    fn missing_cell_despite_matching_tile_is_fatal() {
        let frame = tile_frame(&[(99, 50, 152, 20.0, 10.0)]);
        let err = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::CellNotFound {
                cell_row: 100,
                cell_col: 50,
                ..
            }
        ));
    }

    #[test]
    fn masked_values_become_gaps_not_errors() {
        let frame = df!(
            "cell_row" => [100i64, 100],
            "cell_col" => [50i64, 50],
            "yday" => [152i64, 153],
            "tmax" => [Some(20.0), None],
            "tmin" => [Some(10.0), None],
        )
        .unwrap()
        .lazy();
        let series = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap();
        assert_eq!(series.values().len(), 1);
    }

    #[test]
    fn invalid_day_of_year_is_an_error() {
        let frame = tile_frame(&[(100, 50, 366, 20.0, 10.0)]);
        let err = extract_station_series(frame, TILE, 2024, LAT, LON).unwrap_err();
        assert!(matches!(err, ExtractionError::BadDayOfYear { yday: 366, .. }));
    }
}
