//! Grid math for the Daymet-style tiling scheme: mapping a station
//! coordinate to its tile and grid cell, and deriving the set of tile-years
//! an observation batch requires.
//!
//! The grid is static: the same coordinate always lands in the same tile and
//! cell regardless of year. Extraction reuses the same cell math, so the two
//! can never disagree about which cell a station falls in.

use crate::tiles::error::TileLocateError;
use crate::types::observation::Observation;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

// Coverage bounds of the gridded dataset (North America).
pub const LAT_MIN: f64 = 14.0;
pub const LAT_MAX: f64 = 84.0;
pub const LON_MIN: f64 = -180.0;
pub const LON_MAX: f64 = -52.0;

/// Tile edge length in degrees.
const TILE_SIZE_DEG: f64 = 2.0;
/// Grid cell edge length in degrees (~1 km).
const CELL_SIZE_DEG: f64 = 0.01;
/// Cells along one tile edge (TILE_SIZE_DEG / CELL_SIZE_DEG).
const CELLS_PER_TILE: u32 = 200;
/// Tiles along one latitude row ((LON_MAX - LON_MIN) / TILE_SIZE_DEG).
const TILES_PER_ROW: u32 = 64;
/// Tile ids are offset so they are recognizably tile ids in logs and paths.
const TILE_ID_BASE: u32 = 9000;

/// One spatial tile of the gridded dataset for one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub tile_id: u32,
    pub year: i32,
}

/// A grid cell within a tile, row-major from the tile's south-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
}

/// One station's requirement for one tile-year, before vintage clamping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StationTileYear {
    pub station_id: String,
    pub tile_id: u32,
    pub requested_year: i32,
}

/// Index along one axis of an evenly spaced closed grid. Values exactly on
/// the upper bound belong to the last interval.
fn axis_index(value: f64, min: f64, max: f64, step: f64) -> Option<u32> {
    if !(min..=max).contains(&value) {
        return None;
    }
    let count = ((max - min) / step).round() as u32;
    let idx = ((value - min) / step).floor() as u32;
    Some(idx.min(count - 1))
}

fn tile_row_col(lat: f64, lon: f64) -> Option<(u32, u32)> {
    let row = axis_index(lat, LAT_MIN, LAT_MAX, TILE_SIZE_DEG)?;
    let col = axis_index(lon, LON_MIN, LON_MAX, TILE_SIZE_DEG)?;
    Some((row, col))
}

/// The id of the tile containing the coordinate, if it is inside the
/// coverage area.
pub fn tile_for(lat: f64, lon: f64) -> Option<u32> {
    tile_row_col(lat, lon).map(|(row, col)| TILE_ID_BASE + row * TILES_PER_ROW + col)
}

/// The grid cell of the coordinate within its enclosing tile.
///
/// Cell indices are computed from the tile's own origin rather than the
/// global grid origin, so a coordinate exactly on a tile edge gets cell 0 of
/// the tile that `tile_for` assigns it to.
pub fn grid_cell(lat: f64, lon: f64) -> Option<GridCell> {
    let (tile_row, tile_col) = tile_row_col(lat, lon)?;
    let tile_lat_min = LAT_MIN + f64::from(tile_row) * TILE_SIZE_DEG;
    let tile_lon_min = LON_MIN + f64::from(tile_col) * TILE_SIZE_DEG;
    let row = (((lat - tile_lat_min) / CELL_SIZE_DEG).floor() as u32).min(CELLS_PER_TILE - 1);
    let col = (((lon - tile_lon_min) / CELL_SIZE_DEG).floor() as u32).min(CELLS_PER_TILE - 1);
    Some(GridCell { row, col })
}

/// Maps a coordinate and observation date to the tile-year covering it.
pub fn locate(lat: f64, lon: f64, date: NaiveDate) -> Result<TileKey, TileLocateError> {
    let tile_id = tile_for(lat, lon).ok_or(TileLocateError::OutOfCoverage { lat, lon })?;
    Ok(TileKey {
        tile_id,
        year: date.year(),
    })
}

/// Derives the minimal deduplicated set of (station, tile, year) requirements
/// covering every observation in the batch.
///
/// A coordinate outside the coverage area aborts the whole derivation: a
/// silently dropped station would corrupt the published dataset's
/// completeness, so the error propagates instead.
pub fn station_tile_years(
    observations: &[Observation],
) -> Result<Vec<StationTileYear>, TileLocateError> {
    let mut set: BTreeSet<StationTileYear> = BTreeSet::new();
    for obs in observations {
        let key = locate(obs.latitude, obs.longitude, obs.date)?;
        set.insert(StationTileYear {
            station_id: obs.station_id.clone(),
            tile_id: key.tile_id,
            requested_year: key.year,
        });
    }
    Ok(set.into_iter().collect())
}
