mod config;
mod error;
mod merge;
mod tiles;
mod types;
mod utils;
mod watershed;
mod watertemp;

pub use config::{RunConfig, DATA_DIR_ENV, LOG_LEVEL_ENV};
pub use error::WatertempError;
pub use watertemp::{EnrichedDataset, Watertemp};

pub use merge::{merge_records, MergeError};

pub use tiles::cache::TileCache;
pub use tiles::clamp::{clamp_tile_years, fetch_year_for, ClampedTileYear};
pub use tiles::error::{ExtractionError, TileDataError, TileLocateError, VintageError};
pub use tiles::extract::{extract_station_series, records_for_year, StationSeries};
pub use tiles::locator::{
    grid_cell, locate, station_tile_years, tile_for, GridCell, StationTileYear, TileKey,
};
pub use tiles::source::{DaymetSource, TileSource};

pub use types::observation::{distinct_stations, Observation, ObservationError, Station};
pub use types::records::{AirTempRecord, MergedRecord};
pub use types::run_metadata::RunMetadata;

pub use watershed::{Watershed, WatershedAttributor};
