use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TileLocateError {
    #[error("coordinate ({lat}, {lon}) is outside the gridded dataset's coverage")]
    OutOfCoverage { lat: f64, lon: f64 },
}

#[derive(Debug, Error)]
pub enum VintageError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read vintage catalog response from {0}")]
    CatalogParse(String, #[source] reqwest::Error),

    #[error("Failed to parse vintage catalog JSON")]
    JsonParse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TileDataError {
    #[error("Failed to create tile cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Tile download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    // Errors during CSV decoding (inside blocking task)
    #[error("I/O error decoding CSV data for tile {tile_id} year {year}")]
    CsvReadIo {
        tile_id: u32,
        year: i32,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing error decoding CSV data for tile {tile_id} year {year}")]
    CsvReadPolars {
        tile_id: u32,
        year: i32,
        #[source]
        source: PolarsError,
    },

    #[error("CSV column count ({found}) does not match tile schema length ({expected}) for tile {tile_id} year {year}")]
    SchemaMismatch {
        tile_id: u32,
        year: i32,
        expected: usize,
        found: usize,
    },

    #[error("I/O error writing parquet artifact '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing parquet artifact '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to publish tile artifact '{0}'")]
    PersistArtifact(PathBuf, #[source] tempfile::PersistError),

    #[error("Failed to scan tile artifact '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Tile artifact '{0}' is present but corrupt; delete it and re-run")]
    ClobberedCache(PathBuf),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(
        "tile {tile_id} year {year} has no rows for grid cell ({cell_row}, {cell_col}); \
         tile data disagrees with the tiling scheme"
    )]
    CellNotFound {
        tile_id: u32,
        year: i32,
        cell_row: u32,
        cell_col: u32,
    },

    #[error("coordinate ({lat}, {lon}) cannot be located within tile {tile_id}")]
    CoordinateOutsideTile { tile_id: u32, lat: f64, lon: f64 },

    #[error("tile {tile_id} year {year} contains invalid day-of-year {yday}")]
    BadDayOfYear { tile_id: u32, year: i32, yday: i64 },

    #[error("Failed processing tile dataframe")]
    DataFrameProcessing(#[from] PolarsError),
}
