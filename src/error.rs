use crate::merge::MergeError;
use crate::tiles::error::{ExtractionError, TileDataError, TileLocateError, VintageError};
use crate::types::observation::ObservationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatertempError {
    #[error(transparent)]
    Observation(#[from] ObservationError),

    #[error(transparent)]
    TileLocate(#[from] TileLocateError),

    #[error(transparent)]
    Vintage(#[from] VintageError),

    #[error(transparent)]
    TileData(#[from] TileDataError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),
}
