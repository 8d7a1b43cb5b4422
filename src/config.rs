//! Run configuration, resolved once at startup and threaded through
//! component construction. Components never read the environment themselves.

use log::LevelFilter;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "WATERTEMP_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "WATERTEMP_LOG";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_LOG_LEVEL: &str = "INFO";

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Root directory for all pipeline data, including the tile cache.
    pub data_dir: PathBuf,
    /// Log verbosity name ("ERROR", "WARN", "INFO", "DEBUG", "TRACE").
    pub log_level: String,
}

impl RunConfig {
    /// Reads `WATERTEMP_DATA_DIR` and `WATERTEMP_LOG`, falling back to
    /// `"data"` and `"INFO"`. Call once per run.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var_os(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            log_level: std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
        }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_level: DEFAULT_LOG_LEVEL.into(),
        }
    }

    /// Directory holding the tile artifacts.
    pub fn tile_cache_dir(&self) -> PathBuf {
        self.data_dir.join("daymet_tiles")
    }

    /// The configured verbosity as a `log` filter; unknown names fall back
    /// to INFO.
    pub fn log_filter(&self) -> LevelFilter {
        match self.log_level.to_ascii_uppercase().as_str() {
            "OFF" => LevelFilter::Off,
            "ERROR" => LevelFilter::Error,
            "WARN" => LevelFilter::Warn,
            "DEBUG" => LevelFilter::Debug,
            "TRACE" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::with_data_dir(Path::new(DEFAULT_DATA_DIR))
    }
}
