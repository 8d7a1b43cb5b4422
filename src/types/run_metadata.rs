//! Per-run metadata written alongside the exported dataset.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// UTC offset of the dataset's home time zone (Pacific standard time).
/// Run timestamps are published with this fixed offset so the exported
/// metadata is reproducible regardless of the machine's local zone.
const LOCAL_UTC_OFFSET_SECS: i32 = -8 * 3600;

/// Snapshot metadata for one pipeline run, serialized by the external
/// exporter next to the merged dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Latest vintage year the gridded dataset had published at run time.
    pub last_available_year: i32,
    /// Run timestamp, ISO-8601 with explicit UTC offset.
    pub last_updated: String,
}

impl RunMetadata {
    /// Metadata stamped with the current time.
    pub fn new(last_available_year: i32) -> Self {
        // expect safe: -8 h is well within chrono's ±24 h offset bound.
        let offset = FixedOffset::east_opt(LOCAL_UTC_OFFSET_SECS).expect("valid fixed offset");
        Self::at(last_available_year, Utc::now().with_timezone(&offset))
    }

    /// Metadata stamped with an explicit timestamp.
    pub fn at(last_available_year: i32, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            last_available_year,
            last_updated: timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }
}
