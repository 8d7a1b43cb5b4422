//! Output record types: extracted air-temperature rows and the merged
//! observation table consumed by the external exporters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One extracted air-temperature value for a station and calendar date.
///
/// `clamped` marks values taken from a stand-in vintage: the date's year was
/// not published yet, so the most recent available year's series was reused,
/// aligned by month and day. Downstream exporters surface this flag so proxy
/// values are never presented as measured data.
#[derive(Debug, Clone, PartialEq)]
pub struct AirTempRecord {
    pub station_id: String,
    pub date: NaiveDate,
    pub tile_id: u32,
    pub air_temp_c: f64,
    pub clamped: bool,
}

/// An observation joined with its matched air temperature and watershed.
///
/// Every input observation yields exactly one merged record. `air_temp_c`
/// is `None` when no tile value covers the date (legitimate at tile/year
/// boundaries), and `watershed_id` is `None` for stations outside every
/// watershed polygon. Neither is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub dataset: String,
    pub station_id: String,
    pub date: NaiveDate,
    pub water_temp_c: f64,
    pub air_temp_c: Option<f64>,
    pub air_temp_clamped: bool,
    pub watershed_id: Option<String>,
}
