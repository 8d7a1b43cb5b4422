//! This module provides the main entry point of the enrichment pipeline:
//! reconciling the tile-years a batch of observations needs, fetching and
//! caching the artifacts, extracting air temperatures, and joining them with
//! watershed membership onto the observations.

use crate::config::RunConfig;
use crate::error::WatertempError;
use crate::merge::merge_records;
use crate::tiles::cache::TileCache;
use crate::tiles::clamp::{clamp_tile_years, fetch_year_for};
use crate::tiles::extract::{extract_station_series, records_for_year};
use crate::tiles::locator::{station_tile_years, TileKey};
use crate::tiles::source::{DaymetSource, TileSource};
use crate::types::observation::{distinct_stations, Observation, Station};
use crate::types::records::MergedRecord;
use crate::types::run_metadata::RunMetadata;
use crate::utils::ensure_dir_exists;
use crate::watershed::{Watershed, WatershedAttributor};
use bon::bon;
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The result of one enrichment run: the merged record table plus the run
/// metadata the external exporters write alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDataset {
    pub records: Vec<MergedRecord>,
    pub metadata: RunMetadata,
}

/// The enrichment pipeline client.
///
/// Holds the run configuration and the tile artifact cache. Generic over the
/// [`TileSource`] so the remote layer can be substituted; production code
/// uses the [`DaymetSource`] default.
///
/// # Examples
///
/// ```rust
/// # use watertemp::{Watertemp, WatertempError};
/// # async fn run() -> Result<(), WatertempError> {
/// let pipeline = Watertemp::builder().build().await?;
/// # Ok(())
/// # }
/// ```
pub struct Watertemp<S: TileSource = DaymetSource> {
    config: RunConfig,
    cache: TileCache<S>,
}

#[bon]
impl Watertemp<DaymetSource> {
    /// Creates a pipeline over the Daymet distribution server.
    ///
    /// # Arguments
    ///
    /// * `.config(RunConfig)`: Optional. Defaults to [`RunConfig::from_env`].
    /// * `.base_url(String)`: Optional. Overrides the distribution server,
    ///   mainly for mirrors.
    ///
    /// # Errors
    ///
    /// Returns [`WatertempError::DataDirCreation`] if the tile cache
    /// directory cannot be created.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use watertemp::{RunConfig, Watertemp, WatertempError};
    /// # async fn run() -> Result<(), WatertempError> {
    /// let pipeline = Watertemp::builder()
    ///     .config(RunConfig::with_data_dir("/var/lib/watertemp"))
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn new(
        config: Option<RunConfig>,
        base_url: Option<String>,
    ) -> Result<Self, WatertempError> {
        let config = config.unwrap_or_else(RunConfig::from_env);
        let source = match base_url {
            Some(url) => DaymetSource::with_base_url(url),
            None => DaymetSource::new(),
        };
        Self::with_source(config, source).await
    }
}

impl<S: TileSource> Watertemp<S> {
    /// Creates a pipeline over an arbitrary tile source.
    pub async fn with_source(config: RunConfig, source: S) -> Result<Self, WatertempError> {
        let cache_dir = config.tile_cache_dir();
        ensure_dir_exists(&cache_dir)
            .await
            .map_err(|e| WatertempError::DataDirCreation(cache_dir.clone(), e))?;
        Ok(Self {
            cache: TileCache::new(&cache_dir, source),
            config,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the full reconciliation and merge for one observation batch.
    ///
    /// Resolves the needed tile-years, clamps them against the latest
    /// published vintage, fetches missing artifacts into the cache, extracts
    /// per-station air-temperature series, attributes stations to
    /// watersheds, and left-joins everything onto the observations.
    ///
    /// Any failure aborts the run: downstream consumers treat the exported
    /// files as complete snapshots, so a partially-correct dataset is worse
    /// than none.
    pub async fn enrich(
        &self,
        observations: &[Observation],
        watersheds: Vec<Watershed>,
    ) -> Result<EnrichedDataset, WatertempError> {
        let stations = distinct_stations(observations)?;
        let station_by_id: HashMap<&str, &Station> = stations
            .iter()
            .map(|s| (s.station_id.as_str(), s))
            .collect();

        let tile_years = station_tile_years(observations)?;
        let last_available_year = self.cache.source().latest_year().await?;
        let clamped = clamp_tile_years(&tile_years, last_available_year);
        info!(
            "{} observations across {} stations require {} tile-year artifacts (vintage {})",
            observations.len(),
            stations.len(),
            clamped.len(),
            last_available_year
        );

        let mut air_temps = Vec::new();
        for group in &clamped {
            let frame = self
                .cache
                .frame(TileKey {
                    tile_id: group.tile_id,
                    year: group.fetch_year,
                })
                .await?;

            // Requested years per station served by this artifact. A station
            // only gets records for years it actually observed.
            let mut per_station: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();
            for ty in &tile_years {
                if ty.tile_id == group.tile_id
                    && fetch_year_for(ty.requested_year, last_available_year) == group.fetch_year
                {
                    per_station
                        .entry(ty.station_id.as_str())
                        .or_default()
                        .insert(ty.requested_year);
                }
            }

            for (station_id, years) in per_station {
                let Some(station) = station_by_id.get(station_id) else {
                    continue;
                };
                let series = extract_station_series(
                    frame.clone(),
                    group.tile_id,
                    group.fetch_year,
                    station.latitude,
                    station.longitude,
                )?;
                for year in years {
                    air_temps.extend(records_for_year(&series, station_id, year));
                }
            }
        }

        let attributor = WatershedAttributor::new(watersheds);
        let watershed_by_station = attributor.attribute_stations(&stations);
        let records = merge_records(observations, &air_temps, &watershed_by_station)?;

        Ok(EnrichedDataset {
            records,
            metadata: RunMetadata::new(last_available_year),
        })
    }
}
