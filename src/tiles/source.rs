//! Remote access to the gridded dataset: the vintage catalog query and the
//! per-tile-year artifact download.

use crate::tiles::error::{TileDataError, VintageError};
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use std::io;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

const DAYMET_BASE_URL: &str = "https://thredds.daac.ornl.gov/daymet";

/// External source of tile artifacts and vintage information.
///
/// The production implementation is [`DaymetSource`]; tests substitute an
/// in-memory stub so the cache and extraction logic can be exercised without
/// a network.
pub trait TileSource: Send + Sync {
    /// The most recent calendar year with published tiles.
    fn latest_year(&self) -> impl std::future::Future<Output = Result<i32, VintageError>> + Send;

    /// The decompressed CSV bytes of one tile-year artifact.
    fn fetch_tile(
        &self,
        tile_id: u32,
        year: i32,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, TileDataError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CatalogLatest {
    last_available_year: i32,
}

/// HTTP-backed tile source for the Daymet-style distribution server.
#[derive(Debug, Clone)]
pub struct DaymetSource {
    base_url: String,
    client: Client,
}

impl DaymetSource {
    pub fn new() -> Self {
        Self::with_base_url(DAYMET_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn catalog_url(&self) -> String {
        format!("{}/catalog/latest.json", self.base_url)
    }

    fn tile_url(&self, tile_id: u32, year: i32) -> String {
        format!("{}/tiles/{}/{}.csv.gz", self.base_url, year, tile_id)
    }
}

impl Default for DaymetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for DaymetSource {
    async fn latest_year(&self) -> Result<i32, VintageError> {
        let url = self.catalog_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VintageError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    VintageError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    VintageError::NetworkRequest(url, e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VintageError::CatalogParse(url.clone(), e))?;
        let latest: CatalogLatest = serde_json::from_slice(&bytes)?;
        info!(
            "Vintage catalog at {} reports last available year {}",
            url, latest.last_available_year
        );
        Ok(latest.last_available_year)
    }

    async fn fetch_tile(&self, tile_id: u32, year: i32) -> Result<Vec<u8>, TileDataError> {
        let url = self.tile_url(tile_id, year);
        info!("Downloading tile artifact from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TileDataError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    TileDataError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    TileDataError::NetworkRequest(url, e)
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await?;
        info!(
            "Downloaded and decompressed {} bytes for tile {} year {}",
            decompressed.len(),
            tile_id,
            year
        );
        Ok(decompressed)
    }
}
