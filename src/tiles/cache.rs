//! The on-disk tile artifact cache.
//!
//! Each (tile, fetch year) artifact is stored as one parquet file named by
//! its key, so presence can be checked without touching the network. Fetched
//! CSV bytes are decoded and written to a temporary file in the cache
//! directory, then atomically renamed into place: a crash mid-download can
//! never leave a truncated artifact that a later run would treat as valid.
//! Artifacts are never evicted.

use crate::tiles::error::TileDataError;
use crate::tiles::locator::TileKey;
use crate::tiles::source::TileSource;
use log::{info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::{fs, task};

/// Column layout of the raw (headerless) tile CSV.
pub(crate) const TILE_SCHEMA_COLUMNS: [&str; 5] = ["cell_row", "cell_col", "yday", "tmax", "tmin"];

/// Idempotent cache of tile artifacts, plus an in-process memo of the
/// LazyFrames scanned from them so each artifact is decoded once per run.
pub struct TileCache<S: TileSource> {
    cache_dir: PathBuf,
    source: S,
    frames: Mutex<HashMap<TileKey, LazyFrame>>,
}

impl<S: TileSource> TileCache<S> {
    pub fn new(cache_dir: &Path, source: S) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            source,
            frames: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Deterministic artifact path for a key; presence on disk is the cache
    /// hit test.
    pub fn artifact_path(&self, key: TileKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{}.parquet", key.tile_id, key.year))
    }

    /// Returns the LazyFrame for a tile-year, fetching and caching the
    /// artifact if it is not already on disk.
    ///
    /// The memo lock is held across the miss path, so concurrent callers on
    /// the same key never race a duplicate download: the loser of the lock
    /// sees the winner's memoized frame.
    pub async fn frame(&self, key: TileKey) -> Result<LazyFrame, TileDataError> {
        let mut frames = self.frames.lock().await;
        if let Some(frame) = frames.get(&key) {
            return Ok(frame.clone());
        }

        let path = self.ensure_artifact(key).await?;
        let frame = LazyFrame::scan_parquet(&path, Default::default())
            .map_err(|e| TileDataError::ParquetScan(path.clone(), e))?;

        frames.insert(key, frame.clone());
        Ok(frame)
    }

    /// Guarantees the artifact for `key` exists on disk and returns its path.
    async fn ensure_artifact(&self, key: TileKey) -> Result<PathBuf, TileDataError> {
        let path = self.artifact_path(key);

        match fs::metadata(&path).await {
            Ok(meta) if meta.len() == 0 => {
                // The publish step is atomic, so an empty artifact means
                // something outside this pipeline clobbered the cache.
                warn!("Tile artifact {:?} is empty on disk", path);
                return Err(TileDataError::ClobberedCache(path));
            }
            Ok(_) => {
                info!(
                    "Cache hit for tile {} year {} at {:?}",
                    key.tile_id, key.year, path
                );
                return Ok(path);
            }
            Err(_) => {
                warn!(
                    "Cache miss for tile {} year {}. Downloading and processing.",
                    key.tile_id, key.year
                );
            }
        }

        let raw_bytes = self.source.fetch_tile(key.tile_id, key.year).await?;
        let df = Self::csv_to_dataframe(raw_bytes, key).await?;

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| TileDataError::CacheDirCreation(self.cache_dir.clone(), e))?;

        Self::publish_artifact(df, &self.cache_dir, &path).await?;
        info!(
            "Cached tile {} year {} to {:?}",
            key.tile_id, key.year, path
        );
        Ok(path)
    }

    /// Parses raw headerless CSV bytes into a DataFrame using a blocking task
    /// and applies the tile schema's column names.
    async fn csv_to_dataframe(bytes: Vec<u8>, key: TileKey) -> Result<DataFrame, TileDataError> {
        task::spawn_blocking(move || {
            let mut temp_file = NamedTempFile::new().map_err(|e| TileDataError::CsvReadIo {
                tile_id: key.tile_id,
                year: key.year,
                source: e,
            })?;
            temp_file
                .write_all(&bytes)
                .and_then(|_| temp_file.flush())
                .map_err(|e| TileDataError::CsvReadIo {
                    tile_id: key.tile_id,
                    year: key.year,
                    source: e,
                })?;

            let mut df = CsvReadOptions::default()
                .with_has_header(false)
                .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
                .map_err(|e| TileDataError::CsvReadPolars {
                    tile_id: key.tile_id,
                    year: key.year,
                    source: e,
                })?
                .finish()
                .map_err(|e| TileDataError::CsvReadPolars {
                    tile_id: key.tile_id,
                    year: key.year,
                    source: e,
                })?;

            if df.width() != TILE_SCHEMA_COLUMNS.len() {
                warn!(
                    "CSV column count ({}) does not match tile schema length ({}) for tile {} year {}",
                    df.width(),
                    TILE_SCHEMA_COLUMNS.len(),
                    key.tile_id,
                    key.year
                );
                return Err(TileDataError::SchemaMismatch {
                    tile_id: key.tile_id,
                    year: key.year,
                    expected: TILE_SCHEMA_COLUMNS.len(),
                    found: df.width(),
                });
            }

            df.set_column_names(TILE_SCHEMA_COLUMNS.iter().copied())
                .map_err(|e| TileDataError::CsvReadPolars {
                    tile_id: key.tile_id,
                    year: key.year,
                    source: e,
                })?;

            Ok(df)
        })
        .await?
    }

    /// Writes the DataFrame to a temporary parquet file in the cache
    /// directory, then renames it onto the final path. Readers only ever see
    /// a fully published artifact or none.
    async fn publish_artifact(
        mut df: DataFrame,
        cache_dir: &Path,
        path: &Path,
    ) -> Result<(), TileDataError> {
        let cache_dir = cache_dir.to_path_buf();
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let mut temp_file = NamedTempFile::new_in(&cache_dir)
                .map_err(|e| TileDataError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(temp_file.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| TileDataError::ParquetWritePolars(path_buf.clone(), e))?;
            temp_file
                .persist(&path_buf)
                .map_err(|e| TileDataError::PersistArtifact(path_buf, e))?;
            Ok::<(), TileDataError>(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::error::VintageError;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source that counts fetches and serves a fixed CSV body.
    struct StubSource {
        csv: Vec<u8>,
        fetches: AtomicUsize,
        fail: bool,
    }

    impl StubSource {
        fn serving(csv: &str) -> Self {
            Self {
                csv: csv.as_bytes().to_vec(),
                fetches: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                csv: Vec::new(),
                fetches: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl TileSource for StubSource {
        async fn latest_year(&self) -> Result<i32, VintageError> {
            Ok(2024)
        }

        async fn fetch_tile(&self, _tile_id: u32, _year: i32) -> Result<Vec<u8>, TileDataError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TileDataError::DownloadIo(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "stub failure",
                )));
            }
            Ok(self.csv.clone())
        }
    }

    const CSV_BODY: &str = "100,50,152,20.0,10.0\n100,50,153,22.0,12.0\n";
    const KEY: TileKey = TileKey {
        tile_id: 9100,
        year: 2024,
    };

    #[tokio::test]
    async fn second_run_reuses_the_artifact_without_refetching() {
        let dir = tempfile::tempdir().unwrap();
        let source = StubSource::serving(CSV_BODY);
        let path;
        let first_bytes;
        {
            let cache = TileCache::new(dir.path(), source);
            cache.frame(KEY).await.unwrap();
            assert_eq!(cache.source().fetch_count(), 1);
            path = cache.artifact_path(KEY);
            first_bytes = std::fs::read(&path).unwrap();
        }

        // Fresh cache instance over the same directory: disk presence alone
        // must prevent a second fetch and leave the artifact untouched.
        let cache = TileCache::new(dir.path(), StubSource::serving(CSV_BODY));
        cache.frame(KEY).await.unwrap();
        assert_eq!(cache.source().fetch_count(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), first_bytes);
    }

    #[tokio::test]
    async fn repeated_gets_in_one_run_fetch_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), StubSource::serving(CSV_BODY));
        cache.frame(KEY).await.unwrap();
        cache.frame(KEY).await.unwrap();
        assert_eq!(cache.source().fetch_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_gets_for_one_key_fetch_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), StubSource::serving(CSV_BODY));
        let (a, b, c) = tokio::join!(cache.frame(KEY), cache.frame(KEY), cache.frame(KEY));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(cache.source().fetch_count(), 1);
    }

    #[tokio::test]
    async fn cached_frame_round_trips_the_tile_schema() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), StubSource::serving(CSV_BODY));
        let df = cache.frame(KEY).await.unwrap().collect().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), TILE_SCHEMA_COLUMNS);
    }

    #[tokio::test]
    async fn empty_artifact_is_reported_as_clobbered() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), StubSource::serving(CSV_BODY));
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(cache.artifact_path(KEY), b"").unwrap();

        let err = cache.frame(KEY).await.err().unwrap();
        assert!(matches!(err, TileDataError::ClobberedCache(_)));
        // No refetch is attempted: a clobbered cache is fatal, not masked.
        assert_eq!(cache.source().fetch_count(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_artifact_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), StubSource::failing());
        assert!(cache.frame(KEY).await.is_err());
        assert!(!cache.artifact_path(KEY).exists());
    }

    #[tokio::test]
    async fn malformed_csv_is_a_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), StubSource::serving("1,2,3\n4,5,6\n"));
        let err = cache.frame(KEY).await.err().unwrap();
        assert!(matches!(err, TileDataError::SchemaMismatch { .. }));
        assert!(!cache.artifact_path(KEY).exists());
    }
}
