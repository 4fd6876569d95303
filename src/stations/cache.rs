//! On-disk cache of the realtime station list.

use crate::stations::error::StationCacheError;
use crate::types::station::Station;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const BINCODE_CACHE_FILE_NAME: &str = "realtime_stations.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// The realtime list changes slowly; refresh it once a day.
pub const MAX_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct RealtimeStationCache {
    cache_file: PathBuf,
    max_age: Duration,
}

impl RealtimeStationCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_file: cache_dir.join(BINCODE_CACHE_FILE_NAME),
            max_age: MAX_CACHE_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.cache_file
    }

    /// Cached stations, or `None` when there is no cache file or it is older than the
    /// maximum age.
    pub async fn load_fresh(&self) -> Result<Option<Vec<Station>>, StationCacheError> {
        let metadata = match tokio::fs::metadata(&self.cache_file).await {
            Ok(metadata) => metadata,
            Err(_) => return Ok(None),
        };
        let age = metadata
            .modified()
            .ok()
            .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default());
        if !age.is_some_and(|age| age <= self.max_age) {
            debug!("Realtime station cache {:?} is stale", self.cache_file);
            return Ok(None);
        }

        let path = self.cache_file.clone();
        let stations = tokio::task::spawn_blocking(move || Self::decode(&path)).await??;
        info!(
            "Loaded {} realtime stations from cache {:?}",
            stations.len(),
            self.cache_file
        );
        Ok(Some(stations))
    }

    fn decode(cache_path: &Path) -> Result<Vec<Station>, StationCacheError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| StationCacheError::CacheRead(cache_path.to_path_buf(), e))?;
        let (stations, _) =
            bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG).map_err(
                |e| StationCacheError::CacheDecode(cache_path.to_path_buf(), Box::new(e)),
            )?;
        Ok(stations)
    }

    pub async fn store(&self, stations: &[Station]) -> Result<(), StationCacheError> {
        if let Some(parent) = self.cache_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StationCacheError::CacheDirCreation(parent.to_path_buf(), e))?;
        }
        let stations = stations.to_vec();
        let bytes = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| StationCacheError::CacheEncode(Box::new(e)))
        })
        .await??;
        tokio::fs::write(&self.cache_file, &bytes)
            .await
            .map_err(|e| StationCacheError::CacheWrite(self.cache_file.clone(), e))?;
        info!(
            "Wrote realtime station cache ({} bytes) to {:?}",
            bytes.len(),
            self.cache_file
        );
        Ok(())
    }
}
