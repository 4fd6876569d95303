use crate::error::HydatError;
use log::info;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "hydat_rs_cache";
const DATA_DIR_NAME: &str = "hydat_rs";
pub const ARCHIVE_FILE_NAME: &str = "Hydat.sqlite3";

pub fn get_cache_dir() -> Result<PathBuf, HydatError> {
    dirs::cache_dir()
        .ok_or(HydatError::DirResolution("cache"))
        .map(|p| p.join(CACHE_DIR_NAME))
}

/// `<user data dir>/hydat_rs/Hydat.sqlite3`.
pub fn default_archive_path() -> Result<PathBuf, HydatError> {
    dirs::data_dir()
        .ok_or(HydatError::DirResolution("data"))
        .map(|p| p.join(DATA_DIR_NAME).join(ARCHIVE_FILE_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> Result<(), HydatError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(HydatError::CacheDirCreation(
                    path.to_path_buf(),
                    io::Error::new(io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| HydatError::CacheDirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(HydatError::CacheDirCreation(path.to_path_buf(), e)),
    }
}
