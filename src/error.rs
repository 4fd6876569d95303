use crate::archive::error::ArchiveError;
use crate::remote::error::RemoteError;
use crate::stations::error::StationCacheError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`HydatError`], for callers that branch on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    RemoteUnavailable,
    AuthFailure,
    Internal,
}

#[derive(Debug, Error)]
pub enum HydatError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No data found for {0}")]
    NoData(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    StationCache(#[from] StationCacheError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine the user {0} directory")]
    DirResolution(&'static str),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),
}

impl HydatError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        HydatError::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HydatError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            HydatError::NoData(_) | HydatError::Archive(ArchiveError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            HydatError::Remote(remote) if remote.is_auth_failure() => ErrorKind::AuthFailure,
            HydatError::Remote(_) => ErrorKind::RemoteUnavailable,
            _ => ErrorKind::Internal,
        }
    }
}
