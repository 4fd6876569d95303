use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive file not found at '{0}'")]
    NotFound(PathBuf),

    #[error("Failed to open archive '{0}'")]
    Open(PathBuf, #[source] sqlx::Error),

    #[error("Query on table {table} failed")]
    Query {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to decode a row of table {table}")]
    Decode {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to close archive connection")]
    Close(#[source] sqlx::Error),
}
