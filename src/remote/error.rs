use chrono::{DateTime, Utc};
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Feed at {url} is not available: {reason}")]
    NotAvailable { url: String, reason: String },

    #[error("Credentials or token rejected by {url}")]
    Unauthorized { url: String },

    #[error("Web service token expired at {expired_at}")]
    TokenExpired { expired_at: DateTime<Utc> },

    #[error("Web service credentials not configured: environment variable {0} is not set")]
    MissingCredentials(&'static str),

    #[error("Parsing error processing CSV from {url}")]
    CsvRead {
        url: String,
        #[source]
        source: PolarsError,
    },

    #[error("CSV column count ({found}) does not match schema length ({expected}) for {url}")]
    SchemaMismatch {
        url: String,
        expected: usize,
        found: usize,
    },

    #[error("Failed to rename columns for {url}: {source}")]
    ColumnRename { url: String, source: PolarsError },

    #[error("Response from {url} is not valid UTF-8")]
    Encoding {
        url: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl RemoteError {
    /// Rejected or missing web-service credentials and expired tokens.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RemoteError::Unauthorized { .. }
                | RemoteError::TokenExpired { .. }
                | RemoteError::MissingCredentials(_)
        )
    }
}
