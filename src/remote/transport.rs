//! The HTTP seam of the remote feed clients.

use crate::remote::error::RemoteError;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response};

/// Fetches raw response bodies. Implemented over `reqwest` by [`HttpTransport`]; tests
/// substitute canned responses.
///
/// Non-success statuses are returned as [`RemoteError::HttpStatus`] whatever the code;
/// deciding that a status means rejected credentials is up to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, RemoteError>;

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>, RemoteError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn read_body(url: &str, response: Response) -> Result<Vec<u8>, RemoteError> {
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(match e.status() {
                    Some(status) => RemoteError::HttpStatus {
                        url: url.to_string(),
                        status,
                    },
                    None => RemoteError::NetworkRequest(url.to_string(), e),
                });
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::NetworkRequest(url.to_string(), e))?;
        debug!("Received {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::NetworkRequest(url.to_string(), e))?;
        Self::read_body(url, response).await
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>, RemoteError> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| RemoteError::NetworkRequest(url.to_string(), e))?;
        Self::read_body(url, response).await
    }
}
