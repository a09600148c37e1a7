//! Object-store access for GPX files. The core only knows "URL in,
//! bytes out"; authentication and bucket layout belong to the
//! collaborator that issued the URL.

use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("gpx file not found at {0}")]
    NotFound(String),

    #[error("gpx download failed: {0}")]
    Http(String),
}

pub trait GpxFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Production fetcher over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpGpxFetcher {
    client: reqwest::Client,
}

impl HttpGpxFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GpxFetcher for HttpGpxFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Canned fetcher for tests and the simulator.
#[derive(Debug, Clone, Default)]
pub struct StaticGpxFetcher {
    files: HashMap<String, Vec<u8>>,
}

impl StaticGpxFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), bytes.into());
        self
    }
}

impl GpxFetcher for StaticGpxFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
