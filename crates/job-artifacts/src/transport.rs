//! HTTP transport seam
//!
//! The fetchers never talk to `reqwest` directly; they hold an
//! `Arc<dyn Transport>` so tests can swap in
//! [`MemoryTransport`](crate::fakes::MemoryTransport).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

use crate::config::ArtifactStoreConfig;
use crate::error::{FetchError, Result};

/// Issues plain GET requests and returns the response body.
///
/// Implementations must be safe to share between concurrent callers.
/// A non-2xx status is reported as [`FetchError::Status`] and the body is
/// never handed back.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// `reqwest` backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport using the user agent and timeout from `config`.
    pub fn new(config: &ArtifactStoreConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| FetchError::Transport {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(HttpTransport { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!(url = %parsed, "GET");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "gateway returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?;
        debug!(url, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
