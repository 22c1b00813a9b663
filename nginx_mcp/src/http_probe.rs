//! HTTP checks against the proxy itself (`stub_status`, health endpoints).
//!
//! These never go through the command engine: a plain GET with its own timeout is all
//! that is needed, and a failed request is reported to the caller as a tool error.

use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// What came back from one GET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    #[serde(rename = "elapsed_ms")]
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn serialize_millis<S>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u128(elapsed.as_millis())
}

/// Thin wrapper around a `reqwest::Client` bound to the proxy's base URL.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProbeError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url, ProbeError> {
        let invalid = |source| ProbeError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            source,
        };
        let base = Url::parse(&self.base_url).map_err(invalid)?;
        base.join(path).map_err(invalid)
    }

    /// GETs `path` and returns the status and body, whatever the status code is.
    pub async fn get(&self, path: &str) -> Result<ProbeResponse, ProbeError> {
        let url = self.url_for(path)?;
        let request_error = |source| ProbeError::Request {
            url: url.to_string(),
            source,
        };

        tracing::debug!("probing {}", url);
        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(request_error)?;
        let elapsed = started.elapsed();

        Ok(ProbeResponse {
            url: url.to_string(),
            status,
            body,
            elapsed,
        })
    }
}
