//! HTTP transport, abstracted so the poller can be tested without a network

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production client backed by reqwest.
///
/// Requests and body reads share one deadline; errors name the node API URL
/// and say whether the deadline was hit.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("building node API client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    fn describe(&self, url: &str, stage: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Http(format!("{} {} timed out after {:?}", stage, url, self.timeout))
        } else if e.is_connect() {
            Error::Http(format!("{} {} could not connect: {}", stage, url, e))
        } else {
            Error::Http(format!("{} {} failed: {}", stage, url, e))
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.describe(url, "GET", e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.describe(url, "reading body of", e))?;

        debug!(
            "GET {} -> {} ({} bytes in {:?})",
            url,
            status,
            body.len(),
            start.elapsed()
        );
        Ok(HttpResponse { status, body })
    }
}
