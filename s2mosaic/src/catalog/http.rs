//! HTTP client abstraction for testability

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::types::CatalogError;

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(&self, url: &str) -> Result<Vec<u8>, CatalogError>;

    /// Performs an HTTP POST request with a JSON body.
    fn post_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, CatalogError>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn get(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        (**self).get(url)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, CatalogError> {
        (**self).post_json(url, body)
    }
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_timeout(120)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("s2mosaic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                CatalogError::HttpError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    fn read_response(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<Vec<u8>, CatalogError> {
        // Check HTTP status
        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        // Read response body
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| CatalogError::HttpError(format!("Failed to read response: {}", e)))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| CatalogError::HttpError(format!("Request failed: {}", e)))?;

        Self::read_response(url, response)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, CatalogError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| CatalogError::HttpError(format!("Request failed: {}", e)))?;

        Self::read_response(url, response)
    }
}

/// Client wrapper that retries transient failures with exponential backoff.
pub struct RetryingClient<C: HttpClient> {
    inner: C,
    max_retries: u32,
    base_delay: Duration,
}

impl<C: HttpClient> RetryingClient<C> {
    /// Wraps `inner`, allowing up to `max_retries` additional attempts.
    pub fn new(inner: C, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Set the delay before the first retry; it doubles on each attempt.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn with_retries<F>(&self, url: &str, request: F) -> Result<Vec<u8>, CatalogError>
    where
        F: Fn() -> Result<Vec<u8>, CatalogError>,
    {
        let mut attempt = 0;
        loop {
            match request() {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Request failed, retrying in {:?}",
                        delay
                    );
                    thread::sleep(delay);
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "Request failed permanently");
                    return Err(e);
                }
            }
        }
    }
}

impl<C: HttpClient> HttpClient for RetryingClient<C> {
    fn get(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.with_retries(url, || self.inner.get(url))
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, CatalogError> {
        self.with_retries(url, || self.inner.post_json(url, body))
    }
}
