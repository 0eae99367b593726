//! Download configuration.

use super::defaults::{
    clamp_workers, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_DOWNLOAD_WORKERS, DEFAULT_MAX_RETRIES,
};
use super::settings::DownloadSettings;

/// Configuration for band downloads.
///
/// # Example
///
/// ```
/// use s2mosaic::config::DownloadConfig;
///
/// let config = DownloadConfig::default();
/// assert_eq!(config.timeout_secs(), 120);
/// assert_eq!(config.max_retries(), 3);
/// assert_eq!(config.workers(), 4);
///
/// let config = DownloadConfig::new()
///     .with_timeout_secs(60)
///     .with_max_retries(5)
///     .with_workers(8);
/// assert_eq!(config.workers(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Timeout of a single request (in seconds)
    timeout_secs: u64,
    /// Retry attempts for transient failures
    max_retries: u32,
    /// Concurrent band downloads per scene
    workers: usize,
}

impl DownloadConfig {
    /// Create a new download configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the number of concurrent downloads, clamped to a sane range.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = clamp_workers(workers);
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            workers: DEFAULT_DOWNLOAD_WORKERS,
        }
    }
}

impl From<&DownloadSettings> for DownloadConfig {
    fn from(settings: &DownloadSettings) -> Self {
        Self::new()
            .with_timeout_secs(settings.timeout)
            .with_max_retries(settings.max_retries)
            .with_workers(settings.workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_equals_default() {
        assert_eq!(DownloadConfig::new(), DownloadConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = DownloadConfig::new().with_timeout_secs(10);
        assert_eq!(config.timeout_secs(), 10);
        assert_eq!(config.max_retries(), DEFAULT_MAX_RETRIES); // Unchanged
        assert_eq!(DownloadConfig::new().with_workers(0).workers(), 1);
    }

    #[test]
    fn test_from_settings() {
        let settings = DownloadSettings {
            timeout: 30,
            max_retries: 1,
            workers: 2,
        };
        let config = DownloadConfig::from(&settings);
        assert_eq!(config.timeout_secs(), 30);
        assert_eq!(config.max_retries(), 1);
        assert_eq!(config.workers(), 2);
    }
}
