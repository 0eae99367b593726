//! Default configuration values.

use std::path::PathBuf;

use crate::catalog::{
    DEFAULT_PAGE_SIZE, PLANETARY_COMPUTER_SAS_URL, PLANETARY_COMPUTER_STAC_URL, SENTINEL_2_L2A,
};

/// Default HTTP timeout in seconds. Full-resolution bands are large.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Default number of retries for transient HTTP failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of concurrent band downloads per scene.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 4;

/// Upper bound on concurrent band downloads.
pub const MAX_DOWNLOAD_WORKERS: usize = 32;

/// Default log file name, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "s2mosaic.log";

pub fn default_stac_url() -> String {
    PLANETARY_COMPUTER_STAC_URL.to_string()
}

pub fn default_sas_url() -> String {
    PLANETARY_COMPUTER_SAS_URL.to_string()
}

pub fn default_collection() -> String {
    SENTINEL_2_L2A.to_string()
}

pub fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Default band cache directory (`~/.cache/s2mosaic/bands`).
pub fn default_cache_directory() -> PathBuf {
    crate::cache::BandCache::default_dir()
}

/// Clamps a worker count to `1..=MAX_DOWNLOAD_WORKERS`.
pub fn clamp_workers(workers: usize) -> usize {
    workers.clamp(1, MAX_DOWNLOAD_WORKERS)
}
