//! Settings structs loaded from `config.ini`.

use std::path::PathBuf;

use super::defaults::*;

/// Complete user configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub catalog: CatalogSettings,
    pub download: DownloadSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

/// `[catalog]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    /// STAC API root.
    pub stac_url: String,
    /// SAS token API root; empty disables signing.
    pub sas_url: String,
    pub collection: String,
    pub page_size: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            stac_url: default_stac_url(),
            sas_url: default_sas_url(),
            collection: default_collection(),
            page_size: default_page_size(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Seconds.
    pub timeout: u64,
    pub max_retries: u32,
    pub workers: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            workers: DEFAULT_DOWNLOAD_WORKERS,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_cache_directory(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}
