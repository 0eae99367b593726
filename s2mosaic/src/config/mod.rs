//! Configuration for s2mosaic.
//!
//! User settings live in `~/.s2mosaic/config.ini` and are loaded into a
//! [`ConfigFile`]. Missing files and missing keys fall back to defaults;
//! command-line flags override whatever the file says.
//!
//! # Example
//!
//! ```
//! use s2mosaic::config::{ConfigFile, DownloadConfig};
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.catalog.page_size, 100);
//!
//! let download = DownloadConfig::new().with_max_retries(5);
//! assert_eq!(download.max_retries(), 5);
//! ```

mod defaults;
mod download;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use download::DownloadConfig;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, CatalogSettings, ConfigFile, DownloadSettings, LoggingSettings};
