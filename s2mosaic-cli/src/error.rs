//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use s2mosaic::cache::CacheError;
use s2mosaic::config::ConfigFileError;
use s2mosaic::grid::GridError;
use s2mosaic::mosaic::MosaicError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file error
    Config(ConfigFileError),
    /// A command-line argument could not be used
    InvalidArgument(String),
    /// Building the mosaic failed
    Mosaic(MosaicError),
    /// Band cache maintenance failed
    Cache(CacheError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Mosaic(MosaicError::NoScenes { .. }) => {
                eprintln!();
                eprintln!("Try one of:");
                eprintln!("  1. A longer period (--months, --years)");
                eprintln!("  2. Fewer --query restrictions");
            }
            CliError::Mosaic(MosaicError::Grid(GridError::NotFound(_)))
            | CliError::Mosaic(MosaicError::Grid(GridError::InvalidFormat(_))) => {
                eprintln!();
                eprintln!("Grid ids look like 50HMH: UTM zone, latitude band, 100 km square.");
            }
            CliError::Mosaic(MosaicError::Catalog(e)) if e.is_transient() => {
                eprintln!();
                eprintln!("The catalog may be busy. Retry later or raise max_retries in");
                eprintln!("the [download] section of the config file.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 's2mosaic init' to write a fresh config file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Mosaic(e) => write!(f, "{}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Mosaic(e) => Some(e),
            CliError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<MosaicError> for CliError {
    fn from(e: MosaicError) -> Self {
        CliError::Mosaic(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
