//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and engine creation
//! to reduce duplication across command handlers.

use std::sync::Arc;

use tracing::info;

use s2mosaic::cache::BandCache;
use s2mosaic::config::ConfigFile;
use s2mosaic::logging::{init_logging, split_log_path, LoggingGuard};
use s2mosaic::mosaic::{Engine, LogProgress, SharedProgressReporter};

use crate::error::CliError;
use crate::progress::ProgressLine;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    /// Whether stdout is an interactive terminal
    interactive: bool,
}

impl CliRunner {
    /// Create a new CLI runner with optional debug logging.
    ///
    /// When stdout is a TTY, stdout logging is disabled so log lines do not
    /// break the progress display.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        // Load config file (or use defaults if not present)
        let config = ConfigFile::load()?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let interactive = atty::is(atty::Stream::Stdout);

        let logging_guard = init_logging(log_dir, log_file, !interactive, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            interactive,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("s2mosaic v{}", s2mosaic::VERSION);
        info!("s2mosaic CLI: {} command", command);
    }

    /// Progress output: a live line on terminals, log lines otherwise.
    pub fn progress(&self) -> SharedProgressReporter {
        if self.interactive {
            Arc::new(ProgressLine::new())
        } else {
            Arc::new(LogProgress)
        }
    }

    /// Create an engine from the configuration.
    ///
    /// `cache_bands` attaches the band cache even when the config file
    /// leaves it disabled.
    pub fn create_engine(&self, cache_bands: bool) -> Result<Engine, CliError> {
        let mut engine = Engine::from_config(&self.config)?;
        if cache_bands && engine.cache().is_none() {
            engine = engine.with_cache(BandCache::new(&self.config.cache.directory)?);
        }
        info!(
            stac_url = %self.config.catalog.stac_url,
            cache = engine.cache().is_some(),
            "Engine created"
        );
        Ok(engine.with_progress(self.progress()))
    }
}
