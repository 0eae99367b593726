//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use s2mosaic::cache::{format_size, BandCache};
use s2mosaic::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the band cache, removing all downloaded bands
    Clear,
    /// Show band cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let cache = open_cache(&config_file_path())?;

    let lines = match action {
        CacheAction::Clear => {
            println!("Clearing band cache at: {}", cache.root().display());
            clear(&cache)?
        }
        CacheAction::Stats => {
            println!("Band cache: {}", cache.root().display());
            stats(&cache)?
        }
    };
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Band cache at the directory named by the config file.
fn open_cache(config_path: &Path) -> Result<BandCache, CliError> {
    let config = ConfigFile::load_from(config_path)?;
    Ok(BandCache::new(&config.cache.directory)?)
}

fn clear(cache: &BandCache) -> Result<Vec<String>, CliError> {
    let result = cache.clear()?;
    Ok(vec![format!(
        "Deleted {} files, freed {}",
        result.files_removed,
        format_size(result.bytes_freed)
    )])
}

fn stats(cache: &BandCache) -> Result<Vec<String>, CliError> {
    let stats = cache.stats()?;
    Ok(vec![
        format!("  Files: {}", stats.files),
        format!("  Size:  {}", format_size(stats.bytes)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use s2mosaic::config::ConfigFileError;
    use tempfile::TempDir;

    #[test]
    fn test_open_cache_uses_configured_directory() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.ini");
        let bands = temp.path().join("bands");
        std::fs::write(
            &config_path,
            format!("[cache]\ndirectory = {}\n", bands.display()),
        )
        .unwrap();

        let cache = open_cache(&config_path).unwrap();
        assert_eq!(cache.root(), bands.as_path());
    }

    #[test]
    fn test_open_cache_reports_invalid_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.ini");
        std::fs::write(&config_path, "[cache]\nenabled = maybe\n").unwrap();

        match open_cache(&config_path) {
            Err(CliError::Config(ConfigFileError::InvalidValue { key, .. })) => {
                assert_eq!(key, "enabled")
            }
            other => panic!("expected invalid config, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_stats_then_clear() {
        let temp = TempDir::new().unwrap();
        let cache = BandCache::new(temp.path()).unwrap();
        cache.put("https://example.com/B04.tif", &[0; 2048]).unwrap();

        assert_eq!(
            stats(&cache).unwrap(),
            vec!["  Files: 1".to_string(), "  Size:  2.0 KB".to_string()]
        );
        assert_eq!(
            clear(&cache).unwrap(),
            vec!["Deleted 1 files, freed 2.0 KB".to_string()]
        );
        assert_eq!(stats(&cache).unwrap()[0], "  Files: 0");
    }
}
