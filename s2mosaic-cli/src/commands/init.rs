//! Init command - initialize configuration file.

use std::path::Path;

use s2mosaic::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    let existed = write_config(&path)?;

    if existed {
        println!("Updated configuration file: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Edit this file to customize s2mosaic settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Writes the config file at `path`, returning whether it already existed.
///
/// An existing file is loaded and re-saved, which fills in keys added since
/// it was written and keeps the user's values. A file with invalid values is
/// reported and left untouched.
fn write_config(path: &Path) -> Result<bool, CliError> {
    let existed = path.exists();
    let config = ConfigFile::load_from(path)?;
    config.save_to(path)?;
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_then_updates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("s2mosaic").join("config.ini");

        assert!(!write_config(&path).unwrap());
        assert!(path.exists());
        assert!(write_config(&path).unwrap());
    }

    #[test]
    fn test_invalid_config_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[download]\ntimeout = soon\n").unwrap();

        let result = write_config(&path);
        assert!(matches!(result, Err(CliError::Config(_))));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[download]\ntimeout = soon\n"
        );
    }
}
