//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::defaults::clamp_workers;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = section.get("stac_url") {
            let v = v.trim();
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid("catalog", "stac_url", v, "must be an http(s) URL"));
            }
            config.catalog.stac_url = v.to_string();
        }
        if let Some(v) = section.get("sas_url") {
            // Empty disables asset signing
            config.catalog.sas_url = v.trim().to_string();
        }
        if let Some(v) = section.get("collection") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("catalog", "collection", v, "must not be empty"));
            }
            config.catalog.collection = v.to_string();
        }
        if let Some(v) = section.get("page_size") {
            config.catalog.page_size = match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("catalog", "page_size", v, "must be a positive integer")),
            };
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            config.download.timeout = match v.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(invalid(
                        "download",
                        "timeout",
                        v,
                        "must be a positive integer (seconds)",
                    ))
                }
            };
        }
        if let Some(v) = section.get("max_retries") {
            config.download.max_retries = v
                .trim()
                .parse()
                .map_err(|_| invalid("download", "max_retries", v, "must be a non-negative integer"))?;
        }
        if let Some(v) = section.get("workers") {
            let parsed: usize = v
                .trim()
                .parse()
                .map_err(|_| invalid("download", "workers", v, "must be a positive integer"))?;
            config.download.workers = clamp_workers(parsed);
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("enabled") {
            config.cache.enabled = parse_bool(v)
                .ok_or_else(|| invalid("cache", "enabled", v, "must be true or false"))?;
        }
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse a boolean setting.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
