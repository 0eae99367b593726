//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[catalog]
; STAC API root used for scene searches
stac_url = {}
; Planetary Computer SAS token API used to sign asset URLs
; Leave empty for catalogs whose assets are public
sas_url = {}
; Sentinel-2 Level-2A collection identifier
collection = {}
; Items requested per search page (default: 100)
page_size = {}

[download]
; Timeout in seconds for a single HTTP request (default: 120)
timeout = {}
; Retries for transient HTTP failures, with exponential backoff (default: 3)
max_retries = {}
; Concurrent band downloads per scene (default: 4, max: 32)
workers = {}

[cache]
; Keep downloaded bands on disk and reuse them on later runs
enabled = {}
; Directory for cached bands
directory = {}

[logging]
; Log file, cleared at the start of each run
file = {}
"#,
        config.catalog.stac_url,
        config.catalog.sas_url,
        config.catalog.collection,
        config.catalog.page_size,
        config.download.timeout,
        config.download.max_retries,
        config.download.workers,
        config.cache.enabled,
        path_to_string(&config.cache.directory),
        path_to_string(&config.logging.file),
    )
}
