//! Disk cache for downloaded band assets.
//!
//! Re-running a mosaic over the same tile and period fetches the same COG
//! files again. With caching enabled each downloaded asset is stored on disk
//! under the SHA-256 of its *unsigned* href; signed hrefs carry short-lived
//! tokens and would never hit.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   ab/
//!     ab3f...e1.tif
//!   c0/
//!     c04d...9a.tif
//! ```

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, trace, warn};

const ENTRY_EXTENSION: &str = "tif";
const TEMP_EXTENSION: &str = "part";

/// Errors raised by the band cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cache directory could not be created.
    #[error("Cannot create cache directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

/// Size of the cache on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub files: usize,
    pub bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} files, {}", self.files, format_size(self.bytes))
    }
}

/// Result of clearing the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    /// Number of entries removed.
    pub files_removed: usize,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl fmt::Display for ClearResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Removed {} files, freed {}",
            self.files_removed,
            format_size(self.bytes_freed)
        )
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Content-addressed store of downloaded asset bytes.
#[derive(Debug, Clone)]
pub struct BandCache {
    root: PathBuf,
}

impl BandCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| CacheError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Default location, `~/.cache/s2mosaic/bands`.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("s2mosaic")
            .join("bands")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache key of an unsigned href.
    pub fn key(href: &str) -> String {
        let digest = Sha256::digest(href.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn entry_path(&self, href: &str) -> PathBuf {
        let key = Self::key(href);
        self.root
            .join(&key[..2])
            .join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Cached bytes for `href`, if present.
    ///
    /// Unreadable entries are treated as misses.
    pub fn get(&self, href: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(href);
        match fs::read(&path) {
            Ok(bytes) => {
                trace!(href, "Band cache hit");
                Some(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache entry");
                None
            }
        }
    }

    /// Stores bytes for `href`.
    ///
    /// The entry is written to a temporary file and renamed into place so
    /// concurrent readers never observe a partial file.
    pub fn put(&self, href: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(href);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = path.with_extension(format!(
            "{}.{}",
            TEMP_EXTENSION,
            std::process::id()
        ));
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(href, bytes = bytes.len(), "Band cached");
        Ok(())
    }

    /// Number of entries and their total size.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for path in self.entries()? {
            stats.files += 1;
            stats.bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        }
        Ok(stats)
    }

    /// Removes every entry.
    pub fn clear(&self) -> Result<ClearResult, CacheError> {
        let mut result = ClearResult::default();
        for path in self.entries()? {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path)?;
            result.files_removed += 1;
            result.bytes_freed += size;
        }

        // Drop emptied fan-out directories
        for dir in fs::read_dir(&self.root)?.flatten() {
            if dir.path().is_dir() {
                let _ = fs::remove_dir(dir.path());
            }
        }
        Ok(result)
    }

    fn entries(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut paths = Vec::new();
        if !self.root.exists() {
            return Ok(paths);
        }
        for shard in fs::read_dir(&self.root)? {
            let shard = shard?.path();
            if !shard.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&shard)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HREF: &str =
        "https://sentinel2l2a01.blob.core.windows.net/sentinel2-l2/50/H/MH/B04_10m.tif";

    #[test]
    fn test_key_is_sha256_hex() {
        let key = BandCache::key("abc");
        assert_eq!(
            key,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let cache = BandCache::new(temp.path()).unwrap();

        assert!(cache.get(HREF).is_none());
        cache.put(HREF, &[1, 2, 3]).unwrap();
        assert_eq!(cache.get(HREF), Some(vec![1, 2, 3]));

        let key = BandCache::key(HREF);
        assert!(temp
            .path()
            .join(&key[..2])
            .join(format!("{}.tif", key))
            .exists());
    }

    #[test]
    fn test_put_overwrites() {
        let temp = TempDir::new().unwrap();
        let cache = BandCache::new(temp.path()).unwrap();
        cache.put(HREF, &[1]).unwrap();
        cache.put(HREF, &[2, 2]).unwrap();
        assert_eq!(cache.get(HREF), Some(vec![2, 2]));
        assert_eq!(cache.stats().unwrap().files, 1);
    }

    #[test]
    fn test_stats_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = BandCache::new(temp.path().join("bands")).unwrap();
        cache.put("a", &[0; 10]).unwrap();
        cache.put("b", &[0; 20]).unwrap();

        assert_eq!(
            cache.stats().unwrap(),
            CacheStats {
                files: 2,
                bytes: 30
            }
        );

        let cleared = cache.clear().unwrap();
        assert_eq!(cleared.files_removed, 2);
        assert_eq!(cleared.bytes_freed, 30);
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
