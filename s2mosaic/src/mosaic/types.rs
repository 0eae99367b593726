//! Mosaic types and errors

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::catalog::CatalogError;
use crate::composite::CompositeError;
use crate::dates::DateRangeError;
use crate::grid::GridError;
use crate::mask::MaskError;
use crate::raster::{MosaicOutput, RasterError};

/// Errors raised while building a mosaic.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// A request parameter is out of range or inconsistent.
    #[error("{0}")]
    InvalidRequest(String),

    /// The grid id is malformed or unknown.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The catalog search returned nothing for the period.
    #[error("No scenes found for {grid} between {start} and {end}")]
    NoScenes {
        grid: String,
        start: String,
        end: String,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A downloaded asset could not be decoded.
    #[error("Failed to read {band} of {scene}: {source}")]
    Band {
        scene: String,
        band: String,
        source: RasterError,
    },

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Mask error: {0}")]
    Mask(#[from] MaskError),

    #[error("Composite error: {0}")]
    Composite(#[from] CompositeError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<DateRangeError> for MosaicError {
    fn from(e: DateRangeError) -> Self {
        MosaicError::InvalidRequest(e.to_string())
    }
}

/// Outcome of a successful mosaic run.
#[derive(Debug, Clone)]
pub enum MosaicResult {
    /// The mosaic was written, or already existed, at this path.
    Exported(PathBuf),
    /// No output directory was given; the pixels and profile are returned.
    InMemory(MosaicOutput),
}

impl MosaicResult {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            MosaicResult::Exported(path) => Some(path),
            MosaicResult::InMemory(_) => None,
        }
    }

    pub fn output(&self) -> Option<&MosaicOutput> {
        match self {
            MosaicResult::Exported(_) => None,
            MosaicResult::InMemory(output) => Some(output),
        }
    }
}

/// Progress after a scene has been composited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MosaicProgress {
    pub scenes_done: usize,
    pub scenes_total: usize,
    /// Share of the covered area still without data, in percent.
    pub no_data_pct: f64,
}

impl fmt::Display for MosaicProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_progress(
            self.scenes_done,
            self.scenes_total,
            self.no_data_pct,
        ))
    }
}

/// Renders the one-line progress message.
pub fn format_progress(done: usize, total: usize, no_data_pct: f64) -> String {
    format!(
        "Scenes: {}/{} | Mosaic currently contains {:.2}% no data pixels",
        done, total, no_data_pct
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_progress() {
        assert_eq!(
            format_progress(3, 12, 4.56789),
            "Scenes: 3/12 | Mosaic currently contains 4.57% no data pixels"
        );
        assert_eq!(
            format_progress(0, 1, 100.0),
            "Scenes: 0/1 | Mosaic currently contains 100.00% no data pixels"
        );
    }

    #[test]
    fn test_progress_display_matches_format() {
        let progress = MosaicProgress {
            scenes_done: 2,
            scenes_total: 5,
            no_data_pct: 0.5,
        };
        assert_eq!(progress.to_string(), format_progress(2, 5, 0.5));
    }

    #[test]
    fn test_no_scenes_message() {
        let err = MosaicError::NoScenes {
            grid: "50HMH".to_string(),
            start: "2022-01-01".to_string(),
            end: "2022-04-01".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No scenes found for 50HMH between 2022-01-01 and 2022-04-01"
        );
    }
}
