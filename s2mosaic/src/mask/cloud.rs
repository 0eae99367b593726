//! Cloud masking.

use super::{Mask, MaskError};
use crate::raster::Band;

/// Scene Classification Layer classes treated as clear by default:
/// vegetation (4), not vegetated (5), water (6), unclassified (7) and
/// snow (11).
pub const DEFAULT_CLEAR_CLASSES: [u8; 5] = [4, 5, 6, 7, 11];

const SCL_BANDS: &[&str] = &["SCL"];

/// Produces a per-pixel clear-sky mask for a scene.
///
/// Implementations name the assets they need; the pipeline downloads them
/// at 20 m and passes them to [`CloudMasker::clear_mask`] in the same order.
pub trait CloudMasker: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Asset keys this masker reads.
    fn required_bands(&self) -> &[&str];

    /// Mask set where the sky is clear.
    fn clear_mask(&self, bands: &[Band]) -> Result<Mask, MaskError>;
}

/// Cloud masker driven by the L2A Scene Classification Layer.
#[derive(Debug, Clone)]
pub struct SclCloudMasker {
    clear: [bool; 256],
}

impl SclCloudMasker {
    pub fn new() -> Self {
        Self::with_clear_classes(&DEFAULT_CLEAR_CLASSES)
    }

    /// Uses a custom set of clear classes.
    pub fn with_clear_classes(classes: &[u8]) -> Self {
        let mut clear = [false; 256];
        for &class in classes {
            clear[usize::from(class)] = true;
        }
        Self { clear }
    }

    pub fn is_clear(&self, class: u8) -> bool {
        self.clear[usize::from(class)]
    }
}

impl Default for SclCloudMasker {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudMasker for SclCloudMasker {
    fn name(&self) -> &str {
        "scl"
    }

    fn required_bands(&self) -> &[&str] {
        SCL_BANDS
    }

    fn clear_mask(&self, bands: &[Band]) -> Result<Mask, MaskError> {
        let [scl] = bands else {
            return Err(MaskError::BandCount {
                masker: self.name().to_string(),
                expected: 1,
                actual: bands.len(),
            });
        };

        let data = scl
            .data
            .iter()
            .map(|&v| (0.0..=255.0).contains(&v) && self.is_clear(v as u8))
            .collect();
        Mask::new(scl.width, scl.height, data)
    }
}
