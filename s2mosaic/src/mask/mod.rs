//! Pixel masks
//!
//! Three masks decide which pixels of a scene enter the mosaic:
//!
//! - the *valid* mask drops no-data pixels and a margin around them, since
//!   edge pixels of a swath are unreliable,
//! - the *clear* mask from a [`CloudMasker`] drops clouds and shadows,
//! - the *coverage* mask marks which output pixels any scene can fill, so
//!   unreachable pixels do not count as missing data.
//!
//! Validity and cloud masks are computed on the 20 m grid and upsampled to
//! the 10 m output grid.

mod cloud;
mod coverage;

pub use cloud::{CloudMasker, SclCloudMasker, DEFAULT_CLEAR_CLASSES};
pub use coverage::coverage_mask;

use thiserror::Error;

use crate::raster::{resample::index_map, Band};

/// Default number of dilation steps applied to no-data areas.
pub const DEFAULT_DILATION: usize = 4;

/// Errors raised while building masks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MaskError {
    #[error("Mask shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Cloud masker {masker} expected {expected} bands, got {actual}")]
    BandCount {
        masker: String,
        expected: usize,
        actual: usize,
    },

    #[error("No bands supplied")]
    NoBands,
}

/// A boolean raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self, MaskError> {
        if data.len() != width * height {
            return Err(MaskError::ShapeMismatch {
                expected: (width, height),
                actual: (data.len(), 1),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, col: usize, row: usize) -> bool {
        self.data[row * self.width + col]
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    fn check_shape(&self, other: &Mask) -> Result<(), MaskError> {
        if self.shape() != other.shape() {
            return Err(MaskError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }

    /// Pixel-wise conjunction.
    pub fn and(&self, other: &Mask) -> Result<Mask, MaskError> {
        self.check_shape(other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a && b)
            .collect();
        Ok(Mask {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Pixels set here but not in `other`.
    pub fn and_not(&self, other: &Mask) -> Result<Mask, MaskError> {
        self.check_shape(other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a && !b)
            .collect();
        Ok(Mask {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Number of pixels set in both masks.
    pub fn count_and(&self, other: &Mask) -> Result<usize, MaskError> {
        self.check_shape(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .filter(|&(&a, &b)| a && b)
            .count())
    }

    pub fn invert(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }

    /// Nearest-neighbour resize, e.g. from the 20 m to the 10 m grid.
    pub fn resize(&self, width: usize, height: usize) -> Mask {
        if self.shape() == (width, height) {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 {
            return Mask::filled(width, height, false);
        }
        let cols = index_map(self.width, width);
        let rows = index_map(self.height, height);
        let mut data = Vec::with_capacity(width * height);
        for &r in &rows {
            let line = &self.data[r * self.width..(r + 1) * self.width];
            data.extend(cols.iter().map(|&c| line[c]));
        }
        Mask {
            width,
            height,
            data,
        }
    }

    /// Grows set pixels by `steps` with the 4-connected structuring element.
    ///
    /// Equivalent to `steps` successive binary dilations with the cross
    /// kernel: a pixel ends up set when its city-block distance to a set
    /// pixel is at most `steps`.
    pub fn dilate(&self, steps: usize) -> Mask {
        if steps == 0 {
            return self.clone();
        }
        let distance = city_block_distance(self);
        Mask {
            width: self.width,
            height: self.height,
            data: distance.into_iter().map(|d| d as usize <= steps).collect(),
        }
    }
}

/// City-block distance from every pixel to the nearest set pixel.
///
/// Two raster passes suffice for the L1 metric.
fn city_block_distance(mask: &Mask) -> Vec<u32> {
    let (w, h) = mask.shape();
    let far = u32::MAX / 2;
    let mut d: Vec<u32> = mask.data.iter().map(|&v| if v { 0 } else { far }).collect();

    for r in 0..h {
        for c in 0..w {
            let i = r * w + c;
            if r > 0 {
                d[i] = d[i].min(d[i - w] + 1);
            }
            if c > 0 {
                d[i] = d[i].min(d[i - 1] + 1);
            }
        }
    }
    for r in (0..h).rev() {
        for c in (0..w).rev() {
            let i = r * w + c;
            if r + 1 < h {
                d[i] = d[i].min(d[i + w] + 1);
            }
            if c + 1 < w {
                d[i] = d[i].min(d[i + 1] + 1);
            }
        }
    }
    d
}

/// Mask of usable pixels across a stack of bands.
///
/// A pixel is no-data when its values sum to zero over all bands. No-data
/// areas are dilated `dilation` times before the mask is inverted, trimming
/// unreliable pixels along swath edges.
pub fn valid_mask(bands: &[Band], dilation: usize) -> Result<Mask, MaskError> {
    let first = bands.first().ok_or(MaskError::NoBands)?;
    let (width, height) = first.shape();
    for band in bands {
        if band.shape() != (width, height) {
            return Err(MaskError::ShapeMismatch {
                expected: (width, height),
                actual: band.shape(),
            });
        }
    }

    let no_data: Vec<bool> = (0..width * height)
        .map(|i| bands.iter().map(|b| b.data[i]).sum::<f32>() == 0.0)
        .collect();
    let no_data = Mask {
        width,
        height,
        data: no_data,
    };

    Ok(no_data.dilate(dilation).invert())
}
