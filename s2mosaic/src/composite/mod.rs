//! Scene compositing
//!
//! The [`Compositor`] receives scenes in ranking order together with the
//! mask of pixels each may contribute, tracks how much of the covered area
//! has been filled, and produces the final mosaic when asked.
//!
//! ```text
//! scene ──► effective_mask ──► add_scene ──► no_data ──► should_stop?
//!                                                   │
//!                                   finish ◄────────┘
//! ```

mod method;
mod percentile;

pub use method::MosaicMethod;
pub use percentile::{percentile_mosaic, quantile, CHUNK_ROWS};

use thiserror::Error;
use tracing::debug;

use crate::mask::{Mask, MaskError};
use crate::raster::{PixelData, Raster};

/// Errors raised while configuring or feeding the compositor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompositeError {
    #[error("Invalid mosaic method: {0}. Must be one of mean, first, percentile")]
    UnknownMethod(String),

    #[error("percentile_value is only valid for percentile mosaic method, got {0}")]
    PercentileNotAllowed(f64),

    #[error("percentile_value must be provided for percentile mosaic method")]
    PercentileRequired,

    #[error("percentile_value must be between 0 and 100, got {0}")]
    PercentileRange(f64),

    #[error("Scene has {actual} bands, mosaic expects {expected}")]
    BandCount { expected: usize, actual: usize },

    #[error("Scene is {actual:?}, mosaic grid is {expected:?}")]
    Shape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// Share of the covered area still without data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoDataStats {
    /// Pixels any scene footprint covers.
    pub possible: usize,
    /// Covered pixels not yet filled.
    pub missing: usize,
    /// `missing` as a percentage of `possible`.
    pub pct: f64,
}

impl NoDataStats {
    pub fn compute(coverage: &Mask, filled: &Mask) -> Result<Self, MaskError> {
        let possible = coverage.count();
        let completed = coverage.count_and(filled)?;
        let missing = possible - completed;
        let pct = if possible == 0 {
            0.0
        } else {
            (1.0 - completed as f64 / possible as f64) * 100.0
        };
        Ok(Self {
            possible,
            missing,
            pct,
        })
    }
}

/// Whether compositing can stop after the current scene.
///
/// `First` stops once nothing is missing. With a threshold the loop stops
/// as soon as the missing count drops below `possible * threshold`.
pub fn should_stop(method: MosaicMethod, stats: &NoDataStats, threshold: Option<f64>) -> bool {
    if method == MosaicMethod::First && stats.missing == 0 {
        return true;
    }
    match threshold {
        Some(t) => (stats.missing as f64) < stats.possible as f64 * t,
        None => false,
    }
}

/// Accumulates masked scenes into a mosaic.
pub struct Compositor {
    method: MosaicMethod,
    width: usize,
    height: usize,
    bands: usize,
    sum: Raster,
    stack: Vec<(Raster, Mask)>,
    good_count: Vec<u32>,
    scenes: usize,
}

impl Compositor {
    pub fn new(method: MosaicMethod, width: usize, height: usize, bands: usize) -> Self {
        let sum = match method {
            MosaicMethod::Percentile(_) => Raster::zeros(0, 0, bands),
            _ => Raster::zeros(width, height, bands),
        };
        Self {
            method,
            width,
            height,
            bands,
            sum,
            stack: Vec::new(),
            good_count: vec![0; width * height],
            scenes: 0,
        }
    }

    pub fn method(&self) -> MosaicMethod {
        self.method
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn scenes_added(&self) -> usize {
        self.scenes
    }

    /// Pixels that have received at least one observation.
    pub fn filled(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self.good_count.iter().map(|&c| c != 0).collect(),
        }
    }

    /// Restricts a scene's usable pixels according to the method.
    ///
    /// `First` only takes pixels that are still empty; the other methods
    /// use every usable pixel.
    pub fn effective_mask(&self, usable: &Mask) -> Result<Mask, CompositeError> {
        self.check_shape(usable.shape())?;
        match self.method {
            MosaicMethod::First => Ok(usable.and_not(&self.filled())?),
            _ => Ok(usable.clone()),
        }
    }

    /// Adds a scene; samples outside `mask` are zeroed first.
    pub fn add_scene(&mut self, mut scene: Raster, mask: &Mask) -> Result<(), CompositeError> {
        self.check_shape((scene.width, scene.height))?;
        self.check_shape(mask.shape())?;
        if scene.bands != self.bands {
            return Err(CompositeError::BandCount {
                expected: self.bands,
                actual: scene.bands,
            });
        }

        let n = self.width * self.height;
        for band in 0..self.bands {
            for (value, &keep) in scene.band_mut(band).iter_mut().zip(&mask.data) {
                if !keep {
                    *value = 0.0;
                }
            }
        }
        for (count, &keep) in self.good_count.iter_mut().zip(&mask.data) {
            if keep {
                *count += 1;
            }
        }

        match self.method {
            MosaicMethod::Percentile(_) => self.stack.push((scene, mask.clone())),
            _ => {
                for (acc, value) in self.sum.data.iter_mut().zip(&scene.data) {
                    *acc += *value;
                }
            }
        }
        self.scenes += 1;
        debug!(
            scene = self.scenes,
            pixels = n,
            added = mask.count(),
            "Scene accumulated"
        );
        Ok(())
    }

    /// Filled-area statistics against a coverage mask.
    pub fn no_data(&self, coverage: &Mask) -> Result<NoDataStats, CompositeError> {
        self.check_shape(coverage.shape())?;
        Ok(NoDataStats::compute(coverage, &self.filled())?)
    }

    /// Produces the composited bands.
    pub fn finish(self) -> Raster {
        match self.method {
            MosaicMethod::Mean => {
                let mut mosaic = self.sum;
                let n = self.width * self.height;
                for band in 0..self.bands {
                    let values = &mut mosaic.data[band * n..(band + 1) * n];
                    for (value, &count) in values.iter_mut().zip(&self.good_count) {
                        *value = if count == 0 {
                            0.0
                        } else {
                            *value / count as f32
                        };
                    }
                }
                mosaic
            }
            MosaicMethod::First => self.sum,
            MosaicMethod::Percentile(p) => {
                percentile_mosaic(&self.stack, p, self.width, self.height, self.bands)
            }
        }
    }

    fn check_shape(&self, shape: (usize, usize)) -> Result<(), CompositeError> {
        if shape != (self.width, self.height) {
            return Err(CompositeError::Shape {
                expected: (self.width, self.height),
                actual: shape,
            });
        }
        Ok(())
    }
}

/// Converts a float mosaic to its output sample type.
///
/// True-colour mosaics clip to `0..=255` as bytes; reflectance bands clip
/// to `0..=65535` as unsigned 16-bit values. NaN becomes zero.
pub fn normalise(raster: &Raster, visual: bool) -> PixelData {
    if visual {
        PixelData::UInt8(
            raster
                .data
                .iter()
                .map(|&v| if v.is_nan() { 0 } else { v.clamp(0.0, 255.0) as u8 })
                .collect(),
        )
    } else {
        PixelData::UInt16(
            raster
                .data
                .iter()
                .map(|&v| if v.is_nan() { 0 } else { v.clamp(0.0, 65535.0) as u16 })
                .collect(),
        )
    }
}
