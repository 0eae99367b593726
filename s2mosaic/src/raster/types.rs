//! Raster types shared by reader, resampler and writer

use std::fmt;

use thiserror::Error;

/// Errors raised while decoding or encoding rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to decode GeoTIFF: {0}")]
    Decode(String),

    #[error("Unsupported sample type: {0}")]
    UnsupportedSampleType(String),

    #[error("Sample {sample} requested but image has {available} samples per pixel")]
    SampleOutOfRange { sample: usize, available: usize },

    #[error("GeoTIFF carries no georeferencing ({0})")]
    MissingGeoreference(&'static str),

    #[error("Raster shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Failed to encode GeoTIFF: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tiff::TiffError> for RasterError {
    fn from(e: tiff::TiffError) -> Self {
        RasterError::Decode(e.to_string())
    }
}

/// Affine placement of a north-up raster.
///
/// `origin_x`/`origin_y` locate the outer corner of the top-left pixel;
/// `pixel_height` is positive and measured downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// The same origin with a different pixel size.
    pub fn with_resolution(&self, resolution: f64) -> Self {
        Self {
            pixel_width: resolution,
            pixel_height: resolution,
            ..*self
        }
    }

    /// World coordinates of the centre of pixel (`col`, `row`).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// GDAL-ordered coefficients `[x0, dx, 0, y0, 0, -dy]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            -self.pixel_height,
        ]
    }
}

/// A single band of `f32` samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Band {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, RasterError> {
        if data.len() != width * height {
            return Err(RasterError::ShapeMismatch {
                expected: format!("{}x{} ({} samples)", width, height, width * height),
                actual: format!("{} samples", data.len()),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.data[row * self.width + col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Georeferencing read from a GeoTIFF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandGeo {
    pub epsg: Option<u32>,
    pub transform: GeoTransform,
}

/// A multi-band raster stored band-sequentially.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub data: Vec<f32>,
}

impl Raster {
    pub fn zeros(width: usize, height: usize, bands: usize) -> Self {
        Self {
            width,
            height,
            bands,
            data: vec![0.0; width * height * bands],
        }
    }

    pub fn pixels_per_band(&self) -> usize {
        self.width * self.height
    }

    pub fn band(&self, index: usize) -> &[f32] {
        let n = self.pixels_per_band();
        &self.data[index * n..(index + 1) * n]
    }

    pub fn band_mut(&mut self, index: usize) -> &mut [f32] {
        let n = self.pixels_per_band();
        &mut self.data[index * n..(index + 1) * n]
    }
}

/// Sample type of an exported mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    UInt8,
    UInt16,
}

impl DataType {
    pub fn bits(&self) -> u16 {
        match self {
            DataType::UInt8 => 8,
            DataType::UInt16 => 16,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::UInt8 => write!(f, "uint8"),
            DataType::UInt16 => write!(f, "uint16"),
        }
    }
}

/// Normalised pixel storage of a finished mosaic, band-sequential.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
}

impl PixelData {
    pub fn data_type(&self) -> DataType {
        match self {
            PixelData::UInt8(_) => DataType::UInt8,
            PixelData::UInt16(_) => DataType::UInt16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::UInt8(v) => v.len(),
            PixelData::UInt16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample value as `f64`, for inspection and tests.
    pub fn value(&self, index: usize) -> f64 {
        match self {
            PixelData::UInt8(v) => f64::from(v[index]),
            PixelData::UInt16(v) => f64::from(v[index]),
        }
    }
}

/// Georeferencing and layout of a mosaic.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub epsg: Option<u32>,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub data_type: DataType,
    pub nodata: Option<f64>,
    pub descriptions: Vec<String>,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let crs = self
            .epsg
            .map(|code| format!("EPSG:{}", code))
            .unwrap_or_else(|| "unknown".to_string());
        let nodata = self
            .nodata
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string());
        writeln!(f, "CRS:         {}", crs)?;
        writeln!(f, "Size:        {} x {} x {}", self.width, self.height, self.count)?;
        writeln!(f, "Data type:   {}", self.data_type)?;
        writeln!(
            f,
            "Origin:      ({}, {})",
            self.transform.origin_x, self.transform.origin_y
        )?;
        writeln!(
            f,
            "Pixel size:  {} x {}",
            self.transform.pixel_width, self.transform.pixel_height
        )?;
        writeln!(f, "No data:     {}", nodata)?;
        write!(f, "Bands:       {}", self.descriptions.join(", "))
    }
}

/// A normalised mosaic with its profile.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicOutput {
    pub pixels: PixelData,
    pub profile: Profile,
}

impl MosaicOutput {
    /// Sample of `band` at (`col`, `row`).
    pub fn value(&self, band: usize, col: usize, row: usize) -> f64 {
        let p = &self.profile;
        self.pixels
            .value(band * p.width * p.height + row * p.width + col)
    }
}
