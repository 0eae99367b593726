//! Raster I/O
//!
//! Decoding of Sentinel-2 GeoTIFF assets into `f32` bands, nearest-neighbour
//! resampling between the 10 m, 20 m and 60 m grids, and LZW-compressed
//! GeoTIFF export of finished mosaics.

mod reader;
pub(crate) mod resample;
mod types;
mod writer;

pub use reader::{read_band, read_band_at};
pub use resample::resample_nearest;
pub use types::{
    Band, BandGeo, DataType, GeoTransform, MosaicOutput, PixelData, Profile, Raster, RasterError,
};
pub use writer::GeoTiffExporter;
