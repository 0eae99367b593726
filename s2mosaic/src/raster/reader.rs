//! In-memory GeoTIFF band decoding.
//!
//! Sentinel-2 assets are Cloud Optimized GeoTIFFs. The whole file is held in
//! memory and the first (full resolution) image is decoded with the `tiff`
//! crate; overviews are ignored.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::trace;

use super::resample::resample_nearest;
use super::types::{Band, BandGeo, GeoTransform, RasterError};

pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;

pub(crate) const KEY_PROJECTED_CRS: u16 = 3072;
pub(crate) const KEY_GEOGRAPHIC_CRS: u16 = 2048;

/// Decodes one sample of a GeoTIFF held in memory.
///
/// `sample` is the 0-based sample index within each pixel; single-band
/// assets use 0, the true-colour `visual` asset has samples 0..3.
pub fn read_band(bytes: &[u8], sample: usize) -> Result<(Band, BandGeo), RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);
    let geo = read_geo(&mut decoder)?;

    let image = decoder.read_image()?;
    let samples: Vec<f32> = match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(RasterError::UnsupportedSampleType(format!(
                "{:?}",
                decoder.colortype()
            )))
        }
    };

    let pixels = width * height;
    if pixels == 0 {
        return Err(RasterError::Decode("image has no pixels".to_string()));
    }
    let per_pixel = samples.len() / pixels;
    if sample >= per_pixel {
        return Err(RasterError::SampleOutOfRange {
            sample,
            available: per_pixel,
        });
    }

    let data = if per_pixel == 1 {
        samples
    } else {
        samples
            .into_iter()
            .skip(sample)
            .step_by(per_pixel)
            .take(pixels)
            .collect()
    };

    trace!(width, height, sample, samples_per_pixel = per_pixel, "Decoded band");
    Ok((Band::new(width, height, data)?, geo))
}

/// Decodes a band and resamples it to the requested ground resolution.
///
/// The target size is `native size * native resolution / resolution`; the
/// returned georeferencing keeps the origin and carries the new pixel size.
pub fn read_band_at(
    bytes: &[u8],
    sample: usize,
    resolution: f64,
) -> Result<(Band, BandGeo), RasterError> {
    let (band, geo) = read_band(bytes, sample)?;
    let native = geo.transform.pixel_width;
    if (native - resolution).abs() < f64::EPSILON {
        return Ok((band, geo));
    }

    let scale = native / resolution;
    let width = ((band.width as f64) * scale).round().max(1.0) as usize;
    let height = ((band.height as f64) * scale).round().max(1.0) as usize;
    let resampled = resample_nearest(&band, width, height);

    Ok((
        resampled,
        BandGeo {
            epsg: geo.epsg,
            transform: geo.transform.with_resolution(resolution),
        },
    ))
}

fn read_geo<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<BandGeo, RasterError> {
    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE))
        .map_err(|_| RasterError::MissingGeoreference("ModelPixelScale"))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT))
        .map_err(|_| RasterError::MissingGeoreference("ModelTiepoint"))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterError::MissingGeoreference("short GeoTIFF tag"));
    }

    // Tiepoint ties raster (i, j) to model (x, y)
    let (sx, sy) = (scale[0], scale[1]);
    let transform = GeoTransform::new(
        tiepoint[3] - tiepoint[0] * sx,
        tiepoint[4] + tiepoint[1] * sy,
        sx,
        sy,
    );

    let epsg = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
        .ok()
        .and_then(|keys| crs_from_geokeys(&keys));

    Ok(BandGeo { epsg, transform })
}

/// EPSG code stored inline in a GeoKey directory.
///
/// The directory is a header of four shorts followed by one
/// `(key, location, count, value)` entry per key; only inline values
/// (location 0) are read.
pub(crate) fn crs_from_geokeys(keys: &[u16]) -> Option<u32> {
    let count = usize::from(*keys.get(3)?);
    let entries = keys.get(4..)?;
    let lookup = |wanted: u16| {
        entries
            .chunks_exact(4)
            .take(count)
            .find(|entry| entry[0] == wanted && entry[1] == 0)
            .map(|entry| u32::from(entry[3]))
    };
    lookup(KEY_PROJECTED_CRS).or_else(|| lookup(KEY_GEOGRAPHIC_CRS))
}
