//! GeoTIFF export of finished mosaics
//!
//! Images are written through the low-level `DirectoryEncoder` so any band
//! count can be stored as chunky (pixel-interleaved) samples. Strips are LZW
//! compressed with `weezl` using the TIFF flavour of the code-size switch.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, info};
use weezl::{encode::Encoder as LzwEncoder, BitOrder};

use super::reader::{
    KEY_GEOGRAPHIC_CRS, KEY_PROJECTED_CRS, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE,
    TAG_MODEL_TIEPOINT,
};
use super::types::{DataType, MosaicOutput, PixelData, RasterError};

const TAG_GDAL_METADATA: u16 = 42112;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

const COMPRESSION_LZW: u16 = 5;
const PHOTOMETRIC_MIN_IS_BLACK: u16 = 1;
const PHOTOMETRIC_RGB: u16 = 2;
const PLANAR_CHUNKY: u16 = 1;
const SAMPLE_FORMAT_UINT: u16 = 1;
const EXTRA_SAMPLE_UNSPECIFIED: u16 = 0;

/// Uncompressed bytes targeted per strip.
const STRIP_TARGET_BYTES: usize = 256 * 1024;

/// Writes [`MosaicOutput`]s as LZW-compressed GeoTIFFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffExporter;

impl GeoTiffExporter {
    pub fn new() -> Self {
        Self
    }

    /// Writes `output` to `path`, replacing any existing file.
    pub fn write(&self, path: &Path, output: &MosaicOutput) -> Result<(), RasterError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, output)?;
        writer.flush()?;

        info!(
            path = %path.display(),
            width = output.profile.width,
            height = output.profile.height,
            bands = output.profile.count,
            "Mosaic exported"
        );
        Ok(())
    }

    /// Writes `output` to any seekable writer.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        output: &MosaicOutput,
    ) -> Result<(), RasterError> {
        let profile = &output.profile;
        let (width, height, bands) = (profile.width, profile.height, profile.count);

        if width == 0 || height == 0 || bands == 0 {
            return Err(RasterError::Encode("raster has zero dimensions".to_string()));
        }
        if output.pixels.len() != width * height * bands {
            return Err(RasterError::ShapeMismatch {
                expected: format!("{}x{}x{}", bands, height, width),
                actual: format!("{} samples", output.pixels.len()),
            });
        }

        let interleaved = interleave(&output.pixels, width * height, bands);
        let bytes_per_sample = usize::from(profile.data_type.bits() / 8);
        let row_bytes = width * bands * bytes_per_sample;
        let rows_per_strip = (STRIP_TARGET_BYTES / row_bytes).clamp(1, height);

        let mut encoder = TiffEncoder::new(writer).map_err(encode_error)?;
        let mut dir = encoder.image_directory().map_err(encode_error)?;

        let to_u32 = |value: usize, what: &str| {
            u32::try_from(value).map_err(|_| RasterError::Encode(format!("{} too large", what)))
        };

        dir.write_tag(Tag::ImageWidth, to_u32(width, "width")?)
            .map_err(encode_error)?;
        dir.write_tag(Tag::ImageLength, to_u32(height, "height")?)
            .map_err(encode_error)?;
        let bits = vec![profile.data_type.bits(); bands];
        dir.write_tag(Tag::BitsPerSample, bits.as_slice())
            .map_err(encode_error)?;
        dir.write_tag(Tag::Compression, COMPRESSION_LZW)
            .map_err(encode_error)?;

        let is_rgb = bands == 3 && profile.data_type == DataType::UInt8;
        let photometric = if is_rgb {
            PHOTOMETRIC_RGB
        } else {
            PHOTOMETRIC_MIN_IS_BLACK
        };
        dir.write_tag(Tag::PhotometricInterpretation, photometric)
            .map_err(encode_error)?;
        dir.write_tag(Tag::SamplesPerPixel, bands as u16)
            .map_err(encode_error)?;
        let formats = vec![SAMPLE_FORMAT_UINT; bands];
        dir.write_tag(Tag::SampleFormat, formats.as_slice())
            .map_err(encode_error)?;
        dir.write_tag(Tag::PlanarConfiguration, PLANAR_CHUNKY)
            .map_err(encode_error)?;
        dir.write_tag(Tag::RowsPerStrip, to_u32(rows_per_strip, "strip")?)
            .map_err(encode_error)?;

        let colour_samples = if is_rgb { 3 } else { 1 };
        if bands > colour_samples {
            let extra = vec![EXTRA_SAMPLE_UNSPECIFIED; bands - colour_samples];
            dir.write_tag(Tag::ExtraSamples, extra.as_slice())
                .map_err(encode_error)?;
        }

        write_geotiff_tags(&mut dir, output)?;

        let mut offsets: Vec<u32> = Vec::new();
        let mut byte_counts: Vec<u32> = Vec::new();
        for strip in interleaved.chunks(row_bytes * rows_per_strip) {
            let compressed = LzwEncoder::with_tiff_size_switch(BitOrder::Msb, 8)
                .encode(strip)
                .map_err(|e| RasterError::Encode(format!("LZW: {}", e)))?;
            let offset = dir.write_data(compressed.as_slice()).map_err(encode_error)?;
            offsets.push(to_u32(offset as usize, "file")?);
            byte_counts.push(to_u32(compressed.len(), "strip")?);
        }
        debug!(strips = offsets.len(), rows_per_strip, "Wrote strips");

        dir.write_tag(Tag::StripOffsets, offsets.as_slice())
            .map_err(encode_error)?;
        dir.write_tag(Tag::StripByteCounts, byte_counts.as_slice())
            .map_err(encode_error)?;
        dir.finish().map_err(encode_error)?;

        Ok(())
    }
}

fn encode_error(e: tiff::TiffError) -> RasterError {
    RasterError::Encode(e.to_string())
}

/// Band-sequential samples to little-endian pixel-interleaved bytes.
fn interleave(pixels: &PixelData, pixels_per_band: usize, bands: usize) -> Vec<u8> {
    match pixels {
        PixelData::UInt8(values) => {
            let mut out = Vec::with_capacity(values.len());
            for i in 0..pixels_per_band {
                for b in 0..bands {
                    out.push(values[b * pixels_per_band + i]);
                }
            }
            out
        }
        PixelData::UInt16(values) => {
            let mut out = Vec::with_capacity(values.len() * 2);
            for i in 0..pixels_per_band {
                for b in 0..bands {
                    out.extend_from_slice(&values[b * pixels_per_band + i].to_le_bytes());
                }
            }
            out
        }
    }
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    output: &MosaicOutput,
) -> Result<(), RasterError> {
    let profile = &output.profile;
    let t = &profile.transform;

    let pixel_scale = [t.pixel_width, t.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), pixel_scale.as_slice())
        .map_err(encode_error)?;

    // Raster (0, 0) sits at the model origin
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(encode_error)?;

    let geokeys = geokey_directory(profile.epsg);
    dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(encode_error)?;

    if let Some(nodata) = profile.nodata {
        let text = format_nodata(nodata);
        dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), text.as_str())
            .map_err(encode_error)?;
    }

    if !profile.descriptions.is_empty() {
        let metadata = gdal_metadata(&profile.descriptions);
        dir.write_tag(Tag::Unknown(TAG_GDAL_METADATA), metadata.as_str())
            .map_err(encode_error)?;
    }

    Ok(())
}

fn format_nodata(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// GeoKey directory declaring a projected (or geographic) CRS by EPSG code.
fn geokey_directory(epsg: Option<u32>) -> Vec<u16> {
    let crs = epsg.and_then(|code| u16::try_from(code).ok());
    let geographic = matches!(crs, Some(4000..=4999));

    let mut keys = vec![1, 1, 0, 0];
    let model = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    keys.extend_from_slice(&[KEY_MODEL_TYPE, 0, 1, model]);
    keys.extend_from_slice(&[KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
    if let Some(code) = crs {
        let key = if geographic {
            KEY_GEOGRAPHIC_CRS
        } else {
            KEY_PROJECTED_CRS
        };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }
    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

/// GDAL metadata XML carrying per-band descriptions.
fn gdal_metadata(descriptions: &[String]) -> String {
    let mut xml = String::from("<GDALMetadata>");
    for (band, description) in descriptions.iter().enumerate() {
        xml.push_str(&format!(
            "<Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>",
            band,
            escape_xml(description)
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
