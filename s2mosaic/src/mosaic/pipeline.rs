//! The scene-by-scene mosaic pipeline.

use std::collections::HashMap;
use std::fs;
use std::io;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::composite::{normalise, should_stop, Compositor};
use crate::config::clamp_workers;
use crate::mask::{coverage_mask, valid_mask, CloudMasker, Mask, DEFAULT_DILATION};
use crate::raster::{
    read_band, read_band_at, resample_nearest, Band, BandGeo, GeoTiffExporter, GeoTransform,
    MosaicOutput, Profile, Raster,
};
use crate::scene::Scene;

use super::engine::{BandFetcher, Engine};
use super::request::VISUAL_BAND;
use super::{MosaicError, MosaicProgress, MosaicRequest, MosaicResult};

/// Bands whose zero-sum marks a pixel as outside the swath.
pub const VALIDITY_BANDS: [&str; 3] = ["B04", "B03", "B8A"];

/// Ground resolution masks are computed at, in metres.
pub const MASK_RESOLUTION: f64 = 20.0;

/// Ground resolution of the mosaic, in metres.
pub const OUTPUT_RESOLUTION: f64 = 10.0;

const VISUAL_DESCRIPTIONS: [&str; 3] = ["Red", "Green", "Blue"];

/// One sample of one asset.
#[derive(Debug, Clone, Copy)]
struct BandSpec<'a> {
    asset: &'a str,
    sample: usize,
}

impl<'a> BandSpec<'a> {
    fn single(asset: &'a str) -> Self {
        Self { asset, sample: 0 }
    }
}

/// Pixel grid of the mosaic, fixed by the first scene.
#[derive(Debug, Clone)]
struct OutputGrid {
    width: usize,
    height: usize,
    transform: GeoTransform,
    epsg: Option<u32>,
}

impl OutputGrid {
    /// The 10 m grid matching a 20 m mask grid.
    fn from_mask(mask: &Mask, geo: &BandGeo, fallback_epsg: u32) -> Self {
        let scale = MASK_RESOLUTION / OUTPUT_RESOLUTION;
        Self {
            width: (mask.width as f64 * scale).round() as usize,
            height: (mask.height as f64 * scale).round() as usize,
            transform: geo.transform.with_resolution(OUTPUT_RESOLUTION),
            epsg: geo.epsg.or(Some(fallback_epsg)),
        }
    }
}

/// Builds a cloud-free mosaic.
///
/// Scenes are searched, ranked and composited one at a time until either
/// the list is exhausted or a stopping rule fires. With an output directory
/// the mosaic is written as a GeoTIFF and its path returned; an existing
/// file is returned untouched when `overwrite` is off.
pub fn mosaic(request: &MosaicRequest, engine: &Engine) -> Result<MosaicResult, MosaicError> {
    let grid = request.validate()?;
    let range = request.date_range()?;
    grid.footprint()?;

    let export_path = match &request.output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = request.output_path(dir, &range);
            if path.exists() && !request.overwrite {
                info!(path = %path.display(), "Mosaic exists and overwrite is off, skipping");
                return Ok(MosaicResult::Exported(path));
            }
            Some(path)
        }
        None => None,
    };

    info!(
        grid = %grid,
        range = %range,
        method = %request.mosaic_method,
        bands = %request.required_bands.join(","),
        "Building mosaic"
    );

    let scenes = engine.find_scenes(request)?;
    if scenes.is_empty() {
        return Err(MosaicError::NoScenes {
            grid: grid.to_string(),
            start: range.start.format("%Y-%m-%d").to_string(),
            end: range.end.format("%Y-%m-%d").to_string(),
        });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(clamp_workers(request.max_download_workers))
        .thread_name(|i| format!("s2mosaic-download-{}", i))
        .build()
        .map_err(|e| io::Error::other(e.to_string()))?;
    let fetcher = engine.fetcher(request.cache_bands);

    let output = composite_scenes(request, engine, &pool, &fetcher, &scenes, grid.epsg())?;

    match export_path {
        Some(path) => {
            GeoTiffExporter::new().write(&path, &output)?;
            info!(path = %path.display(), "Mosaic written");
            Ok(MosaicResult::Exported(path))
        }
        None => Ok(MosaicResult::InMemory(output)),
    }
}

fn composite_scenes(
    request: &MosaicRequest,
    engine: &Engine,
    pool: &ThreadPool,
    fetcher: &BandFetcher<'_>,
    scenes: &[Scene],
    grid_epsg: u32,
) -> Result<MosaicOutput, MosaicError> {
    let visual = request.is_visual();
    let output_specs: Vec<BandSpec<'_>> = if visual {
        (0..VISUAL_DESCRIPTIONS.len())
            .map(|sample| BandSpec {
                asset: VISUAL_BAND,
                sample,
            })
            .collect()
    } else {
        request
            .required_bands
            .iter()
            .map(|b| BandSpec::single(b))
            .collect()
    };

    let masker = engine.cloud_masker();
    let mask_specs: Vec<BandSpec<'_>> = VALIDITY_BANDS
        .iter()
        .chain(masker.required_bands())
        .map(|&b| BandSpec::single(b))
        .collect();

    let progress = engine.progress();
    let total = scenes.len();
    progress.start(total);

    let mut state: Option<(OutputGrid, Compositor, Mask)> = None;

    for (index, scene) in scenes.iter().enumerate() {
        debug!(scene = scene.id(), orbit = scene.orbit, "Processing scene");

        let (usable_20m, geo) = scene_mask(pool, fetcher, scene, &mask_specs, masker)?;

        let (grid, compositor, coverage) = state.get_or_insert_with(|| {
            let grid = OutputGrid::from_mask(&usable_20m, &geo, grid_epsg);
            let footprints: Vec<_> = scenes.iter().filter_map(Scene::footprint).collect();
            let coverage =
                coverage_mask(grid.width, grid.height, &grid.transform, grid.epsg, &footprints);
            info!(
                width = grid.width,
                height = grid.height,
                covered = coverage.count(),
                "Output grid established"
            );
            let compositor = Compositor::new(
                request.mosaic_method,
                grid.width,
                grid.height,
                output_specs.len(),
            );
            (grid, compositor, coverage)
        });

        let usable = usable_20m.resize(grid.width, grid.height);
        let effective = compositor.effective_mask(&usable)?;

        if effective.count() == 0 {
            debug!(scene = scene.id(), "No usable pixels, skipping band download");
        } else {
            let bands = load_bands(pool, fetcher, scene, &output_specs, None)?;
            let raster = stack_bands(bands, grid.width, grid.height);
            compositor.add_scene(raster, &effective)?;
        }

        let stats = compositor.no_data(coverage)?;
        progress.scene_done(&MosaicProgress {
            scenes_done: index + 1,
            scenes_total: total,
            no_data_pct: stats.pct,
        });

        if should_stop(request.mosaic_method, &stats, request.no_data_threshold) {
            info!(
                scenes_used = index + 1,
                missing = stats.missing,
                "Stopping early, mosaic is complete enough"
            );
            break;
        }
    }
    progress.finish();

    let Some((grid, compositor, _)) = state else {
        return Err(MosaicError::InvalidRequest(
            "No scenes were composited".to_string(),
        ));
    };

    let raster = compositor.finish();
    let pixels = normalise(&raster, visual);
    let descriptions = if visual {
        VISUAL_DESCRIPTIONS.iter().map(|d| d.to_string()).collect()
    } else {
        request.required_bands.clone()
    };

    let profile = Profile {
        epsg: grid.epsg,
        transform: grid.transform,
        width: grid.width,
        height: grid.height,
        count: raster.bands,
        data_type: pixels.data_type(),
        nodata: if visual { None } else { Some(0.0) },
        descriptions,
    };
    Ok(MosaicOutput { pixels, profile })
}

/// Clear and valid pixels of a scene at [`MASK_RESOLUTION`], with the
/// georeferencing of its first validity band.
fn scene_mask(
    pool: &ThreadPool,
    fetcher: &BandFetcher<'_>,
    scene: &Scene,
    specs: &[BandSpec<'_>],
    masker: &dyn CloudMasker,
) -> Result<(Mask, BandGeo), MosaicError> {
    let decoded = load_bands(pool, fetcher, scene, specs, Some(MASK_RESOLUTION))?;
    let geo = decoded[0].1;
    let (validity, masker_bands): (Vec<Band>, Vec<Band>) = {
        let mut bands: Vec<Band> = decoded.into_iter().map(|(band, _)| band).collect();
        let rest = bands.split_off(VALIDITY_BANDS.len());
        (bands, rest)
    };

    let valid = valid_mask(&validity, DEFAULT_DILATION)?;
    let mut clear = masker.clear_mask(&masker_bands)?;
    if clear.shape() != valid.shape() {
        clear = clear.resize(valid.width, valid.height);
    }

    let usable = valid.and(&clear)?;
    debug!(
        scene = scene.id(),
        valid = valid.count(),
        usable = usable.count(),
        "Scene mask computed"
    );
    Ok((usable, geo))
}

/// Downloads the assets behind `specs` and decodes each sample.
///
/// Every asset is fetched once even when several samples are read from it.
/// Downloads and decoding both run on `pool`.
fn load_bands(
    pool: &ThreadPool,
    fetcher: &BandFetcher<'_>,
    scene: &Scene,
    specs: &[BandSpec<'_>],
    resolution: Option<f64>,
) -> Result<Vec<(Band, BandGeo)>, MosaicError> {
    let mut assets: Vec<&str> = specs.iter().map(|s| s.asset).collect();
    assets.sort_unstable();
    assets.dedup();

    pool.install(|| {
        let bytes: HashMap<&str, Vec<u8>> = assets
            .par_iter()
            .map(|&asset| -> Result<(&str, Vec<u8>), MosaicError> {
                let href = &scene.item.asset(asset)?.href;
                Ok((asset, fetcher.fetch(href)?))
            })
            .collect::<Result<_, _>>()?;

        specs
            .par_iter()
            .map(|spec| {
                let data = &bytes[spec.asset];
                let decoded = match resolution {
                    Some(res) => read_band_at(data, spec.sample, res),
                    None => read_band(data, spec.sample),
                };
                decoded.map_err(|source| MosaicError::Band {
                    scene: scene.id().to_string(),
                    band: spec.asset.to_string(),
                    source,
                })
            })
            .collect()
    })
}

/// Resamples decoded bands onto the output grid and stacks them.
fn stack_bands(bands: Vec<(Band, BandGeo)>, width: usize, height: usize) -> Raster {
    let mut raster = Raster::zeros(width, height, bands.len());
    for (index, (band, _)) in bands.into_iter().enumerate() {
        let band = if band.shape() == (width, height) {
            band
        } else {
            resample_nearest(&band, width, height)
        };
        raster.band_mut(index).copy_from_slice(&band.data);
    }
    raster
}
