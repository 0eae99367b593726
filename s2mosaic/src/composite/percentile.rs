//! Per-pixel percentile over masked scene stacks.

use rayon::prelude::*;
use tracing::info;

use crate::mask::Mask;
use crate::raster::Raster;

/// Rows processed per parallel work item.
pub const CHUNK_ROWS: usize = 100;

/// Quantile of `values` with linear interpolation between order statistics.
///
/// `values` is sorted in place. `q` is clamped to `[0, 1]`. Returns `None`
/// for an empty slice.
pub fn quantile(values: &mut [f32], q: f64) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);

    let position = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    let low = f64::from(values[lower]);
    let high = f64::from(values[upper]);
    Some((low + (high - low) * fraction) as f32)
}

/// Percentile mosaic of a stack of scenes.
///
/// Each output sample is the `percentile` of the observations whose mask is
/// set at that pixel; pixels without any observation are zero. Work is split
/// into chunks of [`CHUNK_ROWS`] rows processed in parallel.
pub fn percentile_mosaic(
    scenes: &[(Raster, Mask)],
    percentile: f64,
    width: usize,
    height: usize,
    bands: usize,
) -> Raster {
    let mut out = Raster::zeros(width, height, bands);
    if scenes.is_empty() || width == 0 || height == 0 {
        return out;
    }

    let q = percentile / 100.0;
    let chunks = height.div_ceil(CHUNK_ROWS);
    info!(
        scenes = scenes.len(),
        chunks,
        "Calculating percentile mosaic in chunks of {} rows",
        CHUNK_ROWS
    );

    for band in 0..bands {
        out.band_mut(band)
            .par_chunks_mut(CHUNK_ROWS * width)
            .enumerate()
            .for_each(|(chunk, rows)| {
                let first_pixel = chunk * CHUNK_ROWS * width;
                let mut values: Vec<f32> = Vec::with_capacity(scenes.len());
                for (offset, out_value) in rows.iter_mut().enumerate() {
                    let pixel = first_pixel + offset;
                    values.clear();
                    values.extend(
                        scenes
                            .iter()
                            .filter(|(_, mask)| mask.data[pixel])
                            .map(|(raster, _)| raster.band(band)[pixel]),
                    );
                    *out_value = quantile(&mut values, q).unwrap_or(0.0);
                }
            });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&mut v, 0.5), Some(2.5));
        assert_eq!(quantile(&mut v, 0.0), Some(1.0));
        assert_eq!(quantile(&mut v, 1.0), Some(4.0));
        assert_eq!(quantile(&mut v, 0.25), Some(1.75));
        assert_eq!(quantile(&mut [], 0.5), None);
        assert_eq!(quantile(&mut [7.0], 0.3), Some(7.0));
    }

    fn scene(values: &[f32], mask: &[bool]) -> (Raster, Mask) {
        let n = values.len();
        let raster = Raster {
            width: n,
            height: 1,
            bands: 1,
            data: values.to_vec(),
        };
        (raster, Mask::new(n, 1, mask.to_vec()).unwrap())
    }

    #[test]
    fn test_percentile_ignores_masked_observations() {
        let scenes = vec![
            scene(&[10.0, 100.0, 5.0], &[true, false, false]),
            scene(&[20.0, 1.0, 6.0], &[true, true, false]),
            scene(&[30.0, 2.0, 7.0], &[true, true, false]),
        ];
        let out = percentile_mosaic(&scenes, 50.0, 3, 1, 1);
        assert_eq!(out.data, vec![20.0, 1.5, 0.0]);
    }

    #[test]
    fn test_percentile_spans_chunks() {
        let height = CHUNK_ROWS * 2 + 7;
        let values: Vec<f32> = (0..height).map(|i| i as f32).collect();
        let raster = Raster {
            width: 1,
            height,
            bands: 1,
            data: values.clone(),
        };
        let mask = Mask::filled(1, height, true);
        let out = percentile_mosaic(&[(raster, mask)], 90.0, 1, height, 1);
        assert_eq!(out.data, values);
    }

    proptest! {
        #[test]
        fn test_quantile_within_bounds(
            mut values in prop::collection::vec(-1.0e6f32..1.0e6, 1..50),
            q in 0.0f64..=1.0
        ) {
            let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let result = quantile(&mut values, q).unwrap();
            prop_assert!(result >= min && result <= max);
        }
    }
}
