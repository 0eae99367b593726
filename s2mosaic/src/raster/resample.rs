//! Nearest-neighbour resampling

use super::types::Band;

/// Source index for output index `i` when mapping `src` cells onto `dst`.
///
/// Pixel centres are matched: output centre `(i + 0.5) / dst` falls in
/// source cell `floor((i + 0.5) * src / dst)`.
#[inline]
fn source_index(i: usize, src: usize, dst: usize) -> usize {
    let mapped = ((2 * i + 1) * src) / (2 * dst);
    mapped.min(src - 1)
}

/// Lookup table of source indices for every output index.
pub(crate) fn index_map(src: usize, dst: usize) -> Vec<usize> {
    (0..dst).map(|i| source_index(i, src, dst)).collect()
}

/// Resamples a band to `width` x `height` by nearest neighbour.
pub fn resample_nearest(band: &Band, width: usize, height: usize) -> Band {
    if band.width == width && band.height == height {
        return band.clone();
    }
    if band.width == 0 || band.height == 0 {
        return Band::zeros(width, height);
    }

    let cols = index_map(band.width, width);
    let rows = index_map(band.height, height);

    let mut data = Vec::with_capacity(width * height);
    for &src_row in &rows {
        let line = &band.data[src_row * band.width..(src_row + 1) * band.width];
        data.extend(cols.iter().map(|&c| line[c]));
    }

    Band {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_upsample_by_two_repeats_pixels() {
        let band = Band::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let up = resample_nearest(&band, 4, 4);
        assert_eq!(
            up.data,
            vec![
                1.0, 1.0, 2.0, 2.0, //
                1.0, 1.0, 2.0, 2.0, //
                3.0, 3.0, 4.0, 4.0, //
                3.0, 3.0, 4.0, 4.0,
            ]
        );
    }

    #[test]
    fn test_downsample_by_two() {
        let band = Band::new(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let down = resample_nearest(&band, 2, 1);
        assert_eq!(down.data, vec![2.0, 4.0]);
    }

    #[test]
    fn test_same_size_is_identity() {
        let band = Band::new(3, 1, vec![5.0, 6.0, 7.0]).unwrap();
        assert_eq!(resample_nearest(&band, 3, 1), band);
    }

    proptest! {
        #[test]
        fn test_index_map_in_bounds(src in 1usize..300, dst in 1usize..300) {
            let map = index_map(src, dst);
            prop_assert_eq!(map.len(), dst);
            prop_assert!(map.iter().all(|&i| i < src));
            prop_assert!(map.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
