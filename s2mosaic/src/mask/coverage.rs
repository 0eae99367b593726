//! Rasterisation of scene footprints into a coverage mask.

use geo::{LineString, MultiPolygon};
use tracing::{debug, warn};

use super::Mask;
use crate::projection::LonLatProjector;
use crate::raster::GeoTransform;

/// Marks output pixels covered by at least one scene footprint.
///
/// Footprints are lon/lat polygons; they are projected into `epsg` and
/// filled by pixel centre with the even-odd rule. When there are no
/// footprints, or none can be projected, every pixel counts as covered.
pub fn coverage_mask(
    width: usize,
    height: usize,
    transform: &GeoTransform,
    epsg: Option<u32>,
    footprints: &[MultiPolygon<f64>],
) -> Mask {
    let full = || Mask::filled(width, height, true);

    let Some(epsg) = epsg else {
        debug!("Output CRS unknown; treating the whole grid as covered");
        return full();
    };
    if footprints.is_empty() {
        return full();
    }

    let projector = match LonLatProjector::new(epsg) {
        Ok(p) => p,
        Err(e) => {
            warn!(epsg, error = %e, "Cannot project footprints; treating the whole grid as covered");
            return full();
        }
    };

    let mut mask = Mask::filled(width, height, false);
    let mut rasterised = 0usize;
    for footprint in footprints {
        for polygon in footprint {
            let rings: Option<Vec<Vec<(f64, f64)>>> = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| project_ring(&projector, ring, transform))
                .collect();
            match rings {
                Some(rings) => {
                    fill_even_odd(&mut mask, &rings);
                    rasterised += 1;
                }
                None => warn!("Skipping footprint that failed to project"),
            }
        }
    }

    if rasterised == 0 {
        return full();
    }
    debug!(
        polygons = rasterised,
        covered = mask.count(),
        "Coverage mask rasterised"
    );
    mask
}

/// Projects a lon/lat ring into fractional pixel coordinates.
fn project_ring(
    projector: &LonLatProjector,
    ring: &LineString<f64>,
    transform: &GeoTransform,
) -> Option<Vec<(f64, f64)>> {
    ring.coords()
        .map(|c| {
            let (x, y) = projector.project(c.x, c.y).ok()?;
            Some((
                (x - transform.origin_x) / transform.pixel_width,
                (transform.origin_y - y) / transform.pixel_height,
            ))
        })
        .collect()
}

/// Sets pixels whose centre lies inside `rings` (pixel coordinates).
fn fill_even_odd(mask: &mut Mask, rings: &[Vec<(f64, f64)>]) {
    let mut crossings: Vec<f64> = Vec::new();
    for row in 0..mask.height {
        let y = row as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            for edge in ring.windows(2) {
                let ((x0, y0), (x1, y1)) = (edge[0], edge[1]);
                if (y0 > y) != (y1 > y) {
                    crossings.push(x0 + (y - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // Centres c + 0.5 within [start, end)
            let first = (span[0] - 0.5).ceil().max(0.0) as usize;
            let last = ((span[1] - 0.5).ceil().max(0.0) as usize).min(mask.width);
            for col in first..last {
                mask.data[row * mask.width + col] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn unit_rings(rings: &[Vec<(f64, f64)>], width: usize, height: usize) -> Mask {
        let mut mask = Mask::filled(width, height, false);
        fill_even_odd(&mut mask, rings);
        mask
    }

    #[test]
    fn test_fill_square() {
        let ring = vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0), (1.0, 1.0)];
        let mask = unit_rings(&[ring], 4, 4);
        let set: Vec<(usize, usize)> = (0..16)
            .filter(|&i| mask.data[i])
            .map(|i| (i % 4, i / 4))
            .collect();
        assert_eq!(set, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_fill_with_hole() {
        let outer = vec![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0), (0.0, 0.0)];
        let hole = vec![(2.0, 2.0), (3.0, 2.0), (3.0, 3.0), (2.0, 3.0), (2.0, 2.0)];
        let mask = unit_rings(&[outer, hole], 5, 5);
        assert_eq!(mask.count(), 24);
        assert!(!mask.get(2, 2));
    }

    #[test]
    fn test_fill_clips_to_grid() {
        let ring = vec![(-3.0, -3.0), (9.0, -3.0), (9.0, 9.0), (-3.0, 9.0), (-3.0, -3.0)];
        let mask = unit_rings(&[ring], 3, 2);
        assert_eq!(mask.count(), 6);
    }

    #[test]
    fn test_no_footprints_covers_everything() {
        let t = GeoTransform::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(coverage_mask(3, 3, &t, Some(32631), &[]).count(), 9);
        let any: Polygon<f64> = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert_eq!(
            coverage_mask(3, 3, &t, None, &[MultiPolygon::new(vec![any])]).count(),
            9
        );
    }

    #[test]
    fn test_projected_footprint_covers_half() {
        // 10 km grid centred on the zone 31 central meridian at the equator
        let transform = GeoTransform::new(495_000.0, 5_000.0, 1_000.0, 1_000.0);
        // Footprint spans only the eastern half (lon 3.0 .. 3.1)
        let footprint: Polygon<f64> = polygon![
            (x: 3.0, y: -0.1),
            (x: 3.1, y: -0.1),
            (x: 3.1, y: 0.1),
            (x: 3.0, y: 0.1),
            (x: 3.0, y: -0.1),
        ];
        let mask = coverage_mask(
            10,
            10,
            &transform,
            Some(32631),
            &[MultiPolygon::new(vec![footprint])],
        );
        assert_eq!(mask.count(), 50);
        assert!(mask.get(5, 5));
        assert!(!mask.get(4, 5));
    }
}
