//! Sentinel-2 tiling grid
//!
//! Sentinel-2 L2A products are cut on the MGRS grid. This module decodes a
//! tile identifier such as `50HMH` into its UTM footprint and the WGS84
//! polygon used to query the catalog.
//!
//! # Identifier layout
//!
//! ```text
//!   50    H     M      H
//!   zone  band  column row
//! ```
//!
//! The footprint is anchored at the south-west corner of the 100 km square
//! and extends 109.8 km east and north, the extent of a Sentinel-2 tile.

mod types;

pub use types::{GridError, GridId, UtmBounds, MAX_ZONE, MIN_ZONE, S2_TILE_SIZE_M, SQUARE_SIZE_M};

use std::sync::OnceLock;

use geo::{Coord, LineString, Polygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use regex::Regex;

use types::{COLUMN_SETS, LATITUDE_BANDS, ROW_LETTERS};

/// Vertices inserted along each footprint edge when projecting.
const EDGE_SEGMENTS: usize = 8;

/// Northing repeat distance of the MGRS row lettering.
const ROW_CYCLE_M: f64 = 2_000_000.0;

fn grid_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{1,2})([A-Z])([A-Z])([A-Z])$").ok())
        .as_ref()
}

impl GridId {
    /// Parses a grid identifier such as `50HMH`.
    ///
    /// Identifiers that are not upper-case alphanumeric are rejected with
    /// [`GridError::InvalidFormat`]; well-formed identifiers that name no
    /// Sentinel-2 tile yield [`GridError::NotFound`].
    pub fn parse(value: &str) -> Result<Self, GridError> {
        let alphanumeric = !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric());
        let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
        let upper = value.chars().all(|c| !c.is_ascii_lowercase());
        if !alphanumeric || !has_letter || !upper {
            return Err(GridError::InvalidFormat(value.to_string()));
        }

        let not_found = || GridError::NotFound(value.to_string());
        let captures = grid_pattern()
            .and_then(|pattern| pattern.captures(value))
            .ok_or_else(not_found)?;

        let zone: u8 = captures[1].parse().map_err(|_| not_found())?;
        let band = first_char(&captures[2]).ok_or_else(not_found)?;
        let column = first_char(&captures[3]).ok_or_else(not_found)?;
        let row = first_char(&captures[4]).ok_or_else(not_found)?;

        if !(MIN_ZONE..=MAX_ZONE).contains(&zone) {
            return Err(not_found());
        }
        if !LATITUDE_BANDS.contains(band) {
            return Err(not_found());
        }
        // Svalbard exception: these zones do not exist in band X
        if band == 'X' && matches!(zone, 32 | 34 | 36) {
            return Err(not_found());
        }
        if !column_set(zone).contains(column) || !ROW_LETTERS.contains(row) {
            return Err(not_found());
        }
        // The row letter repeats every 2000 km; the square must start inside the band
        if square_northing(zone, band, row) >= band_max_northing(band) {
            return Err(not_found());
        }

        Ok(Self {
            zone,
            band,
            column,
            row,
        })
    }

    /// EPSG code of the WGS84 / UTM zone the tile is projected in.
    pub fn epsg(&self) -> u32 {
        let base = if self.is_northern() { 32600 } else { 32700 };
        base + u32::from(self.zone)
    }

    /// UTM footprint of the Sentinel-2 tile.
    pub fn utm_bounds(&self) -> UtmBounds {
        let min_easting = square_easting(self.zone, self.column);
        let min_northing = square_northing(self.zone, self.band, self.row);
        UtmBounds {
            min_easting,
            min_northing,
            max_easting: min_easting + S2_TILE_SIZE_M,
            max_northing: min_northing + S2_TILE_SIZE_M,
        }
    }

    /// PROJ definition of the tile's UTM zone.
    pub fn proj_string(&self) -> String {
        let hemisphere = if self.is_northern() { "" } else { " +south" };
        format!(
            "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
            self.zone, hemisphere
        )
    }

    /// Footprint as a WGS84 longitude/latitude polygon.
    ///
    /// Edges are densified before projection so the polygon follows the
    /// curvature of the UTM grid lines.
    pub fn footprint(&self) -> Result<Polygon<f64>, GridError> {
        let projection_error = |reason: String| GridError::Projection {
            grid: self.to_string(),
            reason,
        };

        let utm = Proj::from_proj_string(&self.proj_string())
            .map_err(|e| projection_error(format!("{:?}", e)))?;
        let wgs84 = Proj::from_proj_string("+proj=longlat +datum=WGS84 +no_defs")
            .map_err(|e| projection_error(format!("{:?}", e)))?;

        let corners = self.utm_bounds().corners();
        let mut ring = Vec::with_capacity(corners.len() * EDGE_SEGMENTS + 1);
        for (i, &(x0, y0)) in corners.iter().enumerate() {
            let (x1, y1) = corners[(i + 1) % corners.len()];
            for step in 0..EDGE_SEGMENTS {
                let t = step as f64 / EDGE_SEGMENTS as f64;
                let mut point = (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, 0.0);
                transform(&utm, &wgs84, &mut point)
                    .map_err(|e| projection_error(format!("{:?}", e)))?;
                ring.push(Coord {
                    x: point.0.to_degrees(),
                    y: point.1.to_degrees(),
                });
            }
        }
        if let Some(&first) = ring.first() {
            ring.push(first);
        }

        Ok(Polygon::new(LineString::from(ring), vec![]))
    }
}

impl std::str::FromStr for GridId {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn first_char(s: &str) -> Option<char> {
    s.chars().next()
}

fn column_set(zone: u8) -> &'static str {
    COLUMN_SETS[usize::from(zone % 3)]
}

fn square_easting(zone: u8, column: char) -> f64 {
    let index = column_set(zone).find(column).unwrap_or(0);
    (index as f64 + 1.0) * SQUARE_SIZE_M
}

/// Minimum northing of a latitude band, including the southern false northing.
fn band_min_northing(band: char) -> f64 {
    match band {
        'C' => 1_100_000.0,
        'D' => 2_000_000.0,
        'E' => 2_800_000.0,
        'F' => 3_700_000.0,
        'G' => 4_600_000.0,
        'H' => 5_500_000.0,
        'J' => 6_400_000.0,
        'K' => 7_300_000.0,
        'L' => 8_200_000.0,
        'M' => 9_100_000.0,
        'N' => 0.0,
        'P' => 800_000.0,
        'Q' => 1_700_000.0,
        'R' => 2_600_000.0,
        'S' => 3_500_000.0,
        'T' => 4_400_000.0,
        'U' => 5_300_000.0,
        'V' => 6_200_000.0,
        'W' => 7_000_000.0,
        _ => 7_900_000.0,
    }
}

/// Highest northing reached by a latitude band's northern edge within a zone.
fn band_max_northing(band: char) -> f64 {
    match band {
        'C' => 2_012_000.0,
        'D' => 2_903_000.0,
        'E' => 3_794_000.0,
        'F' => 4_684_000.0,
        'G' => 5_573_000.0,
        'H' => 6_460_000.0,
        'J' => 7_346_000.0,
        'K' => 8_232_000.0,
        'L' => 9_116_000.0,
        'M' => 10_000_000.0,
        'N' => 890_000.0,
        'P' => 1_779_000.0,
        'Q' => 2_668_000.0,
        'R' => 3_557_000.0,
        'S' => 4_446_000.0,
        'T' => 5_334_000.0,
        'U' => 6_223_000.0,
        'V' => 7_111_000.0,
        'W' => 8_000_000.0,
        _ => 9_332_000.0,
    }
}

fn square_northing(zone: u8, band: char, row: char) -> f64 {
    let index = ROW_LETTERS.find(row).unwrap_or(0);
    let offset = if zone % 2 == 0 { 5 } else { 0 };
    let cycle_position = (index + ROW_LETTERS.len() - offset) % ROW_LETTERS.len();

    let mut northing = cycle_position as f64 * SQUARE_SIZE_M;
    let minimum = band_min_northing(band);
    while northing < minimum {
        northing += ROW_CYCLE_M;
    }
    northing
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{BoundingRect, Contains, Point};

    #[test]
    fn test_parse_valid_id() {
        let id = GridId::parse("50HMH").unwrap();
        assert_eq!(id.zone, 50);
        assert_eq!(id.band, 'H');
        assert_eq!(id.column, 'M');
        assert_eq!(id.row, 'H');
    }

    #[test]
    fn test_parse_single_digit_zone() {
        let id = GridId::parse("4QFJ").unwrap();
        assert_eq!(id.zone, 4);
        assert_eq!(id.to_string(), "4QFJ");
    }

    #[test]
    fn test_lowercase_is_invalid_format() {
        let result = GridId::parse("50hmh");
        assert!(matches!(result, Err(GridError::InvalidFormat(_))));
    }

    #[test]
    fn test_punctuation_is_invalid_format() {
        assert!(matches!(
            GridId::parse("50-HMH"),
            Err(GridError::InvalidFormat(_))
        ));
        assert!(matches!(GridId::parse(""), Err(GridError::InvalidFormat(_))));
        assert!(matches!(
            GridId::parse("12345"),
            Err(GridError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unknown_tiles_are_not_found() {
        // Zone out of range
        assert!(matches!(GridId::parse("61HMH"), Err(GridError::NotFound(_))));
        // Band letter I does not exist
        assert!(matches!(GridId::parse("50IMH"), Err(GridError::NotFound(_))));
        // Column A belongs to zones 1, 4, 7, ...
        assert!(matches!(GridId::parse("50HAH"), Err(GridError::NotFound(_))));
        // Row letters stop at V
        assert!(matches!(GridId::parse("50HMW"), Err(GridError::NotFound(_))));
        // Svalbard gap
        assert!(matches!(GridId::parse("32XMH"), Err(GridError::NotFound(_))));
        // Wrong shape
        assert!(matches!(GridId::parse("50HM"), Err(GridError::NotFound(_))));
    }

    #[test]
    fn test_row_outside_latitude_band_is_not_found() {
        // Row V of zone 50 lands at 7400 km, north of band H (40S to 32S)
        assert!(matches!(GridId::parse("50HMV"), Err(GridError::NotFound(_))));
        // Row A of zone 31 lands at 6000 km, north of band T (40N to 48N)
        assert!(matches!(GridId::parse("31TDA"), Err(GridError::NotFound(_))));
        // Lowest and highest rows inside band H
        assert!(GridId::parse("50HMA").is_ok());
        assert!(GridId::parse("50HMK").is_ok());
        assert!(matches!(GridId::parse("50HML"), Err(GridError::NotFound(_))));
    }

    #[test]
    fn test_epsg_by_hemisphere() {
        assert_eq!(GridId::parse("50HMH").unwrap().epsg(), 32750);
        assert_eq!(GridId::parse("31UDQ").unwrap().epsg(), 32631);
    }

    #[test]
    fn test_utm_bounds_paris_tile() {
        let bounds = GridId::parse("31UDQ").unwrap().utm_bounds();
        assert_eq!(bounds.min_easting, 400_000.0);
        assert_eq!(bounds.min_northing, 5_400_000.0);
        assert_eq!(bounds.max_easting, 509_800.0);
        assert_eq!(bounds.max_northing, 5_509_800.0);
    }

    #[test]
    fn test_utm_bounds_southern_tile() {
        let bounds = GridId::parse("50HMH").unwrap().utm_bounds();
        assert_eq!(bounds.min_easting, 400_000.0);
        assert_eq!(bounds.min_northing, 6_200_000.0);
    }

    #[test]
    fn test_footprint_contains_paris() {
        let footprint = GridId::parse("31UDQ").unwrap().footprint().unwrap();
        assert!(footprint.contains(&Point::new(2.3522, 48.8566)));
        assert!(!footprint.contains(&Point::new(4.8357, 45.7640)));
    }

    #[test]
    fn test_footprint_southern_hemisphere() {
        let footprint = GridId::parse("50HMH").unwrap().footprint().unwrap();
        let rect = footprint.bounding_rect().unwrap();
        assert!(rect.min().x > 115.0 && rect.max().x < 117.5);
        assert!(rect.min().y > -35.0 && rect.max().y < -33.0);
    }

    #[test]
    fn test_footprint_is_closed_ring() {
        let footprint = GridId::parse("31UDQ").unwrap().footprint().unwrap();
        let ring = footprint.exterior();
        assert_eq!(ring.0.first(), ring.0.last());
        assert_eq!(ring.0.len(), 4 * EDGE_SEGMENTS + 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn valid_ids() -> impl Strategy<Value = String> {
            (1u8..=60, 0usize..19, 0usize..8, 0usize..20).prop_map(|(zone, b, c, r)| {
                let band = LATITUDE_BANDS.chars().nth(b).unwrap();
                let column = column_set(zone).chars().nth(c).unwrap();
                let row = ROW_LETTERS.chars().nth(r).unwrap();
                format!("{}{}{}{}", zone, band, column, row)
            })
        }

        proptest! {
            #[test]
            fn test_parse_display_roundtrip(id in valid_ids()) {
                match GridId::parse(&id) {
                    Ok(parsed) => prop_assert_eq!(parsed.to_string(), id),
                    Err(e) => prop_assert!(matches!(e, GridError::NotFound(_))),
                }
            }

            #[test]
            fn test_bounds_lie_in_band_range(id in valid_ids()) {
                if let Ok(parsed) = GridId::parse(&id) {
                    let bounds = parsed.utm_bounds();
                    prop_assert!(bounds.min_easting >= 100_000.0);
                    prop_assert!(bounds.max_easting <= 909_800.0);
                    prop_assert!(bounds.min_northing >= band_min_northing(parsed.band));
                    prop_assert!(bounds.min_northing < band_max_northing(parsed.band));
                }
            }
        }
    }
}
