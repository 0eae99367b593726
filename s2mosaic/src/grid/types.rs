//! Grid identifier types and errors

use std::fmt;

use thiserror::Error;

/// Minimum UTM zone number.
pub const MIN_ZONE: u8 = 1;

/// Maximum UTM zone number.
pub const MAX_ZONE: u8 = 60;

/// Edge length of a Sentinel-2 tile in metres (10980 pixels at 10 m).
pub const S2_TILE_SIZE_M: f64 = 109_800.0;

/// Edge length of an MGRS 100 km square in metres.
pub const SQUARE_SIZE_M: f64 = 100_000.0;

/// Latitude band letters from 80°S northwards, eight degrees each.
pub(super) const LATITUDE_BANDS: &str = "CDEFGHJKLMNPQRSTUVWX";

/// Row letters of the 100 km squares; the sequence repeats every 2000 km.
pub(super) const ROW_LETTERS: &str = "ABCDEFGHJKLMNPQRSTUV";

/// Column letter sets, selected by `zone % 3`.
pub(super) const COLUMN_SETS: [&str; 3] = ["STUVWXYZ", "ABCDEFGH", "JKLMNPQR"];

const GRID_HELP: &str = "It should be in the format '50HMH'. \
     For more info on the S2 grid system visit https://sentiwiki.copernicus.eu/web/s2-products";

/// Errors raised while interpreting a grid identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GridError {
    /// The identifier is not upper-case alphanumeric.
    #[error("Grid {0} is invalid. {GRID_HELP}")]
    InvalidFormat(String),

    /// The identifier is well formed but names no Sentinel-2 tile.
    #[error("Grid {0} not found. {GRID_HELP}")]
    NotFound(String),

    /// Projecting the footprint to geographic coordinates failed.
    #[error("Failed to project footprint of grid {grid}: {reason}")]
    Projection { grid: String, reason: String },
}

/// A Sentinel-2 tile identifier on the MGRS grid, e.g. `50HMH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridId {
    /// UTM zone (1-60)
    pub zone: u8,
    /// Latitude band letter (C-X, without I and O)
    pub band: char,
    /// 100 km square column letter
    pub column: char,
    /// 100 km square row letter
    pub row: char,
}

impl GridId {
    /// Whether the tile lies north of the equator.
    pub fn is_northern(&self) -> bool {
        self.band >= 'N'
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.zone, self.band, self.column, self.row)
    }
}

/// UTM footprint of a tile, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmBounds {
    pub min_easting: f64,
    pub min_northing: f64,
    pub max_easting: f64,
    pub max_northing: f64,
}

impl UtmBounds {
    /// Corner points in counter-clockwise order starting at the south-west.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_easting, self.min_northing),
            (self.max_easting, self.min_northing),
            (self.max_easting, self.max_northing),
            (self.min_easting, self.max_northing),
        ]
    }
}
