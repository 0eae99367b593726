//! Coordinate projection between WGS84 and projected EPSG systems.
//!
//! PROJ definitions come from the `crs-definitions` database and points are
//! transformed with `proj4rs`, which takes and returns geographic
//! coordinates in radians.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// PROJ string for an EPSG code.
///
/// WGS84 / UTM codes are built directly so they do not depend on the
/// database contents.
pub fn proj_string(epsg: u32) -> Option<String> {
    match epsg {
        32601..=32660 => Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            epsg - 32600
        )),
        32701..=32760 => Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            epsg - 32700
        )),
        _ => u16::try_from(epsg)
            .ok()
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4.to_string()),
    }
}

/// Projects longitude/latitude degrees into a target CRS.
pub struct LonLatProjector {
    source: Proj,
    target: Proj,
    target_is_geographic: bool,
}

impl LonLatProjector {
    pub fn new(target_epsg: u32) -> Result<Self, String> {
        let target_str = proj_string(target_epsg)
            .ok_or_else(|| format!("EPSG:{} is not in the crs-definitions database", target_epsg))?;
        let source = Proj::from_proj_string(WGS84_LONLAT)
            .map_err(|e| format!("Invalid WGS84 projection: {:?}", e))?;
        let target = Proj::from_proj_string(&target_str)
            .map_err(|e| format!("Invalid projection EPSG:{}: {:?}", target_epsg, e))?;
        Ok(Self {
            source,
            target,
            target_is_geographic: target_str.contains("+proj=longlat"),
        })
    }

    /// Projects one point given in degrees.
    pub fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), String> {
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&self.source, &self.target, &mut point)
            .map_err(|e| format!("Transform of ({}, {}) failed: {:?}", lon, lat, e))?;
        if self.target_is_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_proj_strings() {
        assert_eq!(
            proj_string(32631).unwrap(),
            "+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs"
        );
        assert!(proj_string(32750).unwrap().contains("+south"));
    }

    #[test]
    fn test_project_central_meridian() {
        // Zone 31 central meridian is 3 degrees east
        let projector = LonLatProjector::new(32631).unwrap();
        let (x, y) = projector.project(3.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_project_southern_hemisphere() {
        let projector = LonLatProjector::new(32750).unwrap();
        let (x, y) = projector.project(117.0, -32.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3);
        assert!(y > 6_400_000.0 && y < 6_500_000.0);
    }
}
