//! GeoJSON geometry decoding for scene footprints.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;

fn parse_ring(value: &Value) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = value
        .as_array()?
        .iter()
        .map(|point| {
            let pair = point.as_array()?;
            Some(Coord {
                x: pair.first()?.as_f64()?,
                y: pair.get(1)?.as_f64()?,
            })
        })
        .collect::<Option<_>>()?;

    if coords.len() < 3 {
        return None;
    }
    Some(LineString::new(coords))
}

fn parse_polygon(value: &Value) -> Option<Polygon<f64>> {
    let mut rings = value.as_array()?.iter().map(parse_ring);
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Reads a GeoJSON `Polygon` or `MultiPolygon` geometry.
///
/// Other geometry types and malformed coordinates yield `None`.
pub fn parse_geojson_polygons(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(MultiPolygon::new(vec![parse_polygon(coordinates)?])),
        "MultiPolygon" => {
            let polygons = coordinates
                .as_array()?
                .iter()
                .map(parse_polygon)
                .collect::<Option<Vec<_>>>()?;
            Some(MultiPolygon::new(polygons))
        }
        _ => None,
    }
}
