//! Zone boundary helpers: manual polygon entry, ring closure, and
//! normalization of whatever shape the API stored in `area`.

use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Position, Value};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("são necessários ao menos 3 vértices válidos (encontrados {0})")]
    TooFewVertices(usize),

    #[error("GeoJSON inválido: {0}")]
    InvalidGeoJson(String),
}

/// Bounding box of a zone area, in lon/lat degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Parse one vertex per line (`lon,lat[,alt]`) into a closed polygon.
///
/// Tokens may be separated by commas or whitespace. Anything that is not a
/// number is dropped, and a line left with fewer than two numbers is ignored.
pub fn parse_manual_polygon(text: &str) -> Result<Geometry, GeometryError> {
    let mut ring: Vec<Position> = text
        .lines()
        .filter_map(|line| {
            let numbers: Vec<f64> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|token| token.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite())
                .collect();
            match numbers.len() {
                0 | 1 => None,
                2 => Some(numbers),
                _ => Some(numbers[..3].to_vec()),
            }
        })
        .collect();

    if ring.len() < 3 {
        return Err(GeometryError::TooFewVertices(ring.len()));
    }

    close_ring(&mut ring);
    Ok(Geometry::new(Value::Polygon(vec![ring])))
}

/// Append the first vertex when the ring is not already closed
pub fn close_ring(ring: &mut Vec<Position>) {
    let open = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) => first != last,
        _ => false,
    };
    if open {
        let first = ring[0].clone();
        ring.push(first);
    }
}

/// Normalize a stored `area` into a FeatureCollection.
///
/// Collections pass through, a Feature is wrapped, a bare geometry becomes a
/// single feature with empty properties.
pub fn to_feature_collection(value: &serde_json::Value) -> Result<FeatureCollection, GeometryError> {
    let geojson = GeoJson::from_json_value(value.clone())
        .map_err(|e| GeometryError::InvalidGeoJson(e.to_string()))?;

    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => collection_of(vec![feature]),
        GeoJson::Geometry(geometry) => collection_of(vec![feature_of(geometry)]),
    })
}

pub fn feature_of(geometry: Geometry) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(JsonObject::new()),
        foreign_members: None,
    }
}

pub fn collection_of(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Bounding box of every geometry in the collection, `None` when there is nothing to frame
pub fn bounds(fc: &FeatureCollection) -> Option<Bounds> {
    let collection = geojson::quick_collection::<f64>(&GeoJson::FeatureCollection(fc.clone())).ok()?;
    let rect = collection.bounding_rect()?;
    Some(Bounds {
        min_lon: rect.min().x,
        min_lat: rect.min().y,
        max_lon: rect.max().x,
        max_lat: rect.max().y,
    })
}

/// Count of vertices across the collection, used for the zone summary
pub fn vertex_count(fc: &FeatureCollection) -> usize {
    fn count(value: &Value) -> usize {
        match value {
            Value::Point(_) => 1,
            Value::MultiPoint(points) | Value::LineString(points) => points.len(),
            Value::MultiLineString(lines) | Value::Polygon(lines) => lines.iter().map(Vec::len).sum(),
            Value::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(|rings| rings.iter().map(Vec::len))
                .sum(),
            Value::GeometryCollection(geometries) => geometries.iter().map(|g| count(&g.value)).sum(),
        }
    }

    fc.features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|g| count(&g.value))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exterior(geometry: &Geometry) -> Vec<Position> {
        match &geometry.value {
            Value::Polygon(rings) => rings[0].clone(),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_polygon_is_closed() {
        let text = "-51.10,-26.00,0\n-51.00,-26.00,0\n-51.00,-25.90,0";
        let ring = exterior(&parse_manual_polygon(text).unwrap());
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[0], vec![-51.10, -26.00, 0.0]);
    }

    #[test]
    fn test_manual_polygon_already_closed_is_untouched() {
        let text = "1,1\n2,1\n2,2\n1,1";
        let ring = exterior(&parse_manual_polygon(text).unwrap());
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[3], vec![1.0, 1.0]);
    }

    #[test]
    fn test_manual_polygon_drops_garbage_tokens() {
        // "abc" and the blank line vanish, the "x" line keeps its two numbers
        let text = "abc\n\n10 20\n11, 20, x\n11 21 5\n";
        let ring = exterior(&parse_manual_polygon(text).unwrap());
        assert_eq!(ring[0], vec![10.0, 20.0]);
        assert_eq!(ring[1], vec![11.0, 20.0]);
        assert_eq!(ring[2], vec![11.0, 21.0, 5.0]);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_manual_polygon_needs_three_vertices() {
        let err = parse_manual_polygon("1,1\nfoo\n2,2").unwrap_err();
        assert_eq!(err, GeometryError::TooFewVertices(2));
        assert_eq!(parse_manual_polygon("").unwrap_err(), GeometryError::TooFewVertices(0));
    }

    #[test]
    fn test_close_ring_idempotent() {
        let mut ring = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        close_ring(&mut ring);
        close_ring(&mut ring);
        assert_eq!(ring.len(), 4);

        let mut empty: Vec<Position> = vec![];
        close_ring(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_bare_geometry_is_wrapped() {
        let area = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        let fc = to_feature_collection(&area).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert_eq!(fc.features[0].properties.as_ref().map(|p| p.len()), Some(0));

        let again = to_feature_collection(&serde_json::to_value(&fc).unwrap()).unwrap();
        assert_eq!(again.features.len(), 1);
    }

    #[test]
    fn test_invalid_area_rejected() {
        let err = to_feature_collection(&json!({ "type": "Nope" })).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidGeoJson(_)));
    }

    #[test]
    fn test_bounds_and_vertex_count() {
        let polygon = parse_manual_polygon("-51.2,-26.1\n-51.0,-26.1\n-51.0,-25.9").unwrap();
        let point = Geometry::new(Value::Point(vec![-51.5, -26.0]));
        let fc = collection_of(vec![feature_of(polygon), feature_of(point)]);

        let b = bounds(&fc).unwrap();
        assert_eq!(b.min_lon, -51.5);
        assert_eq!(b.max_lon, -51.0);
        assert_eq!(b.min_lat, -26.1);
        assert_eq!(b.max_lat, -25.9);
        assert_eq!(vertex_count(&fc), 5);

        assert!(bounds(&collection_of(vec![])).is_none());
    }
}
