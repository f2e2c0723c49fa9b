//! KMZ/KML ingestion for zone boundaries.
//!
//! A KMZ is a zip archive carrying one KML document. We pick the first
//! `.kml` entry, walk its `Placemark`s and emit one GeoJSON Feature each.

use std::io::{Cursor, Read};
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Position, Value};
use roxmltree::Node;
use thiserror::Error;
use tracing::debug;

use crate::geometry::{close_ring, collection_of};

#[derive(Error, Debug)]
pub enum KmzError {
    #[error("arquivo KMZ inválido: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Nenhum arquivo .kml foi encontrado dentro do .kmz.")]
    NoKml,

    #[error("KML ilegível: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("O arquivo KML não contém dados geográficos válidos.")]
    NoFeatures,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read a KMZ from disk
pub fn load_kmz_file(path: impl AsRef<Path>) -> Result<FeatureCollection, KmzError> {
    let bytes = std::fs::read(path.as_ref())?;
    read_kmz(&bytes)
}

/// Extract the embedded KML from a KMZ archive and convert it
pub fn read_kmz(bytes: &[u8]) -> Result<FeatureCollection, KmzError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let kml_name = archive
        .file_names()
        .find(|name| name.to_lowercase().ends_with(".kml"))
        .map(str::to_owned);
    let Some(name) = kml_name else {
        return Err(KmzError::NoKml);
    };

    let mut entry = archive.by_name(&name)?;
    debug!(entry = entry.name(), size = entry.size(), "reading KML from KMZ");
    let mut text = String::new();
    entry.read_to_string(&mut text)?;

    parse_kml(&text)
}

/// Convert a KML document into a FeatureCollection (one Feature per Placemark)
pub fn parse_kml(text: &str) -> Result<FeatureCollection, KmzError> {
    let doc = roxmltree::Document::parse(text)?;

    let features: Vec<Feature> = doc
        .descendants()
        .filter(|n| is(n, "Placemark"))
        .map(placemark_to_feature)
        .collect();

    if features.is_empty() {
        return Err(KmzError::NoFeatures);
    }
    debug!(features = features.len(), "KML converted");
    Ok(collection_of(features))
}

fn is(node: &Node, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

fn child<'a, 'input>(node: &Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is(c, local_name))
}

fn child_text(node: &Node, local_name: &str) -> Option<String> {
    child(node, local_name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn placemark_to_feature(placemark: Node) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(name) = child_text(&placemark, "name") {
        properties.insert("name".to_string(), name.into());
    }
    if let Some(description) = child_text(&placemark, "description") {
        properties.insert("description".to_string(), description.into());
    }
    if let Some(extended) = child(&placemark, "ExtendedData") {
        for data in extended.children().filter(|c| is(c, "Data")) {
            if let Some(key) = data.attribute("name") {
                let value = child_text(&data, "value").unwrap_or_default();
                properties.insert(key.to_string(), value.into());
            }
        }
    }

    let geometry = placemark
        .children()
        .filter(|c| c.is_element())
        .find_map(|c| geometry_from(&c));

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn geometry_from(node: &Node) -> Option<Geometry> {
    let value = match node.tag_name().name() {
        "Point" => {
            let mut coords = coordinates_of(node);
            if coords.is_empty() {
                return None;
            }
            Value::Point(coords.swap_remove(0))
        }
        "LineString" => {
            let coords = coordinates_of(node);
            if coords.is_empty() {
                return None;
            }
            Value::LineString(coords)
        }
        "LinearRing" => {
            let ring = ring_of(node)?;
            Value::Polygon(vec![ring])
        }
        "Polygon" => {
            let outer = child(node, "outerBoundaryIs")
                .and_then(|b| child(&b, "LinearRing"))
                .and_then(|r| ring_of(&r))?;
            let mut rings = vec![outer];
            rings.extend(
                node.children()
                    .filter(|c| is(c, "innerBoundaryIs"))
                    .filter_map(|b| child(&b, "LinearRing"))
                    .filter_map(|r| ring_of(&r)),
            );
            Value::Polygon(rings)
        }
        "MultiGeometry" => {
            let parts: Vec<Geometry> = node
                .children()
                .filter(|c| c.is_element())
                .filter_map(|c| geometry_from(&c))
                .collect();
            if parts.is_empty() {
                return None;
            }
            Value::GeometryCollection(parts)
        }
        _ => return None,
    };
    Some(Geometry::new(value))
}

fn ring_of(node: &Node) -> Option<Vec<Position>> {
    let mut ring = coordinates_of(node);
    if ring.is_empty() {
        return None;
    }
    close_ring(&mut ring);
    Some(ring)
}

/// `<coordinates>` holds whitespace-separated `lon,lat[,alt]` tuples
fn coordinates_of(node: &Node) -> Vec<Position> {
    let Some(text) = child(node, "coordinates").and_then(|c| c.text()) else {
        return vec![];
    };
    text.split_whitespace()
        .filter_map(|tuple| {
            let numbers: Option<Vec<f64>> = tuple.split(',').map(|n| n.trim().parse::<f64>().ok()).collect();
            numbers.filter(|n| n.len() >= 2)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const ZONE_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Zoneamento</name>
    <Placemark>
      <name>Zona Comercial Central</name>
      <description>Comércio e serviços</description>
      <ExtendedData>
        <Data name="codigo"><value>ZC-01</value></Data>
      </ExtendedData>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>
              -51.10,-26.00,0 -51.00,-26.00,0 -51.00,-25.90,0
            </coordinates>
          </LinearRing>
        </outerBoundaryIs>
      </Polygon>
    </Placemark>
    <Placemark>
      <name>Prefeitura</name>
      <Point><coordinates>-51.05,-25.95,0</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

    fn kmz_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_kmz_to_feature_collection() {
        let bytes = kmz_with(&[("images/readme.txt", "hello"), ("doc.KML", ZONE_KML)]);
        let fc = read_kmz(&bytes).expect("valid KMZ");
        assert_eq!(fc.features.len(), 2);

        let zone = &fc.features[0];
        let props = zone.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Zona Comercial Central");
        assert_eq!(props["codigo"], "ZC-01");
        match &zone.geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => {
                // KML ring was left open, it gets closed on the way in
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[0][0], rings[0][3]);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
        match &fc.features[1].geometry.as_ref().unwrap().value {
            Value::Point(p) => assert_eq!(p, &vec![-51.05, -25.95, 0.0]),
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn test_kmz_without_kml_rejected() {
        let bytes = kmz_with(&[("doc.txt", "not a kml")]);
        assert!(matches!(read_kmz(&bytes), Err(KmzError::NoKml)));
    }

    #[test]
    fn test_not_a_zip_rejected() {
        assert!(matches!(read_kmz(b"plain text"), Err(KmzError::Archive(_))));
    }

    #[test]
    fn test_kml_without_placemarks_rejected() {
        let empty = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#;
        let bytes = kmz_with(&[("doc.kml", empty)]);
        assert!(matches!(read_kmz(&bytes), Err(KmzError::NoFeatures)));
    }

    #[test]
    fn test_multigeometry_and_inner_rings() {
        let kml = r#"<kml><Placemark><MultiGeometry>
            <Polygon>
              <outerBoundaryIs><LinearRing><coordinates>0,0 4,0 4,4 0,4 0,0</coordinates></LinearRing></outerBoundaryIs>
              <innerBoundaryIs><LinearRing><coordinates>1,1 2,1 2,2</coordinates></LinearRing></innerBoundaryIs>
            </Polygon>
            <LineString><coordinates>0,0 5,5</coordinates></LineString>
        </MultiGeometry></Placemark></kml>"#;
        let fc = parse_kml(kml).unwrap();
        let Value::GeometryCollection(parts) = &fc.features[0].geometry.as_ref().unwrap().value else {
            panic!("expected a geometry collection");
        };
        assert_eq!(parts.len(), 2);
        let Value::Polygon(rings) = &parts[0].value else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[1].len(), 4);
    }

    #[test]
    fn test_placemark_without_geometry_kept() {
        let fc = parse_kml("<kml><Placemark><name>Sem área</name></Placemark></kml>").unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(fc.features[0].geometry.is_none());
    }

    #[test]
    fn test_broken_xml_rejected() {
        assert!(matches!(parse_kml("<kml><Placemark>"), Err(KmzError::Xml(_))));
    }
}
