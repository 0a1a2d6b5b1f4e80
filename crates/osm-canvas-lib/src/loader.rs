//! JSON element payloads into a [`Dataset`]
//!
//! Accepts Overpass-style `{"elements": [...]}` documents as well as a bare element
//! array. Elements other than nodes and ways are skipped, as are nodes without
//! coordinates; anything that is not a list of element objects is an error.

use crate::{Dataset, MapError, Node, Result, Tags, Way};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One element as it appears on the wire, before validation
#[derive(Deserialize)]
struct RawElement {
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    nodes: Vec<i64>,
    #[serde(default)]
    tags: Option<Tags>,
}

fn element_list(payload: Value) -> Result<Vec<Value>> {
    match payload {
        Value::Array(elements) => Ok(elements),
        Value::Object(mut object) => match object.remove("elements") {
            Some(Value::Array(elements)) => Ok(elements),
            Some(_) => Err(MapError::InvalidPayload(
                "\"elements\" is not an array".to_owned(),
            )),
            None => Err(MapError::InvalidPayload(
                "object without an \"elements\" array".to_owned(),
            )),
        },
        _ => Err(MapError::InvalidPayload(
            "expected an element array or an object with \"elements\"".to_owned(),
        )),
    }
}

/// Validate and split a parsed payload into nodes and ways
fn dataset_from_value(payload: Value) -> Result<Dataset> {
    let start = instant::Instant::now();
    let elements = element_list(payload)?;

    let mut nodes = Vec::new();
    let mut ways = Vec::new();
    let mut skipped = 0usize;

    for (position, element) in elements.into_iter().enumerate() {
        let kind = match &element {
            Value::Object(object) => object
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            _ => {
                return Err(MapError::InvalidPayload(format!(
                    "element {} is not an object",
                    position
                )));
            }
        };

        match kind.as_str() {
            "node" => {
                let raw: RawElement = serde_json::from_value(element)?;
                match (raw.lat, raw.lon) {
                    (Some(lat), Some(lon)) => nodes.push(Node {
                        id: raw.id,
                        lat,
                        lon,
                        tags: raw.tags.unwrap_or_default(),
                    }),
                    _ => {
                        tracing::warn!("Skipping node {} without coordinates", raw.id);
                        skipped += 1;
                    }
                }
            }
            "way" => {
                let raw: RawElement = serde_json::from_value(element)?;
                ways.push(Way {
                    id: raw.id,
                    nodes: raw.nodes,
                    tags: raw.tags.unwrap_or_default(),
                });
            }
            other => {
                tracing::debug!("Skipping element {} of type {:?}", position, other);
                skipped += 1;
            }
        }
    }

    tracing::info!(
        "Parsed {} nodes and {} ways ({} skipped) in {:?}",
        nodes.len(),
        ways.len(),
        skipped,
        start.elapsed()
    );
    Ok(Dataset::new(nodes, ways))
}

impl Dataset {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        dataset_from_value(serde_json::from_str(json)?)
    }

    /// Parse a JSON document from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        dataset_from_value(serde_json::from_reader(reader)?)
    }

    /// Parse a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementRef, GeoBounds};

    const OVERPASS: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 48.0, "lon": 2.0, "tags": {"shop": "bakery", "name": "Chez Paul"}},
            {"type": "node", "id": 2, "lat": 48.01, "lon": 2.01},
            {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"highway": "service"}},
            {"type": "relation", "id": 100, "members": []}
        ]
    }"#;

    #[test]
    fn test_overpass_document() {
        let dataset = Dataset::from_json_str(OVERPASS).unwrap();
        assert_eq!(dataset.nodes().len(), 2);
        assert_eq!(dataset.ways().len(), 1);
        assert_eq!(dataset.node(1).and_then(|n| n.name()), Some("Chez Paul"));
        assert!(dataset.node(2).unwrap().tags.is_empty());
        // Dangling reference kept as-is
        assert_eq!(dataset.way(10).unwrap().nodes, vec![1, 2, 3]);
        assert!(!dataset.contains(ElementRef::way(100)));
    }

    #[test]
    fn test_bare_array() {
        let dataset =
            Dataset::from_json_str(r#"[{"type": "node", "id": 5, "lat": 1.5, "lon": -3.0}]"#)
                .unwrap();
        let bounds = crate::compute_bounds(dataset.nodes(), 10);
        assert_eq!(bounds, GeoBounds::new(1.5, 1.5, -3.0, -3.0));
    }

    #[test]
    fn test_node_without_coordinates_is_skipped() {
        let dataset = Dataset::from_json_str(
            r#"[{"type": "node", "id": 1, "lat": 1.0}, {"type": "node", "id": 2, "lat": 1.0, "lon": 2.0}]"#,
        )
        .unwrap();
        assert_eq!(dataset.nodes().len(), 1);
        assert!(dataset.node(1).is_none());
    }

    #[test]
    fn test_null_tags_are_empty() {
        let dataset = Dataset::from_json_str(
            r#"[{"type": "way", "id": 1, "nodes": [], "tags": null}]"#,
        )
        .unwrap();
        assert!(dataset.way(1).unwrap().tags.is_empty());
    }

    #[test]
    fn test_structurally_invalid_payloads() {
        for payload in [
            r#"42"#,
            r#""elements""#,
            r#"{"elements": {"type": "node"}}"#,
            r#"{"nodes": []}"#,
            r#"[1, 2, 3]"#,
        ] {
            assert!(
                matches!(Dataset::from_json_str(payload), Err(MapError::InvalidPayload(_))),
                "{} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_malformed_elements_are_json_errors() {
        assert!(matches!(
            Dataset::from_json_str(r#"[{"type": "node", "lat": 1.0, "lon": 2.0}]"#),
            Err(MapError::Json(_))
        ));
        assert!(matches!(
            Dataset::from_json_str(r#"[{"type": "way", "id": 1, "nodes": ["a"]}]"#),
            Err(MapError::Json(_))
        ));
        assert!(matches!(Dataset::from_json_str("{not json"), Err(MapError::Json(_))));
    }

    #[test]
    fn test_reader_and_missing_file() {
        let dataset = Dataset::from_reader(OVERPASS.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert!(matches!(
            Dataset::from_file("/definitely/not/here.json"),
            Err(MapError::Io(_))
        ));
    }
}
