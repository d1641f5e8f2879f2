use std::collections::HashMap;
use std::path::Path;

use fxhash::FxHashMap;
use osmpbf::{Element, ElementReader};
use thiserror::Error;
use tracing::info;

use crate::geopoint::GeoPoint;

/// A raw OSM way: ordered coordinates plus its tag map. This is the input
/// the graph builder consumes, so tests and non-PBF street data sources can
/// construct ways directly.
#[derive(Debug, Clone)]
pub struct RawWay {
    pub geometry: Vec<GeoPoint>,
    pub tags: HashMap<String, String>,
}

impl RawWay {
    pub fn new(geometry: Vec<GeoPoint>, tags: &[(&str, &str)]) -> RawWay {
        RawWay {
            geometry,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get_tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(|value| value.as_str())
    }

    pub fn has_tag(&self, tag: &str, value: &str) -> bool {
        self.get_tag(tag) == Some(value)
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read PBF extract: {0}")]
    Pbf(#[from] osmpbf::Error),
}

/// Read every highway-tagged way of a `.osm.pbf` extract as a [`RawWay`].
///
/// PBF files order nodes before the ways referencing them, so a single pass
/// is enough: coordinates are collected first and resolved when the ways
/// arrive.
pub fn read_raw_ways(path: &Path) -> Result<Vec<RawWay>, ExtractError> {
    let reader = ElementReader::from_path(path)?;

    let mut coordinates: FxHashMap<i64, GeoPoint> = FxHashMap::default();
    let mut ways: Vec<RawWay> = Vec::new();

    reader.for_each(|element| match element {
        Element::Node(node) => {
            coordinates.insert(node.id(), GeoPoint::new(node.lat(), node.lon()));
        }
        Element::DenseNode(node) => {
            coordinates.insert(node.id(), GeoPoint::new(node.lat(), node.lon()));
        }
        Element::Way(way) => {
            let tags: HashMap<String, String> = way
                .tags()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect();

            if !tags.contains_key("highway") {
                return;
            }

            let geometry: Vec<GeoPoint> = way
                .refs()
                .filter_map(|node_id| coordinates.get(&node_id).copied())
                .collect();

            if geometry.len() < 2 {
                return;
            }

            ways.push(RawWay { geometry, tags });
        }
        Element::Relation(_) => {}
    })?;

    info!(
        nodes = coordinates.len(),
        ways = ways.len(),
        "parsed PBF extract"
    );

    Ok(ways)
}
