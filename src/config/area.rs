//! Area registry
//!
//! Static descriptors for every area the batch processes, plus the
//! pre-verified baseline area that is reported but never re-run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Geographic extent of an area, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Extent in `west,south,east,north` order, as taken by `osmium extract -b`
    pub fn osmium_extent(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// One named area processed through the full pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSpec {
    /// Unique, human-readable name (the join key across results and reports)
    pub name: String,

    /// OSM XML extract for this area, relative to the work directory
    pub source_file: PathBuf,

    /// Only consumed by the acquisition tooling, never by the pipeline
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,

    /// Approximate covered surface in km²
    #[serde(default)]
    pub coverage_km2: Option<f64>,

    #[serde(default)]
    pub key_roads: Vec<String>,
}

impl AreaSpec {
    pub fn new(name: impl Into<String>, source_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_file: source_file.into(),
            bounding_box: None,
            coverage_km2: None,
            key_roads: Vec::new(),
        }
    }

    pub fn with_coverage(mut self, km2: f64) -> Self {
        self.coverage_km2 = Some(km2);
        self
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    pub fn with_key_roads(mut self, roads: &[&str]) -> Self {
        self.key_roads = roads.iter().map(|r| r.to_string()).collect();
        self
    }

    /// File-name stem used for every artifact of this area
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// A completed area whose numbers are trusted as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSpec {
    pub name: String,
    pub junctions: u64,
    pub edges: u64,
    pub vehicles: u64,
    #[serde(default)]
    pub coverage_km2: Option<f64>,
    #[serde(default)]
    pub key_roads: Vec<String>,
    pub config_file: PathBuf,
}

impl Default for BaselineSpec {
    fn default() -> Self {
        Self {
            name: "Electronic City".to_string(),
            junctions: 94,
            edges: 198,
            vehicles: 100,
            coverage_km2: Some(1.5),
            key_roads: Vec::new(),
            config_file: PathBuf::from("electronic_city.sumocfg"),
        }
    }
}

pub(crate) fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// The built-in registry: seven Bangalore areas
pub fn default_registry() -> Vec<AreaSpec> {
    vec![
        AreaSpec::new("Indiranagar", "indiranagar.osm")
            .with_coverage(1.8)
            .with_key_roads(&["100 Feet Road", "CMH Road"]),
        AreaSpec::new("Whitefield", "whitefield.osm")
            .with_coverage(2.0)
            .with_key_roads(&["Marathahalli Bridge", "ITPL Main Road"]),
        AreaSpec::new("Koramangala", "koramangala.osm")
            .with_coverage(1.9)
            .with_key_roads(&["Sony World Junction", "Sarjapur Road"]),
        AreaSpec::new("MG_Road", "mg_road.osm")
            .with_coverage(1.5)
            .with_key_roads(&["Trinity Circle", "Anil Kumble Circle"]),
        AreaSpec::new("Jayanagar", "jayanagar.osm")
            .with_coverage(1.7)
            .with_key_roads(&["Jayanagar 4th Block", "South End Circle"]),
        AreaSpec::new("Hebbal", "hebbal.osm")
            .with_coverage(2.1)
            .with_key_roads(&["Hebbal Flyover", "Ballari Road"]),
        AreaSpec::new("Yeshwanthpur", "yeshwanthpur.osm")
            .with_coverage(1.6)
            .with_key_roads(&["Yeshwanthpur Circle", "Tumkur Road"]),
    ]
}
