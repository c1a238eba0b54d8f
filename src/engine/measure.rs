//! Network measurement
//!
//! Junction and edge counts come from counting textual markers in the
//! network artifact, not from parsing it. Internal edges are counted too,
//! and a serialization change in the converter silently skews the numbers.
//! Measurement never fails a pipeline: unreadable files count as zero.

use std::path::Path;

use regex::bytes::Regex;
use tracing::{debug, warn};

use super::result::NetworkMetrics;
use crate::config::MarkerConfig;

#[derive(Debug, Clone)]
pub struct NetworkMarkers {
    junction: Regex,
    edge: Regex,
}

impl NetworkMarkers {
    pub fn new(config: &MarkerConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            junction: marker_pattern(&config.junction)?,
            edge: marker_pattern(&config.edge)?,
        })
    }

    pub fn count(&self, content: &[u8]) -> NetworkMetrics {
        NetworkMetrics {
            junction_count: self.junction.find_iter(content).count() as u64,
            edge_count: self.edge.find_iter(content).count() as u64,
        }
    }

    pub async fn measure(&self, network: &Path) -> NetworkMetrics {
        match tokio::fs::read(network).await {
            Ok(content) => {
                let metrics = self.count(&content);
                debug!(
                    "{}: {} junctions, {} edges",
                    network.display(),
                    metrics.junction_count,
                    metrics.edge_count
                );
                metrics
            }
            Err(e) => {
                warn!("Could not read {} for measurement: {}", network.display(), e);
                NetworkMetrics::default()
            }
        }
    }
}

/// The marker must end a name: `<edge` matches `<edge id=..>` but not `<edges>`
fn marker_pattern(marker: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"{}(?:[\s/>]|$)", regex::escape(marker)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NETWORK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.16">
    <edge id=":J1_0" function="internal"/>
    <edge id="E1" from="J1" to="J2">
        <lane id="E1_0"/>
    </edge>
    <edge id="E2" from="J2" to="J1"/>
    <junction id="J1" type="priority"/>
    <junction id="J2" type="traffic_light"/>
    <junctions/>
    <edgeData/>
</net>
"#;

    fn markers() -> NetworkMarkers {
        NetworkMarkers::new(&MarkerConfig::default()).unwrap()
    }

    #[test]
    fn test_count_markers() {
        let metrics = markers().count(NETWORK.as_bytes());
        assert_eq!(metrics.junction_count, 2);
        assert_eq!(metrics.edge_count, 3);
    }

    #[test]
    fn test_closing_tags_not_counted() {
        let metrics = markers().count(b"</edge></junction>");
        assert_eq!(metrics, NetworkMetrics::default());
    }

    #[test]
    fn test_custom_markers() {
        let config = MarkerConfig {
            junction: "<node".to_string(),
            edge: "<way".to_string(),
        };
        let markers = NetworkMarkers::new(&config).unwrap();
        let metrics = markers.count(b"<node id='1'/><node id='2'/><way id='3'>");
        assert_eq!(metrics.junction_count, 2);
        assert_eq!(metrics.edge_count, 1);
    }

    #[tokio::test]
    async fn test_measure_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("area.net.xml");
        std::fs::write(&path, NETWORK).unwrap();

        let metrics = markers().measure(&path).await;
        assert_eq!(metrics.junction_count, 2);
        assert_eq!(metrics.edge_count, 3);
    }

    #[tokio::test]
    async fn test_unreadable_file_degrades_to_zero() {
        let dir = tempdir().unwrap();
        let metrics = markers().measure(&dir.path().join("missing.net.xml")).await;
        assert_eq!(metrics, NetworkMetrics::default());
    }
}
