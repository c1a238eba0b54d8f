mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::*;
use sumo_batch::config::{BatchConfig, ConfigError};

#[test]
fn test_default_config() {
    let config = BatchConfig::default();
    assert_eq!(config.parallel, 1);
    assert_eq!(config.areas.len(), 7);
    assert_eq!(config.baseline.name, "Electronic City");
    assert_eq!(config.timeouts.convert(), Duration::from_secs(300));
    assert_eq!(config.timeouts.trips(), Duration::from_secs(120));
    assert_eq!(config.traffic.vehicles, 100);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_minimal_config() {
    let dir = create_test_dir();
    let path = write_batch_config(dir.path(), "parallel: 3");

    let config = BatchConfig::load(path).unwrap();
    assert_eq!(config.parallel, 3);
    assert_eq!(config.areas.len(), 7);
    assert_eq!(config.tools.netconvert, "netconvert");
}

#[test]
fn test_load_full_config() {
    let dir = create_test_dir();
    let path = write_batch_config(
        dir.path(),
        r#"
parallel: 2
work_dir: /data/osm
diagnostic_limit: 500
tools:
  netconvert: /opt/sumo/bin/netconvert
  random_trips: /opt/sumo/tools/randomTrips.py
timeouts:
  convert: 600
network:
  tls_default_type: actuated
traffic:
  end: 3600
  period: 2
  vehicles: 1800
areas:
  - name: Hebbal
    source_file: hebbal.osm
    coverage_km2: 2.1
    key_roads: [Hebbal Flyover, Ballari Road]
  - name: Airport Road
    source_file: /mnt/extracts/airport.osm
baseline:
  name: Electronic City
  junctions: 94
  edges: 198
  vehicles: 100
  config_file: electronic_city.sumocfg
"#,
    );

    let config = BatchConfig::load(path).unwrap();
    assert_eq!(config.parallel, 2);
    assert_eq!(config.diagnostic_limit, 500);
    assert_eq!(config.tools.netconvert, "/opt/sumo/bin/netconvert");
    assert_eq!(
        config.tools.random_trips_script(),
        PathBuf::from("/opt/sumo/tools/randomTrips.py")
    );
    assert_eq!(config.timeouts.convert(), Duration::from_secs(600));
    // Unset siblings keep their defaults
    assert_eq!(config.timeouts.routes(), Duration::from_secs(120));
    assert_eq!(config.network.tls_default_type.as_deref(), Some("actuated"));
    assert_eq!(config.traffic.end, 3600);
    assert_eq!(config.traffic.begin, 0);

    assert_eq!(config.areas.len(), 2);
    assert_eq!(config.areas[0].key_roads.len(), 2);
    assert_eq!(
        config.source_path(&config.areas[0]),
        PathBuf::from("/data/osm/hebbal.osm")
    );
    assert_eq!(
        config.source_path(&config.areas[1]),
        PathBuf::from("/mnt/extracts/airport.osm")
    );
    assert!(config.area("Airport Road").is_some());
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = create_test_dir();
    let path = write_batch_config(dir.path(), "");

    let config = BatchConfig::load(path).unwrap();
    assert_eq!(config.areas.len(), 7);
}

#[test]
fn test_missing_file() {
    let dir = create_test_dir();
    let err = BatchConfig::load(dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_invalid_yaml() {
    let dir = create_test_dir();
    let path = write_batch_config(dir.path(), "parallel: [not a number");

    let err = BatchConfig::load(&path).unwrap_err();
    match err {
        ConfigError::Yaml { file, .. } => assert_eq!(file, path.display().to_string()),
        other => panic!("expected YAML error, got {:?}", other),
    }
}

#[test]
fn test_area_clashing_with_baseline() {
    let config = BatchConfig::from_yaml(
        r#"
areas:
  - name: Electronic City
    source_file: ec.osm
"#,
    )
    .unwrap();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicateArea(ref name)) if name == "Electronic City"
    ));
}

#[test]
fn test_zero_parallel_rejected() {
    let config = BatchConfig::from_yaml("parallel: 0").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_areas_sharing_artifact_names_rejected() {
    let config = BatchConfig::from_yaml(
        r#"
areas:
  - name: MG Road
    source_file: mg_road_north.osm
  - name: MG_Road
    source_file: mg_road_south.osm
"#,
    )
    .unwrap();

    match config.validate() {
        Err(ConfigError::DuplicateSlug {
            first,
            second,
            slug,
        }) => {
            assert_eq!(first, "MG Road");
            assert_eq!(second, "MG_Road");
            assert_eq!(slug, "mg_road");
        }
        other => panic!("expected duplicate slug error, got {:?}", other),
    }
}

#[test]
fn test_area_sharing_baseline_artifact_name_rejected() {
    let config = BatchConfig::from_yaml(
        r#"
areas:
  - name: electronic city
    source_file: ec.osm
"#,
    )
    .unwrap();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicateSlug { ref first, .. }) if first == "Electronic City"
    ));
}
