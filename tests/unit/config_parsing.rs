//! Unit tests for TOML configuration parsing.

use bed_leveling::config::{load_config, parse_config, OffMeshPolicy, SystemConfig};
use bed_leveling::config::units::XyzPos;
use bed_leveling::error::{ConfigError, Error};

/// Test parsing a complete printer configuration.
#[test]
fn test_parse_full_config() {
    let toml_str = r#"
[machine]
min = [0.0, 0.0, 0.0]
max = [235.0, 235.0, 250.0]
bed_size = [235.0, 235.0]
hotends = 2

[mesh]
min_x = 15.0
max_x = 220.0
min_y = 15.0
max_y = 220.0
off_mesh = { raise = 1.5 }

[probe]
nozzle_to_probe_offset = [-44.0, -9.0, -1.2]
retries = 3
z_clearance_deploy = 12.0
travel_feedrate_mm_per_min = 6000.0
three_point = [[20.0, 200.0], [20.0, 20.0], [200.0, 20.0]]

[calibration]
object_center = [264.0, -22.0, -2.0]
object_dimensions = [10.0, 10.0, 10.0]
nozzle_outer_diameter = 2.0
measurement_resolution = 0.01
measure_at_top_edges = true
park_x = 117.5

[calibration.feedrates]
travel = 3000.0
slow = 60.0

[calibration.sides]
back = false
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.machine.hotends, 2);
    assert_eq!(config.machine.max, XyzPos::new(235.0, 235.0, 250.0));
    assert_eq!(config.mesh.off_mesh, OffMeshPolicy::Raise(1.5));
    assert_eq!(config.probe.nozzle_to_probe_offset, XyzPos::new(-44.0, -9.0, -1.2));
    assert_eq!(config.probe.retries, 3);
    assert_eq!(config.probe.travel_feedrate.value(), 6000.0);
    // Defaults for omitted fields
    assert_eq!(config.probe.min_probe_edge, 10.0);
    assert_eq!(config.probe.three_point[2].x, 200.0);

    let cal = config.calibration().expect("calibration section");
    assert_eq!(cal.true_center, XyzPos::new(264.0, -22.0, -2.0));
    assert!(cal.measure_at_top_edges);
    assert_eq!(cal.feedrates.fast.value(), 1200.0);
    assert_eq!(cal.feedrates.slow.value(), 60.0);
    assert!(cal.sides.has_x_center());
    assert!(!cal.sides.has_y_center());
    assert_eq!(cal.uncertainty.unknown, 5.0);
}

/// Test probe bounds derived from machine and probe settings.
#[test]
fn test_probe_bounds_from_parsed_config() {
    let toml_str = r#"
[mesh]
min_x = 10.0
max_x = 190.0
min_y = 10.0
max_y = 190.0

[probe]
nozzle_to_probe_offset = [30.0, 0.0, 0.0]
"#;

    let config = parse_config(toml_str).expect("valid config");
    let bounds = config.probe_bounds();
    assert_eq!(bounds.min_x, 30.0);
    assert_eq!(bounds.max_x, 190.0);
}

/// Test that a missing mesh section is a parse error.
#[test]
fn test_missing_mesh_section() {
    let result = parse_config("[machine]\nhotends = 1\n");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Test loading from a file that does not exist.
#[test]
fn test_load_missing_file() {
    let result = load_config("/nonexistent/printer.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::IoError(_)))));
}
