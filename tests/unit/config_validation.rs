//! Unit tests for configuration validation.

use bed_leveling::config::{validate_config, CalibrationConfig, MeshConfig, SystemConfig};
use bed_leveling::config::units::{Axis, XyzPos};
use bed_leveling::error::{ConfigError, Error};

fn base() -> SystemConfig {
    SystemConfig::new(MeshConfig::new(10.0, 190.0, 10.0, 190.0))
}

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    let mut config = base();
    config.calibration = Some(CalibrationConfig::new(XyzPos::new(50.0, 50.0, 5.0)));
    assert!(validate_config(&config).is_ok());
}

/// Test validation fails for zero hotends.
#[test]
fn test_zero_hotends() {
    let mut config = base();
    config.machine.hotends = 0;
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidHotendCount(0)))
    );
}

/// Test validation fails for more hotends than supported.
#[test]
fn test_too_many_hotends() {
    let mut config = base();
    config.machine.hotends = 9;
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidHotendCount(9)))
    );
}

/// Test validation fails for inverted travel bounds.
#[test]
fn test_inverted_travel_bounds() {
    let mut config = base();
    config.machine.min.z = 300.0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidTravelBounds { axis: Axis::Z, .. }))
    ));
}

/// Test validation fails for a zero measurement resolution.
#[test]
fn test_zero_resolution() {
    let mut cal = CalibrationConfig::new(XyzPos::new(50.0, 50.0, 5.0));
    cal.measurement_resolution = 0.0;
    let mut config = base();
    config.calibration = Some(cal);
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidResolution(0.0)))
    );
}

/// Test validation fails for a negative feedrate.
#[test]
fn test_negative_feedrate() {
    let mut cal = CalibrationConfig::new(XyzPos::new(50.0, 50.0, 5.0));
    cal.feedrates.slow.0 = -60.0;
    let mut config = base();
    config.calibration = Some(cal);
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidFeedrate(-60.0)))
    );
}

/// Test validation fails for unordered uncertainty tiers.
#[test]
fn test_unordered_uncertainty() {
    let mut cal = CalibrationConfig::new(XyzPos::new(50.0, 50.0, 5.0));
    cal.uncertainty.uncertain = 10.0;
    let mut config = base();
    config.calibration = Some(cal);
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidUncertainty(5.0)))
    );
}
