//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::calibration::CalibrationConfig;
use super::machine::MachineConfig;
use super::units::Axis;
use super::{SystemConfig, MAX_HOTENDS};

/// Validate a system configuration.
///
/// Checks:
/// - Mesh span is non-empty (min < max on both axes)
/// - Travel bounds are non-empty on every axis
/// - Hotend count is 1..=`MAX_HOTENDS`
/// - Calibration dimensions, resolution, feedrates and uncertainty tiers are positive
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    validate_machine(&config.machine)?;

    let mesh = &config.mesh;
    if mesh.min_x >= mesh.max_x {
        return Err(Error::Config(ConfigError::InvalidMeshSpan {
            min: mesh.min_x,
            max: mesh.max_x,
        }));
    }
    if mesh.min_y >= mesh.max_y {
        return Err(Error::Config(ConfigError::InvalidMeshSpan {
            min: mesh.min_y,
            max: mesh.max_y,
        }));
    }

    if let Some(ref calibration) = config.calibration {
        validate_calibration(calibration)?;
    }

    Ok(())
}

fn validate_machine(machine: &MachineConfig) -> Result<()> {
    for axis in Axis::ALL {
        if machine.min[axis] >= machine.max[axis] {
            return Err(Error::Config(ConfigError::InvalidTravelBounds {
                axis,
                min: machine.min[axis],
                max: machine.max[axis],
            }));
        }
    }

    if machine.hotends == 0 || machine.hotends as usize > MAX_HOTENDS {
        return Err(Error::Config(ConfigError::InvalidHotendCount(machine.hotends)));
    }

    Ok(())
}

fn validate_calibration(config: &CalibrationConfig) -> Result<()> {
    for axis in Axis::ALL {
        if config.dimensions[axis] <= 0.0 {
            return Err(Error::Config(ConfigError::InvalidDimension(config.dimensions[axis])));
        }
    }
    if config.nozzle_outer_diameter <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidDimension(
            config.nozzle_outer_diameter,
        )));
    }
    if config.nozzle_tip_height <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidDimension(config.nozzle_tip_height)));
    }

    if config.measurement_resolution <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidResolution(
            config.measurement_resolution,
        )));
    }
    if config.search.fast_step <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidResolution(config.search.fast_step)));
    }

    let feeds = &config.feedrates;
    for feed in [feeds.travel, feeds.fast, feeds.slow] {
        if feed.value() <= 0.0 {
            return Err(Error::Config(ConfigError::InvalidFeedrate(feed.value())));
        }
    }

    let tiers = &config.uncertainty;
    if tiers.certain <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidUncertainty(tiers.certain)));
    }
    if tiers.uncertain < tiers.certain {
        return Err(Error::Config(ConfigError::InvalidUncertainty(tiers.uncertain)));
    }
    if tiers.unknown < tiers.uncertain {
        return Err(Error::Config(ConfigError::InvalidUncertainty(tiers.unknown)));
    }

    Ok(())
}
