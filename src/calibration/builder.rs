//! Builder for [`Calibrator`].

use crate::config::{CalibrationConfig, MachineConfig, SystemConfig};
use crate::error::{ConfigError, Error, Result};
use crate::hal::{BacklashCompensation, Motion, ProbeSignal, Toolheads};

use super::engine::Calibrator;

/// Builder for creating [`Calibrator`] instances.
pub struct CalibratorBuilder<M, S>
where
    M: Motion + Toolheads + BacklashCompensation,
    S: ProbeSignal,
{
    machine: Option<M>,
    signal: Option<S>,
    config: Option<CalibrationConfig>,
    envelope: MachineConfig,
}

impl<M, S> Default for CalibratorBuilder<M, S>
where
    M: Motion + Toolheads + BacklashCompensation,
    S: ProbeSignal,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, S> CalibratorBuilder<M, S>
where
    M: Motion + Toolheads + BacklashCompensation,
    S: ProbeSignal,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            machine: None,
            signal: None,
            config: None,
            envelope: MachineConfig::default(),
        }
    }

    /// Set the machine (planner, toolheads, backlash compensation).
    pub fn machine(mut self, machine: M) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Set the contact signal.
    pub fn signal(mut self, signal: S) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set the calibration object and probing parameters.
    pub fn calibration(mut self, config: CalibrationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the travel envelope and hotend count.
    pub fn envelope(mut self, envelope: MachineConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Configure from a system configuration.
    ///
    /// Leaves the calibration unset if the system has no `[calibration]`
    /// section, which [`build`](Self::build) then reports.
    pub fn from_config(mut self, config: &SystemConfig) -> Self {
        self.envelope = config.machine.clone();
        if let Some(calibration) = config.calibration() {
            self.config = Some(calibration.clone());
        }
        self
    }

    /// Build the calibrator.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config(ConfigError::MissingField)` naming the first
    /// missing part.
    pub fn build(self) -> Result<Calibrator<M, S>> {
        let machine = self.machine.ok_or_else(|| missing("machine"))?;
        let signal = self.signal.ok_or_else(|| missing("signal"))?;
        let config = self.config.ok_or_else(|| missing("calibration"))?;
        Ok(Calibrator::new(machine, signal, config, self.envelope))
    }
}

fn missing(name: &str) -> Error {
    Error::Config(ConfigError::MissingField(
        heapless::String::try_from(name).unwrap_or_default(),
    ))
}
