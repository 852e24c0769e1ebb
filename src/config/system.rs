//! System configuration - root configuration structure.

use serde::Deserialize;

use super::calibration::CalibrationConfig;
use super::machine::MachineConfig;
use super::mesh::MeshConfig;
use super::probe::{ProbeBounds, ProbeConfig};

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Travel envelope and toolheads.
    #[serde(default)]
    pub machine: MachineConfig,

    /// Mesh span and off-mesh policy.
    pub mesh: MeshConfig,

    /// Bed probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Calibration object settings, absent on machines without one.
    #[serde(default)]
    pub calibration: Option<CalibrationConfig>,
}

impl SystemConfig {
    /// Create a configuration from a mesh span, everything else defaulted.
    pub fn new(mesh: MeshConfig) -> Self {
        Self {
            machine: MachineConfig::default(),
            mesh,
            probe: ProbeConfig::default(),
            calibration: None,
        }
    }

    /// Probe envelope derived from machine and probe settings.
    pub fn probe_bounds(&self) -> ProbeBounds {
        ProbeBounds::from_config(&self.machine, &self.probe)
    }

    /// Calibration settings, if a calibration object is configured.
    pub fn calibration(&self) -> Option<&CalibrationConfig> {
        self.calibration.as_ref()
    }
}
