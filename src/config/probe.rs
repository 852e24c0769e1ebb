//! Bed probe configuration.

use serde::Deserialize;

use super::machine::MachineConfig;
use super::units::{MmPerMin, XyPos, XyzPos};

/// Bed probe placement, clearances and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Probe position relative to the nozzle (probe = nozzle + offset).
    #[serde(default)]
    pub nozzle_to_probe_offset: XyzPos,

    /// Minimum distance between the probe and the bed edge.
    #[serde(default = "default_min_probe_edge")]
    pub min_probe_edge: f32,

    /// Extra attempts after a failed probe before the acquisition aborts.
    #[serde(default = "default_retries")]
    pub retries: u8,

    /// Z height for travel between probe points.
    #[serde(default = "default_clearance_between")]
    pub z_clearance_between_probes: f32,

    /// Z height for deploy, stow and the end of a probing run.
    #[serde(default = "default_clearance_deploy")]
    pub z_clearance_deploy: f32,

    /// Travel feedrate between probe points.
    #[serde(rename = "travel_feedrate_mm_per_min", default = "default_feedrate")]
    pub travel_feedrate: MmPerMin,

    /// Points used by the three-point tilt.
    #[serde(default = "default_three_point")]
    pub three_point: [XyPos; 3],
}

fn default_min_probe_edge() -> f32 {
    10.0
}

fn default_retries() -> u8 {
    2
}

fn default_clearance_between() -> f32 {
    5.0
}

fn default_clearance_deploy() -> f32 {
    10.0
}

fn default_feedrate() -> MmPerMin {
    MmPerMin(8000.0)
}

fn default_three_point() -> [XyPos; 3] {
    [XyPos::new(15.0, 180.0), XyPos::new(15.0, 20.0), XyPos::new(170.0, 20.0)]
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            nozzle_to_probe_offset: XyzPos::ZERO,
            min_probe_edge: default_min_probe_edge(),
            retries: default_retries(),
            z_clearance_between_probes: default_clearance_between(),
            z_clearance_deploy: default_clearance_deploy(),
            travel_feedrate: default_feedrate(),
            three_point: default_three_point(),
        }
    }
}

/// Rectangle the probe can reach, derived once from machine and probe settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeBounds {
    /// Smallest reachable probe X.
    pub min_x: f32,
    /// Largest reachable probe X.
    pub max_x: f32,
    /// Smallest reachable probe Y.
    pub min_y: f32,
    /// Largest reachable probe Y.
    pub max_y: f32,
}

impl ProbeBounds {
    /// Compute the probe envelope: inside the bed by `min_probe_edge`, and
    /// inside nozzle travel shifted by the probe offset.
    pub fn from_config(machine: &MachineConfig, probe: &ProbeConfig) -> Self {
        let off = probe.nozzle_to_probe_offset;
        Self {
            min_x: probe.min_probe_edge.max(machine.min.x + off.x),
            max_x: (machine.bed_size.x - probe.min_probe_edge).min(machine.max.x + off.x),
            min_y: probe.min_probe_edge.max(machine.min.y + off.y),
            max_y: (machine.bed_size.y - probe.min_probe_edge).min(machine.max.y + off.y),
        }
    }

    /// Whether the probe can be placed at (x, y).
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
