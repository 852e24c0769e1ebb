//! Machine geometry configuration.

use serde::Deserialize;

use super::units::{XyPos, XyzPos};

/// Travel envelope, bed size and toolhead count.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Minimum reachable nozzle position.
    #[serde(default = "default_min")]
    pub min: XyzPos,

    /// Maximum reachable nozzle position.
    #[serde(default = "default_max")]
    pub max: XyzPos,

    /// Printable bed size, with the bed starting at the origin.
    #[serde(default = "default_bed_size")]
    pub bed_size: XyPos,

    /// Number of hotends (toolheads).
    #[serde(default = "default_hotends")]
    pub hotends: u8,
}

fn default_min() -> XyzPos {
    XyzPos::ZERO
}

fn default_max() -> XyzPos {
    XyzPos::new(200.0, 200.0, 200.0)
}

fn default_bed_size() -> XyPos {
    XyPos::new(200.0, 200.0)
}

fn default_hotends() -> u8 {
    1
}

impl MachineConfig {
    /// Whether the nozzle can reach a horizontal position.
    pub fn can_reach(&self, x: f32, y: f32) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Clamp a target into the travel envelope.
    #[inline]
    pub fn clamp(&self, target: XyzPos) -> XyzPos {
        target.clamp(self.min, self.max)
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            bed_size: default_bed_size(),
            hotends: default_hotends(),
        }
    }
}
