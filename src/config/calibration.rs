//! Calibration object and touch-probing configuration.

use serde::Deserialize;

use super::units::{MmPerMin, XyzPos};

/// Which lateral faces of the calibration object are probed.
///
/// Centers along an axis are only derived when both opposing faces are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SideSelection {
    /// Probe the +X face.
    #[serde(default = "enabled")]
    pub right: bool,
    /// Probe the -Y face.
    #[serde(default = "enabled")]
    pub front: bool,
    /// Probe the -X face.
    #[serde(default = "enabled")]
    pub left: bool,
    /// Probe the +Y face.
    #[serde(default = "enabled")]
    pub back: bool,
}

fn enabled() -> bool {
    true
}

impl SideSelection {
    /// All four lateral faces.
    pub const ALL: Self = Self {
        right: true,
        front: true,
        left: true,
        back: true,
    };

    /// Both X faces are probed, so an X center can be measured.
    #[inline]
    pub fn has_x_center(&self) -> bool {
        self.left && self.right
    }

    /// Both Y faces are probed, so a Y center can be measured.
    #[inline]
    pub fn has_y_center(&self) -> bool {
        self.front && self.back
    }

    /// At least one lateral face is probed.
    #[inline]
    pub fn any(&self) -> bool {
        self.right || self.front || self.left || self.back
    }
}

impl Default for SideSelection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Feedrates used while calibrating, in mm/min.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CalibrationFeedrates {
    /// Positioning moves around the object.
    #[serde(default = "default_travel")]
    pub travel: MmPerMin,
    /// Coarse touch steps.
    #[serde(default = "default_fast")]
    pub fast: MmPerMin,
    /// Fine touch steps.
    #[serde(default = "default_slow")]
    pub slow: MmPerMin,
}

fn default_travel() -> MmPerMin {
    MmPerMin(3000.0)
}

fn default_fast() -> MmPerMin {
    MmPerMin(1200.0)
}

fn default_slow() -> MmPerMin {
    MmPerMin(60.0)
}

impl Default for CalibrationFeedrates {
    fn default() -> Self {
        Self {
            travel: default_travel(),
            fast: default_fast(),
            slow: default_slow(),
        }
    }
}

/// Search radius tiers, in mm.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UncertaintyTiers {
    /// Position is roughly known, coarse search.
    #[serde(default = "default_unknown")]
    pub unknown: f32,
    /// Position known to within about a millimeter.
    #[serde(default = "default_uncertain")]
    pub uncertain: f32,
    /// Position known precisely.
    #[serde(default = "default_certain")]
    pub certain: f32,
}

fn default_unknown() -> f32 {
    5.0
}

fn default_uncertain() -> f32 {
    1.0
}

fn default_certain() -> f32 {
    0.5
}

impl Default for UncertaintyTiers {
    fn default() -> Self {
        Self {
            unknown: default_unknown(),
            uncertain: default_uncertain(),
            certain: default_certain(),
        }
    }
}

/// Step size and travel caps of a touch measurement.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SearchLimits {
    /// Step size of a coarse search.
    #[serde(default = "default_fast_step")]
    pub fast_step: f32,
    /// Travel cap of a coarse search.
    #[serde(default = "default_fast_travel")]
    pub fast_travel: f32,
    /// Travel cap of a fine search.
    #[serde(default = "default_fine_travel")]
    pub fine_travel: f32,
}

fn default_fast_step() -> f32 {
    0.25
}

fn default_fast_travel() -> f32 {
    50.0
}

fn default_fine_travel() -> f32 {
    5.0
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            fast_step: default_fast_step(),
            fast_travel: default_fast_travel(),
            fine_travel: default_fine_travel(),
        }
    }
}

/// Calibration object geometry and probing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    /// Known (true) center of the calibration object.
    #[serde(rename = "object_center")]
    pub true_center: XyzPos,

    /// Object size along each axis.
    #[serde(rename = "object_dimensions", default = "default_dimensions")]
    pub dimensions: XyzPos,

    /// Nozzle outer diameter at the contact height.
    #[serde(default = "default_nozzle_outer_diameter")]
    pub nozzle_outer_diameter: f32,

    /// Height of the conical nozzle tip.
    #[serde(default = "default_nozzle_tip_height")]
    pub nozzle_tip_height: f32,

    /// Fine step size, and so the precision of a fine measurement.
    #[serde(default = "default_resolution")]
    pub measurement_resolution: f32,

    /// Touch and travel feedrates.
    #[serde(default)]
    pub feedrates: CalibrationFeedrates,

    /// Search radius tiers.
    #[serde(default)]
    pub uncertainty: UncertaintyTiers,

    /// Step size and travel caps.
    #[serde(default)]
    pub search: SearchLimits,

    /// Lateral faces to probe.
    #[serde(default)]
    pub sides: SideSelection,

    /// Probe the top face near each lateral edge instead of at the center.
    #[serde(default)]
    pub measure_at_top_edges: bool,

    /// X position the nozzle parks at after a full calibration.
    #[serde(default = "default_park_x")]
    pub park_x: f32,

    /// Contact reads as a low level on the probe input.
    #[serde(default)]
    pub probe_inverting: bool,
}

fn default_dimensions() -> XyzPos {
    XyzPos::new(10.0, 10.0, 10.0)
}

fn default_nozzle_outer_diameter() -> f32 {
    2.0
}

fn default_nozzle_tip_height() -> f32 {
    1.0
}

fn default_resolution() -> f32 {
    0.01
}

fn default_park_x() -> f32 {
    150.0
}

impl CalibrationConfig {
    /// Create a configuration for an object centered at `true_center`, all
    /// other settings at their defaults.
    pub fn new(true_center: XyzPos) -> Self {
        Self {
            true_center,
            dimensions: default_dimensions(),
            nozzle_outer_diameter: default_nozzle_outer_diameter(),
            nozzle_tip_height: default_nozzle_tip_height(),
            measurement_resolution: default_resolution(),
            feedrates: CalibrationFeedrates::default(),
            uncertainty: UncertaintyTiers::default(),
            search: SearchLimits::default(),
            sides: SideSelection::default(),
            measure_at_top_edges: false,
            park_x: default_park_x(),
            probe_inverting: false,
        }
    }
}
