//! Results of a calibration probe, for the operator.

use heapless::Vec;

use crate::config::units::{XyPos, XyzPos};
use crate::config::{CalibrationConfig, MAX_HOTENDS};

use super::measurement::{Measurements, Side};

/// What a probe of the object measured.
///
/// Faces and backlash that were not probed are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    /// Trigger coordinate per face, indexed by [`Side::index`].
    pub faces: [Option<f32>; 5],
    /// Measured object center.
    pub center: XyzPos,
    /// Backlash read per face.
    pub backlash: [Option<f32>; 5],
    /// Effective nozzle diameter at the contact height.
    pub nozzle_outer_dimension: XyPos,
    /// True center minus measured center.
    pub positional_error: XyzPos,
    /// Hotend offsets, relative to extruder 0.
    pub hotend_offsets: Vec<XyzPos, MAX_HOTENDS>,
}

impl CalibrationReport {
    /// Collect a report from a finished probe.
    pub fn new(
        m: &Measurements,
        config: &CalibrationConfig,
        hotend_offset: impl Fn(u8) -> XyzPos,
        hotends: u8,
    ) -> Self {
        let sides = config.sides;
        let probed = |side: Side| match side {
            Side::Top => true,
            Side::Right => sides.right,
            Side::Front => sides.front,
            Side::Left => sides.left,
            Side::Back => sides.back,
        };

        let mut faces = [None; 5];
        let mut backlash = [None; 5];
        for side in Side::ALL {
            if probed(side) {
                faces[side.index()] = Some(m.side(side));
                backlash[side.index()] = Some(m.backlash(side));
            }
        }

        let mut hotend_offsets = Vec::new();
        for e in 0..hotends.min(MAX_HOTENDS as u8) {
            // Bounded by MAX_HOTENDS above.
            let _ = hotend_offsets.push(hotend_offset(e));
        }

        Self {
            faces,
            center: m.obj_center,
            backlash,
            nozzle_outer_dimension: m.nozzle_outer_dimension,
            positional_error: m.pos_error,
            hotend_offsets,
        }
    }

    /// Trigger coordinate of a face, if probed.
    #[inline]
    pub fn face(&self, side: Side) -> Option<f32> {
        self.faces[side.index()]
    }

    /// Write the report to the log at info level.
    pub fn log(&self) {
        for side in Side::ALL {
            if let Some(v) = self.face(side) {
                info!("{} face: {}", side.name(), v);
            }
        }
        info!("center: {} {} {}", self.center.x, self.center.y, self.center.z);
        for side in Side::ALL {
            if let Some(v) = self.backlash[side.index()] {
                info!("{} backlash: {}", side.name(), v);
            }
        }
        info!(
            "nozzle outer diameter: {} {}",
            self.nozzle_outer_dimension.x, self.nozzle_outer_dimension.y
        );
        info!(
            "positional error: {} {} {}",
            self.positional_error.x, self.positional_error.y, self.positional_error.z
        );
        for (e, offset) in self.hotend_offsets.iter().enumerate() {
            info!("T{} offset: {} {} {}", e, offset.x, offset.y, offset.z);
        }
    }
}
