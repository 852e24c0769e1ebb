//! Motion, toolhead and backlash collaborator traits.

use crate::config::units::{Axis, MmPerSec, XyzPos};
use crate::error::Result;

/// The motion planner as seen by leveling and calibration.
///
/// Positions are logical nozzle coordinates of the active toolhead.
pub trait Motion {
    /// The planner's belief of the current nozzle position.
    fn current_position(&self) -> XyzPos;

    /// Overwrite the position belief without moving.
    fn set_current_position(&mut self, position: XyzPos);

    /// Queue a move to `target` and block until it is accepted.
    fn move_to(&mut self, target: XyzPos, feedrate: MmPerSec) -> Result<()>;

    /// Block until the planner queue is empty and motion has settled.
    fn synchronize(&mut self);

    /// Push the position belief down to the planner and steppers.
    fn sync_plan_position(&mut self);

    /// All axes have a known position.
    fn is_homed(&self) -> bool;

    /// Mesh correction is applied to moves.
    fn leveling_active(&self) -> bool;

    /// Enable or disable mesh correction.
    fn set_leveling_active(&mut self, active: bool);

    /// Soft endstops clamp moves to the travel envelope.
    fn soft_endstops_enabled(&self) -> bool;

    /// Enable or disable soft endstops.
    fn set_soft_endstops_enabled(&mut self, enabled: bool);
}

/// Toolhead selection and per-extruder coordinate offsets.
pub trait Toolheads {
    /// Currently selected extruder.
    fn active_extruder(&self) -> u8;

    /// Switch to another extruder, shifting the position belief by the offset difference.
    fn tool_change(&mut self, extruder: u8) -> Result<()>;

    /// Offset of an extruder's nozzle relative to extruder 0.
    fn hotend_offset(&self, extruder: u8) -> XyzPos;

    /// Replace an extruder's offset.
    fn set_hotend_offset(&mut self, extruder: u8, offset: XyzPos);
}

/// Backlash compensation state.
pub trait BacklashCompensation {
    /// Fraction of the distance applied on direction change (0.0..=1.0).
    fn correction(&self) -> f32;

    /// Set the correction fraction.
    fn set_correction(&mut self, correction: f32);

    /// Distance over which correction is spread.
    fn smoothing_mm(&self) -> f32;

    /// Set the smoothing distance.
    fn set_smoothing_mm(&mut self, mm: f32);

    /// Compensation distance for an axis.
    fn distance_mm(&self, axis: Axis) -> f32;

    /// Set the compensation distance for an axis.
    fn set_distance_mm(&mut self, axis: Axis, mm: f32);
}
