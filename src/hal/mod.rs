//! Collaborator interfaces.
//!
//! The planner, toolhead changer, backlash compensator, probes and operator
//! input live outside this crate. They are reached through the traits here so
//! the leveling and calibration logic can run against real firmware or a
//! simulation.

mod input;
mod motion;
mod probe;

pub use input::{JogEncoder, OperatorInput};
pub use motion::{BacklashCompensation, Motion, Toolheads};
pub use probe::{BedProbe, PinProbe, ProbeSignal};
