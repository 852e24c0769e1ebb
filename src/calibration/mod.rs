//! Toolhead offset and backlash calibration against a reference object.
//!
//! The toolhead touches the faces of a conductive object at a known
//! position. The difference between where the object is and where the
//! planner believes it found it is the positional error of the active
//! toolhead; opposing faces give the object center independent of nozzle
//! size, and backing off after contact gives the backlash.

mod builder;
mod engine;
mod measurement;
mod report;

pub use builder::CalibratorBuilder;
pub use engine::{
    CalibrationCommand, CalibrationPhase, Calibrator, BACKLASH_TAKE_UP, TIP_PLUNGE_RATIO,
};
pub use measurement::{Measurements, Side, Uncertainty};
pub use report::CalibrationReport;
