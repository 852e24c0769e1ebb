//! Mesh acquisition: automatic and manual probing, point searches and tilt.

mod controller;
mod state;

pub use controller::{MeshLeveling, FINE_TUNE_STEP, MANUAL_JOG_STEP, SHIM_MEASURE_RAISE};
pub use state::{AcquisitionState, ProbeOrder, ProbeReference};
