//! Configuration module for bed-leveling.
//!
//! Provides types for loading and validating machine, mesh, probe and
//! calibration-object settings from TOML files (with `std` feature) or
//! pre-built values.

mod calibration;
#[cfg(feature = "std")]
mod loader;
mod machine;
mod mesh;
mod probe;
mod system;
pub mod units;
mod validation;

pub use calibration::{
    CalibrationConfig, CalibrationFeedrates, SearchLimits, SideSelection, UncertaintyTiers,
};
pub use machine::MachineConfig;
pub use mesh::{MeshConfig, OffMeshPolicy};
pub use probe::{ProbeBounds, ProbeConfig};
pub use system::SystemConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Axis, Direction, MmPerMin, MmPerSec, XyPos, XyzPos};

/// Largest supported number of hotends.
pub const MAX_HOTENDS: usize = 8;
