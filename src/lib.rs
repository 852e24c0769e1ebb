//! # bed-leveling
//!
//! Bed-leveling mesh and calibration-object probing for 3D printer firmware,
//! with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Unified mesh**: Fixed-size grid of height corrections with explicit
//!   per-cell validity and bilinear interpolation
//! - **Mesh acquisition**: Automatic probing, interactive manual probing with
//!   a jog wheel, per-node fine tuning, smart fill of missing cells and plane
//!   tilting
//! - **Toolhead calibration**: Touch-probing of a conductive object to find
//!   hotend offsets, positional error and backlash
//! - **Configuration-driven**: Machine, mesh, probe and calibration settings
//!   in TOML files
//! - **no_std compatible**: Core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bed_leveling::{MeshLeveling, ProbeOrder, SystemConfig};
//!
//! // Load configuration from TOML
//! let config: SystemConfig = bed_leveling::load_config("printer.toml")?;
//!
//! // Probe a 5x5 mesh
//! let mut leveling = MeshLeveling::<5, 5>::new(&config)?;
//! leveling.probe_entire_mesh(&mut planner, &mut probe, &mut panel, ProbeOrder::Furthest, true)?;
//!
//! // Height correction for the motion layer
//! let dz = leveling.get_z_correction(120.0, 80.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O, TOML parsing and the `log` facade
//! - `alloc`: Enables heap allocation for no_std with allocator
//! - `defmt`: Enables defmt logging for embedded targets
//! - `log`: Routes internal logging to the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Must come first so the logging macros are visible to the modules below
#[macro_use]
mod fmt;

// Core modules
pub mod calibration;
pub mod config;
pub mod error;
pub mod hal;
pub mod leveling;
pub mod mesh;

// Re-exports for ergonomic API
pub use calibration::{
    CalibrationCommand, CalibrationReport, Calibrator, CalibratorBuilder, Measurements, Side,
    Uncertainty,
};
pub use config::{validate_config, CalibrationConfig, MeshConfig, OffMeshPolicy, SystemConfig};
pub use error::{Error, Result};
pub use hal::{BacklashCompensation, BedProbe, JogEncoder, Motion, OperatorInput, ProbeSignal, Toolheads};
pub use leveling::{AcquisitionState, MeshLeveling, ProbeOrder, ProbeReference};
pub use mesh::{MeshGrid, MeshPointType};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Axis, Direction, MmPerMin, MmPerSec, XyPos, XyzPos};
