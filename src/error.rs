//! Error types for the bed-leveling library.
//!
//! Provides unified error handling across configuration, mesh maintenance,
//! probing, and toolhead calibration.

use core::fmt;

use crate::config::units::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all bed-leveling operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Mesh computation error
    Mesh(MeshError),
    /// Probe hardware or measurement error
    Probe(ProbeError),
    /// Motion collaborator error
    Motion(MotionError),
    /// Toolhead calibration error
    Calibration(CalibrationError),
    /// Mesh acquisition session error
    Acquisition(AcquisitionError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Required field missing when building from parts
    MissingField(heapless::String<32>),
    /// Mesh span is empty or inverted (min must be < max)
    InvalidMeshSpan {
        /// Lower bound of the span
        min: f32,
        /// Upper bound of the span
        max: f32,
    },
    /// Mesh grid needs at least two points per axis
    InvalidGridSize {
        /// Points along X
        x: usize,
        /// Points along Y
        y: usize,
    },
    /// Machine travel bounds are empty or inverted on an axis
    InvalidTravelBounds {
        /// Offending axis
        axis: Axis,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },
    /// Hotend count is zero or above the supported maximum
    InvalidHotendCount(u8),
    /// Measurement resolution must be > 0
    InvalidResolution(f32),
    /// Feedrate must be > 0
    InvalidFeedrate(f32),
    /// Calibration object or nozzle dimension must be > 0
    InvalidDimension(f32),
    /// Uncertainty tiers must be positive and ordered unknown >= uncertain >= certain
    InvalidUncertainty(f32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Mesh computation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Cell index outside the grid
    IndexOutOfRange {
        /// X index
        x: usize,
        /// Y index
        y: usize,
    },
    /// Plane fit is singular (collinear or coincident samples)
    DegeneratePlane,
    /// Not enough valid samples for the requested computation
    InsufficientData {
        /// Samples available
        points: usize,
    },
    /// No grid point satisfies the search
    NoReachablePoint,
}

/// Probe hardware and touch-measurement errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// Probe deployment failed
    DeployFailed,
    /// Probe stow failed
    StowFailed,
    /// Reading the probe input failed
    PinError,
    /// Probe signal never changed within the travel cap
    NoTrigger {
        /// Axis being measured
        axis: Axis,
        /// Distance travelled before giving up (mm)
        travel: f32,
    },
    /// Bed probe failed at a point after all retries
    ProbeFailed {
        /// Probe X position
        x: f32,
        /// Probe Y position
        y: f32,
        /// Attempts made
        attempts: u8,
    },
    /// Point cannot be reached by the probe
    Unreachable {
        /// Requested X position
        x: f32,
        /// Requested Y position
        y: f32,
    },
}

/// Errors reported by the motion collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Axes must be homed before probing
    NotHomed,
    /// Move was rejected by the planner
    MoveRejected,
    /// Tool change to the given extruder failed
    ToolChangeFailed(u8),
}

/// Toolhead calibration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Extruder index is not configured
    InvalidExtruder {
        /// Requested extruder
        extruder: u8,
        /// Configured hotend count
        hotends: u8,
    },
    /// No lateral side is enabled and top-edge probing needs one
    NoSidesConfigured,
}

/// Mesh acquisition session errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// Operator or homing cancelled the session
    Cancelled,
    /// A session is already running
    AlreadyInProgress,
    /// No manual session is running
    NotInProgress,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Mesh(e) => write!(f, "Mesh error: {}", e),
            Error::Probe(e) => write!(f, "Probe error: {}", e),
            Error::Motion(e) => write!(f, "Motion error: {}", e),
            Error::Calibration(e) => write!(f, "Calibration error: {}", e),
            Error::Acquisition(e) => write!(f, "Acquisition error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::MissingField(name) => write!(f, "Missing field: '{}'", name),
            ConfigError::InvalidMeshSpan { min, max } => {
                write!(f, "Invalid mesh span: min ({}) must be < max ({})", min, max)
            }
            ConfigError::InvalidGridSize { x, y } => {
                write!(f, "Invalid mesh grid size: {}x{}. Need at least 2x2", x, y)
            }
            ConfigError::InvalidTravelBounds { axis, min, max } => {
                write!(f, "Invalid {} travel bounds: min ({}) must be < max ({})", axis, min, max)
            }
            ConfigError::InvalidHotendCount(n) => {
                write!(f, "Invalid hotend count: {}. Must be 1-{}", n, crate::config::MAX_HOTENDS)
            }
            ConfigError::InvalidResolution(v) => write!(f, "Invalid measurement resolution: {}. Must be > 0", v),
            ConfigError::InvalidFeedrate(v) => write!(f, "Invalid feedrate: {}. Must be > 0", v),
            ConfigError::InvalidDimension(v) => write!(f, "Invalid dimension: {}. Must be > 0", v),
            ConfigError::InvalidUncertainty(v) => {
                write!(f, "Invalid uncertainty: {}. Tiers must be > 0 and ordered", v)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::IndexOutOfRange { x, y } => write!(f, "Mesh index ({}, {}) out of range", x, y),
            MeshError::DegeneratePlane => write!(f, "Plane fit is degenerate"),
            MeshError::InsufficientData { points } => {
                write!(f, "Insufficient data: only {} valid samples", points)
            }
            MeshError::NoReachablePoint => write!(f, "No reachable mesh point"),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::DeployFailed => write!(f, "Probe deploy failed"),
            ProbeError::StowFailed => write!(f, "Probe stow failed"),
            ProbeError::PinError => write!(f, "Probe input read failed"),
            ProbeError::NoTrigger { axis, travel } => {
                write!(f, "No probe contact on {} after {} mm", axis, travel)
            }
            ProbeError::ProbeFailed { x, y, attempts } => {
                write!(f, "Probing failed at ({}, {}) after {} attempts", x, y, attempts)
            }
            ProbeError::Unreachable { x, y } => write!(f, "Point ({}, {}) is unreachable", x, y),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::NotHomed => write!(f, "Axes must be homed first"),
            MotionError::MoveRejected => write!(f, "Move rejected by planner"),
            MotionError::ToolChangeFailed(e) => write!(f, "Tool change to T{} failed", e),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::InvalidExtruder { extruder, hotends } => {
                write!(f, "Extruder {} not available ({} hotends)", extruder, hotends)
            }
            CalibrationError::NoSidesConfigured => write!(f, "No calibration object side is enabled"),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::Cancelled => write!(f, "Mesh acquisition cancelled"),
            AcquisitionError::AlreadyInProgress => write!(f, "Mesh acquisition already in progress"),
            AcquisitionError::NotInProgress => write!(f, "No manual probing session in progress"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MeshError> for Error {
    fn from(e: MeshError) -> Self {
        Error::Mesh(e)
    }
}

impl From<ProbeError> for Error {
    fn from(e: ProbeError) -> Self {
        Error::Probe(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Error::Calibration(e)
    }
}

impl From<AcquisitionError> for Error {
    fn from(e: AcquisitionError) -> Self {
        Error::Acquisition(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MeshError {}

#[cfg(feature = "std")]
impl std::error::Error for ProbeError {}

#[cfg(feature = "std")]
impl std::error::Error for MotionError {}

#[cfg(feature = "std")]
impl std::error::Error for CalibrationError {}

#[cfg(feature = "std")]
impl std::error::Error for AcquisitionError {}
