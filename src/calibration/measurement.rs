//! Calibration object faces, search tiers and the per-run measurement record.

use crate::config::units::{Axis, Direction, XyPos, XyzPos};
use crate::config::{CalibrationConfig, UncertaintyTiers};

/// A face of the calibration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    /// Upper face, touched moving down.
    Top,
    /// +X face, touched moving toward -X.
    Right,
    /// -Y face, touched moving toward +Y.
    Front,
    /// -X face, touched moving toward +X.
    Left,
    /// +Y face, touched moving toward -Y.
    Back,
}

impl Side {
    /// All faces in record order.
    pub const ALL: [Side; 5] = [Side::Top, Side::Right, Side::Front, Side::Left, Side::Back];

    /// Lateral faces in probing order.
    pub const LATERAL: [Side; 4] = [Side::Right, Side::Front, Side::Left, Side::Back];

    /// Slot in the measurement arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Right => 1,
            Side::Front => 2,
            Side::Left => 3,
            Side::Back => 4,
        }
    }

    /// Axis the face is measured along.
    #[inline]
    pub const fn axis(self) -> Axis {
        match self {
            Side::Top => Axis::Z,
            Side::Right | Side::Left => Axis::X,
            Side::Front | Side::Back => Axis::Y,
        }
    }

    /// Direction of travel toward the face.
    #[inline]
    pub const fn approach(self) -> Direction {
        match self {
            Side::Top | Side::Right | Side::Back => Direction::Negative,
            Side::Left | Side::Front => Direction::Positive,
        }
    }

    /// Face name for display/debugging.
    pub const fn name(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Front => "front",
            Side::Left => "left",
            Side::Back => "back",
        }
    }
}

/// How well the object position is known, which sets the park clearance
/// and whether the search is coarse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uncertainty {
    /// Coarse search: large steps, long travel cap, no backlash reading.
    Unknown,
    /// Fine search, about a millimeter of clearance.
    Uncertain,
    /// Fine search, minimal clearance.
    Certain,
    /// Explicit clearance in mm. Coarse when it equals the unknown tier.
    Custom(f32),
}

impl Uncertainty {
    /// Clearance in mm for this tier.
    pub fn mm(self, tiers: &UncertaintyTiers) -> f32 {
        match self {
            Uncertainty::Unknown => tiers.unknown,
            Uncertainty::Uncertain => tiers.uncertain,
            Uncertainty::Certain => tiers.certain,
            Uncertainty::Custom(mm) => mm,
        }
    }

    /// Searches at this tier use the coarse step: any clearance equal to
    /// the unknown tier.
    #[inline]
    pub fn is_fast(self, tiers: &UncertaintyTiers) -> bool {
        self.mm(tiers) == tiers.unknown
    }
}

/// Everything measured during one calibration run.
///
/// Created fresh for each run and discarded once offsets are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    /// Believed center of the object.
    pub obj_center: XyzPos,
    /// Trigger coordinate of each face, indexed by [`Side::index`].
    pub obj_side: [f32; 5],
    /// Backlash read at each face.
    pub backlash: [f32; 5],
    /// True center minus measured center.
    pub pos_error: XyzPos,
    /// Effective nozzle diameter at the contact height, X and Y.
    pub nozzle_outer_dimension: XyPos,
}

impl Measurements {
    /// A record starting from the configured center and nozzle diameter,
    /// with every face at its nominal position.
    pub fn new(config: &CalibrationConfig) -> Self {
        let d = config.nozzle_outer_diameter;
        let center = config.true_center;
        let mut obj_side = [0.0; 5];
        for side in Side::ALL {
            let axis = side.axis();
            // Faces are reached against their approach direction
            obj_side[side.index()] =
                center[axis] - side.approach().sign() * config.dimensions[axis] / 2.0;
        }
        Self {
            obj_center: center,
            obj_side,
            backlash: [0.0; 5],
            pos_error: XyzPos::ZERO,
            nozzle_outer_dimension: XyPos::new(d, d),
        }
    }

    /// Trigger coordinate of a face.
    #[inline]
    pub fn side(&self, side: Side) -> f32 {
        self.obj_side[side.index()]
    }

    /// Backlash read at a face.
    #[inline]
    pub fn backlash(&self, side: Side) -> f32 {
        self.backlash[side.index()]
    }

    /// Nozzle dimension along a horizontal axis.
    #[inline]
    pub fn nozzle_dimension(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.nozzle_outer_dimension.x,
            Axis::Y => self.nozzle_outer_dimension.y,
            Axis::Z => 0.0,
        }
    }
}
