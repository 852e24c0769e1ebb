//! Unified bed-leveling mesh.
//!
//! [`MeshGrid`] stores the height corrections and maps bed coordinates onto
//! the grid. Interpolation, smart fill and plane fitting are implemented as
//! further `impl` blocks on the grid in the submodules.

mod grid;
mod interpolate;
mod plane;
mod repair;

pub use grid::{MeshBitmap, MeshGrid, MeshIndex, MeshPointType, MeshStatistics};
pub use interpolate::calc_z0;
pub use plane::{Plane, PlaneFit};
pub use repair::{
    FillReport, FLAT_COPY_WEIGHT, SMART_FILL_DIRECTIONS, SMART_FILL_MAX_PASSES, SMART_FILL_WEIGHTS,
};
