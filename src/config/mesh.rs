//! Mesh span and off-mesh correction policy.

use serde::Deserialize;

/// What `get_z_correction` returns for points outside the mesh span.
///
/// In TOML either `off_mesh = "propagate"` or `off_mesh = { raise = 2.0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffMeshPolicy {
    /// No substitution: the edge cells are extrapolated, and the single-axis
    /// line variants return NaN for indices off the grid.
    #[default]
    Propagate,
    /// Return a fixed Z raise (mm) to keep the nozzle clear of the bed.
    Raise(f32),
}

/// Physical span covered by the mesh grid.
#[derive(Debug, Clone, Deserialize)]
pub struct MeshConfig {
    /// X coordinate of the first grid column.
    pub min_x: f32,
    /// X coordinate of the last grid column.
    pub max_x: f32,
    /// Y coordinate of the first grid row.
    pub min_y: f32,
    /// Y coordinate of the last grid row.
    pub max_y: f32,

    /// Off-mesh behaviour.
    #[serde(default)]
    pub off_mesh: OffMeshPolicy,
}

impl MeshConfig {
    /// Create a mesh span with the default off-mesh policy.
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            off_mesh: OffMeshPolicy::default(),
        }
    }

    /// Replace the off-mesh policy.
    pub fn with_off_mesh(mut self, policy: OffMeshPolicy) -> Self {
        self.off_mesh = policy;
        self
    }

    /// Check the span is non-empty on both axes.
    pub fn is_valid(&self) -> bool {
        self.min_x < self.max_x && self.min_y < self.max_y
    }

    /// Whether a point lies inside the span (edges included).
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
