//! Mesh grid store and coordinate mapping.

use crate::config::{MeshConfig, OffMeshPolicy, XyPos};
use crate::error::{ConfigError, Error, MeshError, Result};

/// Slack, in cells, applied before truncating a coordinate to a cell index so
/// that node positions map back to their own index despite rounding.
const CELL_INDEX_EPSILON: f32 = 1e-4;

/// Classification of a mesh point for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeshPointType {
    /// Cell holds no height.
    Invalid,
    /// Cell holds a probed or computed height.
    Real,
    /// Select candidates by the traversal bitmap: nodes not marked in it.
    SetInBitmap,
}

/// A grid point located by a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshIndex {
    /// Column index.
    pub x: usize,
    /// Row index.
    pub y: usize,
    /// Search metric of the point (mm).
    pub distance: f32,
}

/// Per-traversal marks over the grid. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshBitmap<const GX: usize, const GY: usize> {
    bits: [[bool; GY]; GX],
}

impl<const GX: usize, const GY: usize> MeshBitmap<GX, GY> {
    /// No cell marked.
    pub const fn new() -> Self {
        Self {
            bits: [[false; GY]; GX],
        }
    }

    /// Mark a cell.
    #[inline]
    pub fn mark(&mut self, x: usize, y: usize) {
        self.bits[x][y] = true;
    }

    /// Clear a cell's mark.
    #[inline]
    pub fn unmark(&mut self, x: usize, y: usize) {
        self.bits[x][y] = false;
    }

    /// Whether a cell is marked.
    #[inline]
    pub fn marked(&self, x: usize, y: usize) -> bool {
        self.bits[x][y]
    }

    /// Clear every mark.
    pub fn clear(&mut self) {
        self.bits = [[false; GY]; GX];
    }

    /// Number of marked cells.
    pub fn count(&self) -> usize {
        self.bits.iter().flatten().filter(|b| **b).count()
    }
}

impl<const GX: usize, const GY: usize> Default for MeshBitmap<GX, GY> {
    fn default() -> Self {
        Self::new()
    }
}

/// Count, mean and standard deviation of the valid cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStatistics {
    /// Number of valid cells.
    pub count: usize,
    /// Mean height.
    pub mean: f32,
    /// Population standard deviation.
    pub std_dev: f32,
}

/// Fixed-size grid of bed height corrections.
///
/// `GX × GY` nodes span `[min_x, max_x] × [min_y, max_y]` evenly. Every cell is
/// either a finite height or undefined (`None`). Node positions are computed
/// once at construction.
#[derive(Debug, Clone)]
pub struct MeshGrid<const GX: usize, const GY: usize> {
    pub(crate) z_values: [[Option<f32>; GY]; GX],
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    x_dist: f32,
    y_dist: f32,
    x_pos: [f32; GX],
    y_pos: [f32; GY],
    off_mesh: OffMeshPolicy,
}

impl<const GX: usize, const GY: usize> MeshGrid<GX, GY> {
    /// Number of grid points.
    pub const POINTS: usize = GX * GY;

    /// Create an all-undefined grid over the configured span.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGridSize` for fewer than two points per
    /// axis and `ConfigError::InvalidMeshSpan` for an empty span.
    pub fn new(config: &MeshConfig) -> Result<Self> {
        if GX < 2 || GY < 2 {
            return Err(Error::Config(ConfigError::InvalidGridSize { x: GX, y: GY }));
        }
        if config.min_x >= config.max_x {
            return Err(Error::Config(ConfigError::InvalidMeshSpan {
                min: config.min_x,
                max: config.max_x,
            }));
        }
        if config.min_y >= config.max_y {
            return Err(Error::Config(ConfigError::InvalidMeshSpan {
                min: config.min_y,
                max: config.max_y,
            }));
        }

        let x_dist = (config.max_x - config.min_x) / (GX - 1) as f32;
        let y_dist = (config.max_y - config.min_y) / (GY - 1) as f32;

        let mut x_pos = [0.0; GX];
        for (i, x) in x_pos.iter_mut().enumerate() {
            *x = config.min_x + i as f32 * x_dist;
        }
        let mut y_pos = [0.0; GY];
        for (j, y) in y_pos.iter_mut().enumerate() {
            *y = config.min_y + j as f32 * y_dist;
        }

        Ok(Self {
            z_values: [[None; GY]; GX],
            min_x: config.min_x,
            min_y: config.min_y,
            max_x: config.max_x,
            max_y: config.max_y,
            x_dist,
            y_dist,
            x_pos,
            y_pos,
            off_mesh: config.off_mesh,
        })
    }

    /// Spacing between columns.
    #[inline]
    pub fn x_dist(&self) -> f32 {
        self.x_dist
    }

    /// Spacing between rows.
    #[inline]
    pub fn y_dist(&self) -> f32 {
        self.y_dist
    }

    /// Off-mesh policy in force.
    #[inline]
    pub fn off_mesh(&self) -> OffMeshPolicy {
        self.off_mesh
    }

    /// Change the off-mesh policy.
    pub fn set_off_mesh(&mut self, policy: OffMeshPolicy) {
        self.off_mesh = policy;
    }

    /// Whether (x, y) lies inside the mesh span.
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Center of the mesh span.
    pub fn center(&self) -> XyPos {
        XyPos::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Physical X of column `i`. Indices past the grid extrapolate.
    #[inline]
    pub fn mesh_index_to_xpos(&self, i: usize) -> f32 {
        if i < GX {
            self.x_pos[i]
        } else {
            self.min_x + i as f32 * self.x_dist
        }
    }

    /// Physical Y of row `j`. Indices past the grid extrapolate.
    #[inline]
    pub fn mesh_index_to_ypos(&self, j: usize) -> f32 {
        if j < GY {
            self.y_pos[j]
        } else {
            self.min_y + j as f32 * self.y_dist
        }
    }

    /// Physical position of node (i, j).
    #[inline]
    pub fn node_position(&self, i: usize, j: usize) -> XyPos {
        XyPos::new(self.mesh_index_to_xpos(i), self.mesh_index_to_ypos(j))
    }

    /// Column of the cell containing `x`, clamped to `[0, GX-1]`.
    ///
    /// Points beyond the last column map to it, and callers extrapolate from there.
    pub fn get_cell_index_x(&self, x: f32) -> usize {
        let cx = libm::floorf((x - self.min_x) / self.x_dist + CELL_INDEX_EPSILON);
        cx.clamp(0.0, (GX - 1) as f32) as usize
    }

    /// Row of the cell containing `y`, clamped to `[0, GY-1]`.
    pub fn get_cell_index_y(&self, y: f32) -> usize {
        let cy = libm::floorf((y - self.min_y) / self.y_dist + CELL_INDEX_EPSILON);
        cy.clamp(0.0, (GY - 1) as f32) as usize
    }

    /// Nearest column to `x`, or `None` more than half a cell outside the span.
    pub fn find_closest_x_index(&self, x: f32) -> Option<usize> {
        let px = libm::floorf((x - self.min_x) / self.x_dist + 0.5);
        (px >= 0.0 && px < GX as f32).then_some(px as usize)
    }

    /// Nearest row to `y`, or `None` more than half a cell outside the span.
    pub fn find_closest_y_index(&self, y: f32) -> Option<usize> {
        let py = libm::floorf((y - self.min_y) / self.y_dist + 0.5);
        (py >= 0.0 && py < GY as f32).then_some(py as usize)
    }

    /// Height at node (i, j), `None` when undefined.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the grid.
    #[inline]
    pub fn z(&self, i: usize, j: usize) -> Option<f32> {
        self.z_values[i][j]
    }

    /// Height at node (i, j) or `None` if undefined or off the grid.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        self.z_values.get(i).and_then(|col| col.get(j)).copied().flatten()
    }

    /// Write a node. A non-finite height marks the node undefined.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the grid.
    #[inline]
    pub fn set_z(&mut self, i: usize, j: usize, z: f32) {
        self.z_values[i][j] = z.is_finite().then_some(z);
    }

    /// Write a node addressed from outside the crate, such as a host command
    /// naming a node by index.
    ///
    /// # Errors
    ///
    /// `MeshError::IndexOutOfRange` if (i, j) is not on the grid.
    pub fn try_set_z(&mut self, i: usize, j: usize, z: f32) -> Result<()> {
        if i >= GX || j >= GY {
            return Err(MeshError::IndexOutOfRange { x: i, y: j }.into());
        }
        self.set_z(i, j, z);
        Ok(())
    }

    /// Mark a node undefined.
    #[inline]
    pub fn invalidate_point(&mut self, i: usize, j: usize) {
        self.z_values[i][j] = None;
    }

    /// Classify a node.
    #[inline]
    pub fn point_type(&self, i: usize, j: usize) -> MeshPointType {
        if self.z_values[i][j].is_some() {
            MeshPointType::Real
        } else {
            MeshPointType::Invalid
        }
    }

    /// `true` when no node is undefined.
    pub fn mesh_is_valid(&self) -> bool {
        self.z_values.iter().flatten().all(Option::is_some)
    }

    /// Number of defined nodes.
    pub fn valid_count(&self) -> usize {
        self.z_values.iter().flatten().filter(|z| z.is_some()).count()
    }

    /// Number of undefined nodes.
    pub fn invalid_count(&self) -> usize {
        Self::POINTS - self.valid_count()
    }

    /// Iterate `(i, j, z)` over defined nodes, column-major (x outer).
    pub fn valid_points(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.z_values.iter().enumerate().flat_map(|(i, col)| {
            col.iter()
                .enumerate()
                .filter_map(move |(j, z)| z.map(|z| (i, j, z)))
        })
    }

    /// Mark every node undefined.
    pub fn invalidate(&mut self) {
        self.z_values = [[None; GY]; GX];
    }

    /// Zero every node.
    pub fn reset(&mut self) {
        self.set_all_mesh_points_to_value(0.0);
    }

    /// Set every node to `value`.
    pub fn set_all_mesh_points_to_value(&mut self, value: f32) {
        let z = value.is_finite().then_some(value);
        self.z_values = [[z; GY]; GX];
    }

    /// Add `offset` to every defined node.
    pub fn shift_mesh_height(&mut self, offset: f32) {
        for z in self.z_values.iter_mut().flatten().flatten() {
            *z += offset;
        }
    }

    /// Statistics over the defined nodes, `None` if there are none.
    pub fn statistics(&self) -> Option<MeshStatistics> {
        let count = self.valid_count();
        if count == 0 {
            return None;
        }
        let n = count as f32;
        let mean = self.valid_points().map(|(_, _, z)| z).sum::<f32>() / n;
        let variance = self
            .valid_points()
            .map(|(_, _, z)| (z - mean) * (z - mean))
            .sum::<f32>()
            / n;

        Some(MeshStatistics {
            count,
            mean,
            std_dev: libm::sqrtf(variance),
        })
    }

    /// Subtract the mean (plus `offset`) from every defined node, so the mesh
    /// averages to `-offset`. Returns the statistics before the adjustment.
    pub fn adjust_mesh_to_mean(&mut self, offset: f32) -> Option<MeshStatistics> {
        let stats = self.statistics()?;
        info!(
            "mesh: {} samples, mean {}, std dev {}",
            stats.count,
            stats.mean,
            stats.std_dev
        );
        self.shift_mesh_height(-(stats.mean + offset));
        Some(stats)
    }

    /// Raw heights for persistence, NaN for undefined nodes.
    pub fn to_raw(&self) -> [[f32; GY]; GX] {
        let mut raw = [[f32::NAN; GY]; GX];
        for (dst, src) in raw.iter_mut().flatten().zip(self.z_values.iter().flatten()) {
            if let Some(z) = src {
                *dst = *z;
            }
        }
        raw
    }

    /// Load heights from persistence. Non-finite values become undefined.
    pub fn load_raw(&mut self, raw: &[[f32; GY]; GX]) {
        for (dst, src) in self.z_values.iter_mut().flatten().zip(raw.iter().flatten()) {
            *dst = src.is_finite().then_some(*src);
        }
    }
}
