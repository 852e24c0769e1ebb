//! Directional smart fill of undefined mesh nodes.

use super::grid::{MeshBitmap, MeshGrid};

/// Walk directions from an undefined node: the four axis directions first,
/// then the diagonals.
pub const SMART_FILL_DIRECTIONS: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Weight of each direction's estimate, in [`SMART_FILL_DIRECTIONS`] order.
/// Axis directions count double against diagonals.
pub const SMART_FILL_WEIGHTS: [f32; 8] = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5];

/// Weight scale of a flat copy, used when a direction yields one sample only.
pub const FLAT_COPY_WEIGHT: f32 = 0.5;

/// Maximum number of fill passes.
pub const SMART_FILL_MAX_PASSES: usize = 8;

/// Outcome of a smart fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    /// Nodes given a value.
    pub filled: usize,
    /// Nodes still undefined.
    pub remaining: usize,
    /// Passes run.
    pub passes: usize,
}

impl FillReport {
    /// Every node is now defined.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

impl<const GX: usize, const GY: usize> MeshGrid<GX, GY> {
    /// First two samples along a direction as `(steps, z)`, skipping undefined
    /// nodes and nodes marked in `pending`.
    fn walk(
        &self,
        i: usize,
        j: usize,
        (dx, dy): (isize, isize),
        pending: &MeshBitmap<GX, GY>,
    ) -> ([(f32, f32); 2], usize) {
        let mut found = [(0.0, 0.0); 2];
        let mut n = 0;
        let mut step = 1;
        loop {
            let x = i as isize + dx * step;
            let y = j as isize + dy * step;
            if x < 0 || y < 0 || x as usize >= GX || y as usize >= GY {
                break;
            }
            let (x, y) = (x as usize, y as usize);
            if let Some(z) = self.z_values[x][y] {
                if !pending.marked(x, y) {
                    found[n] = (step as f32, z);
                    n += 1;
                    if n == found.len() {
                        break;
                    }
                }
            }
            step += 1;
        }
        (found, n)
    }

    /// Weighted estimate for node (i, j). `None` if no direction has a sample.
    ///
    /// A node enclosed by samples in all four axis directions is clamped to
    /// the range of the nearest sample in each direction. Edge and corner
    /// nodes are left unclamped so a sloped bed is extrapolated.
    fn smart_fill_estimate(&self, i: usize, j: usize, pending: &MeshBitmap<GX, GY>) -> Option<f32> {
        let mut sum = 0.0;
        let mut weight_sum = 0.0;
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        let mut enclosed = true;

        for (k, (dir, weight)) in SMART_FILL_DIRECTIONS.iter().zip(SMART_FILL_WEIGHTS).enumerate() {
            let (found, n) = self.walk(i, j, *dir, pending);
            if k < 4 && n == 0 {
                enclosed = false;
            }
            let (estimate, weight) = match n {
                2 => {
                    let [(d1, v1), (d2, v2)] = found;
                    (v1 + (v1 - v2) * d1 / (d2 - d1), weight)
                }
                1 => (found[0].1, weight * FLAT_COPY_WEIGHT),
                _ => continue,
            };
            lo = lo.min(found[0].1);
            hi = hi.max(found[0].1);
            sum += estimate * weight;
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return None;
        }
        let estimate = sum / weight_sum;
        Some(if enclosed { estimate.clamp(lo, hi) } else { estimate })
    }

    /// Fill undefined nodes from their neighbours.
    ///
    /// Each pass estimates every undefined node from the nodes defined before
    /// the pass; nodes filled during the pass are marked in a bitmap and not
    /// used as samples until the next one. Passes repeat until the mesh is
    /// complete, a pass fills nothing, or [`SMART_FILL_MAX_PASSES`] is reached.
    /// Nodes that cannot be filled stay undefined.
    pub fn smart_fill_mesh(&mut self) -> FillReport {
        let mut filled_this_pass = MeshBitmap::<GX, GY>::new();
        let mut filled = 0;
        let mut passes = 0;

        while passes < SMART_FILL_MAX_PASSES && !self.mesh_is_valid() {
            passes += 1;
            filled_this_pass.clear();

            for i in 0..GX {
                for j in 0..GY {
                    if self.z_values[i][j].is_some() {
                        continue;
                    }
                    if let Some(z) = self.smart_fill_estimate(i, j, &filled_this_pass) {
                        self.z_values[i][j] = Some(z);
                        filled_this_pass.mark(i, j);
                    }
                }
            }

            let progress = filled_this_pass.count();
            trace!("smart fill pass {}: {} nodes", passes, progress);
            if progress == 0 {
                break;
            }
            filled += progress;
        }

        let remaining = self.invalid_count();
        if remaining > 0 {
            warn!("smart fill left {} mesh nodes undefined", remaining);
        }

        FillReport {
            filled,
            remaining,
            passes,
        }
    }
}
