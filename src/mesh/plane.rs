//! Least-squares plane fitting and mesh tilt.

use crate::error::{MeshError, Result};

use super::grid::MeshGrid;

/// A plane `z = a·x + b·y + c`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    /// X slope.
    pub a: f32,
    /// Y slope.
    pub b: f32,
    /// Height at the origin.
    pub c: f32,
}

impl Plane {
    /// Height of the plane at (x, y).
    #[inline]
    pub fn z_at(&self, x: f32, y: f32) -> f32 {
        self.a * x + self.b * y + self.c
    }

    /// Plane through three points, solved in closed form from the normal
    /// `(p2 - p1) × (p3 - p1)`.
    ///
    /// # Errors
    ///
    /// Returns `MeshError::DegeneratePlane` for collinear or coincident points.
    pub fn from_three_points(points: [(f32, f32, f32); 3]) -> Result<Self> {
        let [(x1, y1, z1), (x2, y2, z2), (x3, y3, z3)] = points;
        let (ux, uy, uz) = (x2 - x1, y2 - y1, z2 - z1);
        let (vx, vy, vz) = (x3 - x1, y3 - y1, z3 - z1);

        let nx = uy * vz - uz * vy;
        let ny = uz * vx - ux * vz;
        let nz = ux * vy - uy * vx;

        let scale = ux.abs().max(uy.abs()).max(vx.abs()).max(vy.abs());
        if nz.abs() <= 1e-6 * scale * scale {
            return Err(MeshError::DegeneratePlane.into());
        }

        let a = -nx / nz;
        let b = -ny / nz;
        Ok(Self {
            a,
            b,
            c: z1 - a * x1 - b * y1,
        })
    }
}

/// Incremental weighted least-squares accumulator for `z = a·x + b·y + c`.
///
/// Samples are added one at a time relative to the first sample, so the
/// moments stay on the scale of the sample spread instead of the absolute
/// coordinates. [`PlaneFit::finish`] solves the 3×3 normal equations in
/// closed form using centered moments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneFit {
    origin: (f32, f32, f32),
    sum_w: f32,
    x: f32,
    y: f32,
    z: f32,
    xx: f32,
    yy: f32,
    xy: f32,
    xz: f32,
    yz: f32,
    count: usize,
}

/// Collinearity threshold on `det / (sxx·syy)`, which is `1 - r²` of the
/// sample coordinates.
const DEGENERATE_RATIO: f32 = 1e-4;

impl PlaneFit {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample with unit weight.
    #[inline]
    pub fn add(&mut self, x: f32, y: f32, z: f32) {
        self.add_weighted(x, y, z, 1.0);
    }

    /// Add a weighted sample.
    pub fn add_weighted(&mut self, x: f32, y: f32, z: f32, w: f32) {
        if self.count == 0 {
            self.origin = (x, y, z);
        }
        let (x, y, z) = (x - self.origin.0, y - self.origin.1, z - self.origin.2);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        self.sum_w += w;
        self.x += wx;
        self.y += wy;
        self.z += wz;
        self.xx += wx * x;
        self.yy += wy * y;
        self.xy += wx * y;
        self.xz += wx * z;
        self.yz += wy * z;
        self.count += 1;
    }

    /// Number of samples added.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Solve for the best-fit plane.
    ///
    /// # Errors
    ///
    /// `MeshError::InsufficientData` with fewer than three samples,
    /// `MeshError::DegeneratePlane` when the samples do not span a plane
    /// (all on one point or one line, in any orientation).
    pub fn finish(&self) -> Result<Plane> {
        if self.count < 3 || self.sum_w <= 0.0 {
            return Err(MeshError::InsufficientData { points: self.count }.into());
        }
        let n = self.sum_w;
        let (xbar, ybar, zbar) = (self.x / n, self.y / n, self.z / n);

        let sxx = self.xx / n - xbar * xbar;
        let syy = self.yy / n - ybar * ybar;
        let sxy = self.xy / n - xbar * ybar;
        let sxz = self.xz / n - xbar * zbar;
        let syz = self.yz / n - ybar * zbar;

        let det = sxx * syy - sxy * sxy;
        if sxx <= 0.0 || syy <= 0.0 || det <= DEGENERATE_RATIO * sxx * syy {
            return Err(MeshError::DegeneratePlane.into());
        }

        let a = (sxz * syy - syz * sxy) / det;
        let b = (syz * sxx - sxz * sxy) / det;
        let (x0, y0, z0) = self.origin;
        Ok(Plane {
            a,
            b,
            c: z0 + zbar - a * (xbar + x0) - b * (ybar + y0),
        })
    }
}

impl<const GX: usize, const GY: usize> MeshGrid<GX, GY> {
    /// Best-fit plane through the defined nodes.
    pub fn fit_plane(&self) -> Result<Plane> {
        let mut fit = PlaneFit::new();
        for (i, j, z) in self.valid_points() {
            fit.add(self.mesh_index_to_xpos(i), self.mesh_index_to_ypos(j), z);
        }
        fit.finish()
    }

    /// Add `plane` to every defined node.
    pub fn shift_by_plane(&mut self, plane: &Plane) {
        for i in 0..GX {
            let x = self.mesh_index_to_xpos(i);
            for j in 0..GY {
                let y = self.mesh_index_to_ypos(j);
                if let Some(z) = self.z_values[i][j].as_mut() {
                    *z += plane.z_at(x, y);
                }
            }
        }
    }

    /// Tilt the mesh by the plane through three (x, y, z) samples.
    ///
    /// The samples are residuals: measured height minus the current mesh
    /// correction at that point.
    pub fn tilt_mesh_based_on_3pts(&mut self, points: [(f32, f32, f32); 3]) -> Result<Plane> {
        let plane = Plane::from_three_points(points)?;
        self.shift_by_plane(&plane);
        Ok(plane)
    }

    /// Fill every undefined node from a plane fitted to the nodes that were
    /// defined on entry, weighted toward the node being filled by
    /// `1 + weight_factor·max(x_dist, y_dist) / distance`.
    ///
    /// Returns the number of nodes filled. The mesh is untouched on error.
    pub fn smart_fill_wlsf(&mut self, weight_factor: f32) -> Result<usize> {
        let original = self.z_values;
        let weight_scaled = weight_factor * self.x_dist().max(self.y_dist());
        let mut filled = [[None; GY]; GX];
        let mut count = 0;

        for i in 0..GX {
            for j in 0..GY {
                if original[i][j].is_some() {
                    continue;
                }
                let target = self.node_position(i, j);

                let mut fit = PlaneFit::new();
                for (si, col) in original.iter().enumerate() {
                    for (sj, z) in col.iter().enumerate() {
                        if let Some(z) = z {
                            let p = self.node_position(si, sj);
                            let w = 1.0 + weight_scaled / p.distance_to(target);
                            fit.add_weighted(p.x, p.y, *z, w);
                        }
                    }
                }
                let plane = fit.finish()?;
                filled[i][j] = Some(plane.z_at(target.x, target.y));
                count += 1;
            }
        }

        for (dst, src) in self.z_values.iter_mut().flatten().zip(filled.iter().flatten()) {
            if src.is_some() {
                *dst = *src;
            }
        }
        Ok(count)
    }
}
