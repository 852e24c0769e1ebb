//! Bilinear height correction.
//!
//! The motion layer calls [`MeshGrid::get_z_correction`] for every segment
//! endpoint, so these paths do no allocation and no validation beyond the
//! off-mesh and undefined-node checks.

use crate::config::OffMeshPolicy;

use super::grid::MeshGrid;

/// Height at `a0` on the line through `(a1, z1)` and `(a2, z2)`.
#[inline]
pub fn calc_z0(a0: f32, a1: f32, z1: f32, a2: f32, z2: f32) -> f32 {
    z1 + (z2 - z1) * (a0 - a1) / (a2 - a1)
}

impl<const GX: usize, const GY: usize> MeshGrid<GX, GY> {
    /// Value for indices outside the grid on the single-line paths.
    #[inline]
    fn outer_z(&self) -> f32 {
        match self.off_mesh() {
            OffMeshPolicy::Raise(z) => z,
            OffMeshPolicy::Propagate => f32::NAN,
        }
    }

    /// Node value with undefined nodes as NaN, for the interpolation kernels.
    #[inline]
    fn z_or_nan(&self, i: usize, j: usize) -> f32 {
        self.z_values[i][j].unwrap_or(f32::NAN)
    }

    /// Interpolated correction at (x, y).
    ///
    /// The enclosing cell comes from the clamped cell index, and the far
    /// neighbour is clamped to the last node so edge cells extrapolate flat.
    /// With [`OffMeshPolicy::Raise`] any point outside the span returns the
    /// raise value. If a contributing node is undefined the correction is 0.
    pub fn get_z_correction(&self, x: f32, y: f32) -> f32 {
        if let OffMeshPolicy::Raise(z) = self.off_mesh() {
            if !self.contains(x, y) {
                return z;
            }
        }

        let cx = self.get_cell_index_x(x);
        let cy = self.get_cell_index_y(y);
        let mx = cx.min(GX - 2) + 1;
        let my = cy.min(GY - 2) + 1;

        let x1 = self.mesh_index_to_xpos(cx);
        let x2 = self.mesh_index_to_xpos(cx + 1);

        let z1 = calc_z0(x, x1, self.z_or_nan(cx, cy), x2, self.z_or_nan(mx, cy));
        let z2 = calc_z0(x, x1, self.z_or_nan(cx, my), x2, self.z_or_nan(mx, my));

        let z0 = calc_z0(
            y,
            self.mesh_index_to_ypos(cy),
            z1,
            self.mesh_index_to_ypos(cy + 1),
            z2,
        );

        if z0.is_nan() {
            debug!("get_z_correction({}, {}): undefined mesh node, no correction", x, y);
            return 0.0;
        }
        z0
    }

    /// Correction along the horizontal mesh line `yi`, for moves that cross
    /// only vertical grid lines. `xi` is the cell the point falls in.
    ///
    /// Indices off the grid return the raise value, or NaN under
    /// [`OffMeshPolicy::Propagate`].
    pub fn z_correction_for_x_on_horizontal_mesh_line(&self, x: f32, xi: isize, yi: isize) -> f32 {
        if xi < 0 || yi < 0 || xi as usize >= GX || yi as usize >= GY {
            debug!("horizontal mesh line index ({}, {}) off grid", xi, yi);
            return self.outer_z();
        }
        let (xi, yi) = (xi as usize, yi as usize);

        let ratio = (x - self.mesh_index_to_xpos(xi)) / self.x_dist();
        let z1 = self.z_or_nan(xi, yi);
        let z2 = self.z_or_nan(xi.min(GX - 2) + 1, yi);
        z1 + ratio * (z2 - z1)
    }

    /// Correction along the vertical mesh line `xi`, for moves that cross
    /// only horizontal grid lines. `yi` is the cell the point falls in.
    pub fn z_correction_for_y_on_vertical_mesh_line(&self, y: f32, xi: isize, yi: isize) -> f32 {
        if xi < 0 || yi < 0 || xi as usize >= GX || yi as usize >= GY {
            debug!("vertical mesh line index ({}, {}) off grid", xi, yi);
            return self.outer_z();
        }
        let (xi, yi) = (xi as usize, yi as usize);

        let ratio = (y - self.mesh_index_to_ypos(yi)) / self.y_dist();
        let z1 = self.z_or_nan(xi, yi);
        let z2 = self.z_or_nan(xi, yi.min(GY - 2) + 1);
        z1 + ratio * (z2 - z1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;

    fn flat_3x3() -> MeshGrid<3, 3> {
        let mut g = MeshGrid::new(&MeshConfig::new(0.0, 20.0, 0.0, 20.0)).unwrap();
        g.reset();
        g
    }

    #[test]
    fn test_calc_z0() {
        assert_eq!(calc_z0(5.0, 0.0, 1.0, 10.0, 3.0), 2.0);
        assert_eq!(calc_z0(15.0, 0.0, 1.0, 10.0, 3.0), 4.0);
    }

    #[test]
    fn test_bilinear_center_of_cell() {
        let mut g = flat_3x3();
        g.set_z(0, 0, 1.0);
        g.set_z(1, 0, 2.0);
        g.set_z(0, 1, 3.0);
        g.set_z(1, 1, 4.0);

        assert!((g.get_z_correction(5.0, 5.0) - 2.5).abs() < 1e-6);
        assert!((g.get_z_correction(5.0, 0.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_edge_extrapolates_flat() {
        let mut g = flat_3x3();
        g.set_z(2, 0, 0.5);
        // Past the last column the value holds
        assert!((g.get_z_correction(25.0, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_undefined_node_gives_zero() {
        let mut g = flat_3x3();
        g.set_z(1, 1, 1.0);
        g.invalidate_point(0, 0);
        assert_eq!(g.get_z_correction(5.0, 5.0), 0.0);
        // A cell not touching the undefined node still interpolates
        assert!((g.get_z_correction(15.0, 15.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_raise_policy_off_mesh() {
        let mut g = flat_3x3();
        g.set_off_mesh(OffMeshPolicy::Raise(2.0));
        assert_eq!(g.get_z_correction(-1.0, 10.0), 2.0);
        assert_eq!(g.get_z_correction(10.0, 21.0), 2.0);
        assert_eq!(g.get_z_correction(20.0, 20.0), 0.0);
    }

    #[test]
    fn test_line_variants() {
        let mut g = flat_3x3();
        g.set_z(0, 1, 1.0);
        g.set_z(1, 1, 3.0);

        assert!((g.z_correction_for_x_on_horizontal_mesh_line(5.0, 0, 1) - 2.0).abs() < 1e-6);
        assert!((g.z_correction_for_y_on_vertical_mesh_line(5.0, 0, 0) - 0.5).abs() < 1e-6);
        // Last column reads itself as the neighbour
        assert_eq!(g.z_correction_for_x_on_horizontal_mesh_line(22.0, 2, 1), 0.0);
    }

    #[test]
    fn test_line_variants_off_grid() {
        let mut g = flat_3x3();
        assert!(g.z_correction_for_x_on_horizontal_mesh_line(5.0, -1, 0).is_nan());
        assert!(g.z_correction_for_y_on_vertical_mesh_line(5.0, 0, 3).is_nan());

        g.set_off_mesh(OffMeshPolicy::Raise(1.5));
        assert_eq!(g.z_correction_for_x_on_horizontal_mesh_line(5.0, 3, 0), 1.5);
    }
}
