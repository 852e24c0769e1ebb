//! Property tests for the mesh grid and interpolation.

use bed_leveling::config::{MeshConfig, OffMeshPolicy};
use bed_leveling::mesh::{MeshGrid, MeshPointType};
use proptest::prelude::*;

type Grid = MeshGrid<5, 4>;

fn grid() -> Grid {
    MeshGrid::new(&MeshConfig::new(10.0, 210.0, 20.0, 170.0)).unwrap()
}

fn filled(values: &[f32]) -> Grid {
    let mut g = grid();
    for i in 0..5 {
        for j in 0..4 {
            g.set_z(i, j, values[i * 4 + j]);
        }
    }
    g
}

proptest! {
    #[test]
    fn validity_tracks_defined_nodes(values in prop::collection::vec(-1.0f32..1.0, 20), hole in 0usize..20) {
        let mut g = filled(&values);
        prop_assert!(g.mesh_is_valid());

        g.invalidate_point(hole / 4, hole % 4);
        prop_assert!(!g.mesh_is_valid());
        prop_assert_eq!(g.point_type(hole / 4, hole % 4), MeshPointType::Invalid);
        prop_assert_eq!(g.invalid_count(), 1);
    }

    #[test]
    fn correction_at_node_is_node_value(values in prop::collection::vec(-1.0f32..1.0, 20), i in 0usize..5, j in 0usize..4) {
        let g = filled(&values);
        let node = g.node_position(i, j);
        let z = g.get_z_correction(node.x, node.y);
        prop_assert!((z - values[i * 4 + j]).abs() < 1e-4, "node ({}, {}) gave {}", i, j, z);
    }

    #[test]
    fn cell_index_round_trips(i in 0usize..4, j in 0usize..3, fx in 0.0f32..0.99, fy in 0.0f32..0.99) {
        let g = grid();
        let x = g.mesh_index_to_xpos(i) + fx * g.x_dist();
        let y = g.mesh_index_to_ypos(j) + fy * g.y_dist();
        prop_assert_eq!(g.get_cell_index_x(x), i);
        prop_assert_eq!(g.get_cell_index_y(y), j);
    }

    #[test]
    fn closest_index_outside_span_is_none(offset in 30.0f32..500.0) {
        let g = grid();
        prop_assert_eq!(g.find_closest_x_index(10.0 - offset), None);
        prop_assert_eq!(g.find_closest_x_index(210.0 + offset), None);
        prop_assert_eq!(g.find_closest_y_index(170.0 + offset), None);
    }

    #[test]
    fn closest_index_near_span_is_some(x in -14.0f32..234.0) {
        let g = grid();
        let i = g.find_closest_x_index(x);
        prop_assert!(i.is_some(), "no index for {}", x);
        let node = g.mesh_index_to_xpos(i.unwrap_or_default());
        prop_assert!((node - x).abs() <= g.x_dist() / 2.0 + 1e-3);
    }

    #[test]
    fn correction_bounded_within_cell(
        values in prop::collection::vec(-1.0f32..1.0, 20),
        i in 0usize..4,
        j in 0usize..3,
        fx in 0.0f32..0.999,
        fy in 0.0f32..0.999,
    ) {
        let g = filled(&values);
        let x = g.mesh_index_to_xpos(i) + fx * g.x_dist();
        let y = g.mesh_index_to_ypos(j) + fy * g.y_dist();
        let corners = [
            values[i * 4 + j],
            values[(i + 1) * 4 + j],
            values[i * 4 + j + 1],
            values[(i + 1) * 4 + j + 1],
        ];
        let lo = corners.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let z = g.get_z_correction(x, y);
        prop_assert!(z >= lo - 1e-4 && z <= hi + 1e-4, "{} outside [{}, {}]", z, lo, hi);
    }

    #[test]
    fn correction_monotonic_along_x(
        values in prop::collection::vec(-1.0f32..1.0, 20),
        i in 0usize..4,
        j in 0usize..3,
        fy in 0.0f32..0.999,
        fa in 0.0f32..0.999,
        fb in 0.0f32..0.999,
    ) {
        let g = filled(&values);
        let (f1, f2) = if fa <= fb { (fa, fb) } else { (fb, fa) };
        let y = g.mesh_index_to_ypos(j) + fy * g.y_dist();
        let z1 = g.get_z_correction(g.mesh_index_to_xpos(i) + f1 * g.x_dist(), y);
        let z2 = g.get_z_correction(g.mesh_index_to_xpos(i) + f2 * g.x_dist(), y);

        let left = values[i * 4 + j] + fy * (values[i * 4 + j + 1] - values[i * 4 + j]);
        let right = values[(i + 1) * 4 + j] + fy * (values[(i + 1) * 4 + j + 1] - values[(i + 1) * 4 + j]);
        if right >= left {
            prop_assert!(z2 >= z1 - 1e-4, "{} then {} on a rising row", z1, z2);
        } else {
            prop_assert!(z2 <= z1 + 1e-4, "{} then {} on a falling row", z1, z2);
        }
    }

    #[test]
    fn correction_monotonic_along_y(
        values in prop::collection::vec(-1.0f32..1.0, 20),
        i in 0usize..4,
        j in 0usize..3,
        fx in 0.0f32..0.999,
        fa in 0.0f32..0.999,
        fb in 0.0f32..0.999,
    ) {
        let g = filled(&values);
        let (f1, f2) = if fa <= fb { (fa, fb) } else { (fb, fa) };
        let x = g.mesh_index_to_xpos(i) + fx * g.x_dist();
        let z1 = g.get_z_correction(x, g.mesh_index_to_ypos(j) + f1 * g.y_dist());
        let z2 = g.get_z_correction(x, g.mesh_index_to_ypos(j) + f2 * g.y_dist());

        let front = values[i * 4 + j] + fx * (values[(i + 1) * 4 + j] - values[i * 4 + j]);
        let back = values[i * 4 + j + 1] + fx * (values[(i + 1) * 4 + j + 1] - values[i * 4 + j + 1]);
        if back >= front {
            prop_assert!(z2 >= z1 - 1e-4, "{} then {} on a rising column", z1, z2);
        } else {
            prop_assert!(z2 <= z1 + 1e-4, "{} then {} on a falling column", z1, z2);
        }
    }

    #[test]
    fn smart_fill_stays_within_neighbours(values in prop::collection::vec(-1.0f32..1.0, 20), i in 1usize..4, j in 1usize..3) {
        let mut g = filled(&values);
        g.invalidate_point(i, j);

        let report = g.smart_fill_mesh();
        prop_assert!(report.is_complete());

        let neighbours = [
            values[(i - 1) * 4 + j],
            values[(i + 1) * 4 + j],
            values[i * 4 + j - 1],
            values[i * 4 + j + 1],
            values[(i - 1) * 4 + j - 1],
            values[(i + 1) * 4 + j + 1],
            values[(i - 1) * 4 + j + 1],
            values[(i + 1) * 4 + j - 1],
        ];
        let lo = neighbours.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = neighbours.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let z = g.z(i, j).unwrap();
        prop_assert!(z >= lo - 1e-5 && z <= hi + 1e-5, "{} outside [{}, {}]", z, lo, hi);
    }
}

/// Quarter-cell and edge-midpoint interpolation on a 3x3 mesh.
#[test]
fn test_three_by_three_quarter_cell() {
    let mut g = MeshGrid::<3, 3>::new(&MeshConfig::new(0.0, 100.0, 0.0, 100.0)).unwrap();
    g.set_all_mesh_points_to_value(0.0);
    g.set_z(0, 0, 0.0);
    g.set_z(1, 0, 0.1);
    g.set_z(0, 1, 0.2);
    g.set_z(1, 1, 0.3);

    assert!((g.get_z_correction(25.0, 25.0) - 0.15).abs() < 1e-6);
    assert!((g.get_z_correction(50.0, 0.0) - 0.1).abs() < 1e-6);
}

/// Opposite corners raised on a 3x3 mesh: the center node keeps its own
/// value, the quarter points between a raised corner and the center fall
/// strictly between the two.
#[test]
fn test_opposite_corners_raised() {
    let mut g = MeshGrid::<3, 3>::new(&MeshConfig::new(0.0, 100.0, 0.0, 100.0)).unwrap();
    g.set_all_mesh_points_to_value(0.0);
    g.set_z(0, 0, 1.0);
    g.set_z(2, 2, 1.0);

    assert_eq!(g.get_z_correction(50.0, 50.0), 0.0);
    for (x, y) in [(25.0, 25.0), (75.0, 75.0)] {
        let z = g.get_z_correction(x, y);
        assert!(z > 0.0 && z < 1.0, "({}, {}) gave {}", x, y, z);
        assert!((z - 0.25).abs() < 1e-6);
    }
}

/// Points off the mesh take the configured raise.
#[test]
fn test_off_mesh_raise() {
    let config = MeshConfig::new(10.0, 190.0, 10.0, 190.0).with_off_mesh(OffMeshPolicy::Raise(2.0));
    let mut g = MeshGrid::<3, 3>::new(&config).unwrap();
    g.set_all_mesh_points_to_value(0.1);

    assert_eq!(g.get_z_correction(5.0, 100.0), 2.0);
    assert!((g.get_z_correction(100.0, 100.0) - 0.1).abs() < 1e-6);
}

/// An undefined corner makes the cell's correction zero.
#[test]
fn test_undefined_cell_is_zero() {
    let mut g = MeshGrid::<3, 3>::new(&MeshConfig::new(0.0, 100.0, 0.0, 100.0)).unwrap();
    g.set_all_mesh_points_to_value(0.5);
    g.invalidate_point(1, 1);

    assert_eq!(g.get_z_correction(25.0, 25.0), 0.0);
    assert_eq!(g.get_z_correction(75.0, 75.0), 0.0);
}
