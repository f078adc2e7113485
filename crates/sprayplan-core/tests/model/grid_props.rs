//! Property tests for the grid dimension law and rectangle rasterization.

use proptest::prelude::*;
use std::collections::BTreeSet;

use sprayplan_core::{Grid, Mask, Point, Shape};

proptest! {
    #[test]
    fn grid_dimensions_follow_rounding(bed in 1.0..500.0f64, step in 0.05..5.0f64) {
        let expected = (bed / step).round();
        prop_assume!(expected >= 1.0);
        let grid = Grid::new(bed, step).unwrap();
        prop_assert_eq!(grid.cells_per_axis(), expected as usize);
        prop_assert!((grid.cell_size() * expected - bed).abs() < 1e-9 * bed.max(1.0));
    }

    #[test]
    fn every_bed_point_maps_to_a_cell(bed in 10.0..300.0f64, fx in 0.0..=1.0f64, fy in 0.0..=1.0f64) {
        let grid = Grid::new(bed, 1.0).unwrap();
        let p = Point::new(fx * bed, fy * bed);
        let (ix, iy) = grid.cell_at(p).unwrap();
        prop_assert!(ix < grid.cells_per_axis());
        prop_assert!(iy < grid.cells_per_axis());
        let c = grid.cell_center(ix, iy);
        prop_assert!((c.x - p.x).abs() <= grid.cell_size() / 2.0 + 1e-9);
        prop_assert!((c.y - p.y).abs() <= grid.cell_size() / 2.0 + 1e-9);
    }

    #[test]
    fn in_bed_rectangle_selects_its_cells(
        bed in 20.0..300.0f64,
        step in 0.1..2.0f64,
        fw in 0.0..=1.0f64,
        fh in 0.0..=1.0f64,
        fx in 0.0..=1.0f64,
        fy in 0.0..=1.0f64,
    ) {
        let grid = Grid::new(bed, step).unwrap();
        let s = grid.cell_size();
        // at least one cell wide, at most half the bed
        let w = s + fw * (bed / 2.0 - s);
        let h = s + fh * (bed / 2.0 - s);
        let origin = Point::new(fx * (bed - w), fy * (bed - h));
        let mask = Mask::rasterize(&grid, "rect", Shape::rectangle(origin, w, h)).unwrap();
        prop_assert!(mask.cell_count() > 0);

        let n = grid.cells_per_axis();
        let columns: BTreeSet<usize> = mask.selected_indices().map(|i| i % n).collect();
        let rows: BTreeSet<usize> = mask.selected_indices().map(|i| i / n).collect();
        prop_assert_eq!(mask.cell_count(), columns.len() * rows.len());
        prop_assert!((columns.len() as f64 - w / s).abs() <= 1.0 + 1e-6);
        prop_assert!((rows.len() as f64 - h / s).abs() <= 1.0 + 1e-6);
    }
}

#[test]
fn test_non_positive_inputs_are_configuration_errors() {
    for (bed, step) in [(0.0, 1.0), (-10.0, 1.0), (10.0, 0.0), (10.0, -0.5)] {
        let err = Grid::new(bed, step).unwrap_err();
        assert!(err.is_configuration(), "{bed} / {step}: {err}");
    }
}
