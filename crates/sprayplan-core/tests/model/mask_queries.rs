use sprayplan_core::{Grid, Mask, Point, Shape};

#[test]
fn test_sample_mask_on_default_bed() {
    let mut grid = Grid::new(200.0, 0.4).unwrap();
    let idx = grid
        .add_mask("sample-0", Shape::rectangle(Point::new(40.0, 40.0), 25.0, 25.0))
        .unwrap();
    let mask = grid.mask(idx).unwrap();

    // centres from 40.2 to 65.0 along each axis, edges inclusive
    assert_eq!(mask.cell_count(), 63 * 63);
    assert!(grid.point_in_mask(idx, 52.5, 52.5).unwrap());
    assert!(!grid.point_in_mask(idx, 70.0, 52.5).unwrap());
    assert!(!grid.point_in_mask(idx, 250.0, 52.5).unwrap());
}

#[test]
fn test_overlapping_masks_are_independent() {
    let mut grid = Grid::new(100.0, 1.0).unwrap();
    let a = grid
        .add_mask("a", Shape::rectangle(Point::new(10.0, 10.0), 20.0, 20.0))
        .unwrap();
    let b = grid
        .add_mask("b", Shape::circle(Point::new(30.0, 30.0), 8.0))
        .unwrap();
    assert_ne!(a, b);
    assert!(grid.point_in_mask(a, 28.5, 28.5).unwrap());
    assert!(grid.point_in_mask(b, 28.5, 28.5).unwrap());
    assert!(!grid.point_in_mask(a, 35.5, 35.5).unwrap());
    assert!(grid.point_in_mask(b, 35.5, 35.5).unwrap());
}

#[test]
fn test_unregistered_mask_can_be_empty() {
    let grid = Grid::new(100.0, 1.0).unwrap();
    let mask = Mask::rasterize(
        &grid,
        "tiny",
        Shape::circle(Point::new(10.0, 10.0), 0.3),
    )
    .unwrap();
    assert!(mask.is_empty());
    assert!(mask.matches(&grid));
}
