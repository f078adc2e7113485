//! Property tests for the serpentine planner and the scheduler.

use proptest::prelude::*;
use sprayplan_camtools::{DepositionScheduler, SerpentineParameters, SerpentinePlanner};
use sprayplan_core::{AnalyticSpray, Grid, Point, Shape, SprayModel};

fn arb_mask() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (0.0..90.0f64, 0.0..90.0f64, 2.0..40.0f64, 2.0..40.0f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn waypoint_count_and_bounds(
        (x, y, w, h) in arb_mask(),
        margin in 0.0..30.0f64,
        stride in 0.5..10.0f64,
        samples in 1usize..12,
        passes in 1usize..4,
    ) {
        let mut grid = Grid::new(100.0, 1.0).unwrap();
        grid.add_mask("m", Shape::rectangle(Point::new(x, y), w, h)).unwrap();
        let planner = SerpentinePlanner::new(SerpentineParameters {
            margin,
            stride,
            sample_count: samples,
            passes,
            speed: 2.0,
            alternate_offset: false,
        });
        let path = planner.generate(&grid, &grid.masks()[0]).unwrap();

        let extent = path.extent();
        let expected_lines = (extent.height() / stride + 1e-9).floor() as usize + 1;
        prop_assert_eq!(path.line_count(), expected_lines);
        prop_assert_eq!(path.len(), samples * path.line_count() * passes);
        for wp in path.waypoints() {
            prop_assert!(wp.position.x >= 0.0 && wp.position.x <= 100.0);
            prop_assert!(wp.position.y >= 0.0 && wp.position.y <= 100.0);
            prop_assert!(wp.pass < passes);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn more_passes_never_remove_deposition(stride in 1.0..6.0f64, passes in 1usize..3) {
        let mut grid = Grid::new(60.0, 1.0).unwrap();
        grid.add_mask("m", Shape::rectangle(Point::new(20.0, 20.0), 15.0, 15.0)).unwrap();
        let spray = SprayModel::from(AnalyticSpray::constant(3.0));
        let scheduler = DepositionScheduler::new(&grid, &spray, 30.0);
        let params = SerpentineParameters {
            margin: 4.0,
            stride,
            sample_count: 8,
            passes,
            speed: 2.0,
            alternate_offset: false,
        };

        let fewer = SerpentinePlanner::new(params.clone()).generate(&grid, &grid.masks()[0]).unwrap();
        let more = SerpentinePlanner::new(SerpentineParameters { passes: passes + 1, ..params })
            .generate(&grid, &grid.masks()[0])
            .unwrap();
        let a = scheduler.simulate(&fewer, None).unwrap();
        let b = scheduler.simulate(&more, None).unwrap();
        for (lo, hi) in a.values().iter().zip(b.values()) {
            prop_assert!(hi >= lo);
            prop_assert!(*lo >= 0.0);
        }
    }
}
