//! Property tests for stride selection.

use proptest::prelude::*;
use sprayplan_camtools::{SerpentineParameters, StrideOptimizer};
use sprayplan_core::{AnalyticSpray, Grid, Point, Shape, SprayModel};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn best_stride_is_a_minimal_candidate(candidates in prop::collection::vec(1.0..8.0f64, 1..5)) {
        let mut grid = Grid::new(60.0, 1.0).unwrap();
        grid.add_mask("m", Shape::rectangle(Point::new(20.0, 20.0), 15.0, 15.0)).unwrap();
        let spray = SprayModel::from(AnalyticSpray::constant(3.0));
        let template = SerpentineParameters {
            margin: 4.0,
            stride: 1.0,
            sample_count: 8,
            passes: 1,
            speed: 2.0,
            alternate_offset: false,
        };

        let result = StrideOptimizer::new(&grid, &spray, 30.0, template)
            .optimize(&grid.masks()[0], &candidates)
            .unwrap();

        prop_assert!(candidates.contains(&result.best_stride));
        prop_assert_eq!(result.evaluations.len(), candidates.len());
        for e in &result.evaluations {
            prop_assert!(result.best_deviation <= e.deviation);
            if e.deviation == result.best_deviation {
                prop_assert!(result.best_stride <= e.stride);
            }
        }
    }
}
