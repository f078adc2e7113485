//! The reference scenario: one 25 mm sample on a 200 mm bed.

use sprayplan_camtools::{
    parse_motion_program, MotionProgramGenerator, MotionProgramParameters, SerpentineParameters,
    SerpentinePlanner, StrideOptimizer,
};
use sprayplan_core::{CalibrationTable, Grid, Point, Shape, SprayKind, SprayModel};

const Z_HEIGHT: f64 = 70.0;

fn setup() -> (Grid, SprayModel) {
    let mut grid = Grid::new(200.0, 0.4).unwrap();
    grid.add_mask("sample-0", Shape::rectangle(Point::new(40.0, 40.0), 25.0, 25.0))
        .unwrap();
    let table = CalibrationTable::new(
        vec![30.0, 20.0, 10.0, 5.0, 70.0, 40.0],
        vec![4.0, 3.0, 2.0, 1.0, 8.0, 5.0],
    )
    .unwrap();
    (grid, SprayModel::build(SprayKind::Gaussian, &table).unwrap())
}

fn template() -> SerpentineParameters {
    SerpentineParameters {
        margin: 10.0,
        stride: 1.0,
        sample_count: 20,
        passes: 2,
        speed: 2.0,
        alternate_offset: false,
    }
}

#[test]
fn test_reference_scenario() {
    let (grid, spray) = setup();
    let mask = &grid.masks()[0];
    let candidates = [2.0, 4.0, 6.0];

    let result = StrideOptimizer::new(&grid, &spray, Z_HEIGHT, template())
        .optimize(mask, &candidates)
        .unwrap();
    assert!(candidates.contains(&result.best_stride));
    assert_eq!(result.evaluations.len(), 3);
    assert!(!result.is_partial());
    for e in &result.evaluations {
        assert!(result.best_deviation <= e.deviation);
        assert!(e.deviation.is_finite());
    }

    let lines: Vec<_> = result.evaluations.iter().map(|e| e.line_count).collect();
    assert_eq!(lines, vec![23, 12, 8]);

    let rerun = StrideOptimizer::new(&grid, &spray, Z_HEIGHT, template())
        .optimize(mask, &candidates)
        .unwrap();
    assert_eq!(result.series(), rerun.series());
    assert_eq!(result.best_stride, rerun.best_stride);

    let path = SerpentinePlanner::new(template().with_stride(result.best_stride))
        .generate(&grid, mask)
        .unwrap();
    let generator = MotionProgramGenerator::new(MotionProgramParameters {
        z_height: Z_HEIGHT,
        ..Default::default()
    });
    let program = generator.emit(&path).unwrap();
    let motions = parse_motion_program(&program).unwrap();
    assert_eq!(motions.len(), 20 * path.line_count() * 2);
    assert_eq!(
        program.lines().count(),
        motions.len() + generator.header_line_count() + generator.footer_line_count()
    );
}

#[test]
fn test_parallel_sweep_matches_reference() {
    let (grid, spray) = setup();
    let mask = &grid.masks()[0];
    let candidates = [6.0, 2.0, 4.0];
    let seq = StrideOptimizer::new(&grid, &spray, Z_HEIGHT, template())
        .optimize(mask, &candidates)
        .unwrap();
    let par = StrideOptimizer::new(&grid, &spray, Z_HEIGHT, template())
        .parallel(true)
        .optimize(mask, &candidates)
        .unwrap();
    assert_eq!(seq.series(), par.series());
    assert_eq!(
        seq.series().iter().map(|s| s.0).collect::<Vec<_>>(),
        vec![6.0, 2.0, 4.0]
    );
}
