//! Benchmarks for deposition simulation and the stride sweep.
//!
//! Run with: cargo bench -p sprayplan-camtools

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sprayplan_camtools::{DepositionScheduler, SerpentineParameters, SerpentinePlanner, StrideOptimizer};
use sprayplan_core::{CalibrationTable, Grid, Point, Shape, SprayKind, SprayModel};

fn setup(grid_step: f64) -> (Grid, SprayModel) {
    let mut grid = Grid::new(200.0, grid_step).unwrap();
    grid.add_mask("sample", Shape::rectangle(Point::new(40.0, 40.0), 25.0, 25.0))
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
        stride: 2.0,
        sample_count: 20,
        passes: 2,
        speed: 2.0,
        alternate_offset: false,
    }
}

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    for step in [0.8, 0.4, 0.2] {
        let (grid, spray) = setup(step);
        let path = SerpentinePlanner::new(template())
            .generate(&grid, &grid.masks()[0])
            .unwrap();
        group.bench_with_input(BenchmarkId::new("grid_step", step), &path, |b, path| {
            let scheduler = DepositionScheduler::new(&grid, &spray, 70.0);
            b.iter(|| scheduler.simulate(black_box(path), None).unwrap());
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let (grid, spray) = setup(0.4);
    let candidates = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut group = c.benchmark_group("stride_sweep");
    group.sample_size(10);
    for parallel in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("parallel", parallel),
            &parallel,
            |b, &parallel| {
                b.iter(|| {
                    StrideOptimizer::new(&grid, &spray, 70.0, template())
                        .parallel(parallel)
                        .optimize(&grid.masks()[0], black_box(&candidates))
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_simulate, bench_sweep);
criterion_main!(benches);
