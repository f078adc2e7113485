use sprayplan::{
    parse_motion_program, CancellationToken, Error, MotionProgramGenerator, OptimizeOptions,
    ResultStore, Session, SprayConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const CONFIG: &str = r#"{
    "bed_size": 120.0,
    "grid_step": 1.0,
    "strides": [2.0, 6.0, 3],
    "samples": [
        { "name": "square", "type": "rectangle", "position": [20.0, 20.0], "size": [20.0, 20.0],
          "margin": 5.0, "x_amount": 8 },
        { "type": "circle", "position": [70.0, 70.0], "size": [20.0, 20.0],
          "margin": 5.0, "x_amount": 8, "passes": 1 }
    ]
}"#;

fn load_session(dir: &std::path::Path) -> Session {
    let path = dir.join("config.json");
    std::fs::write(&path, CONFIG).unwrap();
    Session::from_config(SprayConfig::load_from_file(&path).unwrap()).unwrap()
}

#[test]
fn test_optimize_store_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().join("logs"));
    let mut session = load_session(dir.path());
    assert_eq!(session.sample_names(), ["square".to_string(), "sample-1".to_string()]);

    let options = OptimizeOptions {
        store: Some(store.clone()),
        ..Default::default()
    };
    let results = session.optimize_all(&options).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(store.list().unwrap().len(), 2);

    let mut fresh = load_session(dir.path());
    assert_eq!(fresh.load_strides(&store).unwrap(), 2);
    assert_eq!(fresh.strides(), session.strides());
    for (stride, result) in fresh.strides().iter().zip(&results) {
        assert_eq!(*stride, Some(result.best_stride));
    }
}

#[test]
fn test_motion_program_covers_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = load_session(dir.path());
    session.apply_strides(&[2.0, 4.0]).unwrap();

    let program = session.motion_program().unwrap();
    let lines: Vec<&str> = program.lines().collect();
    assert_eq!(lines.first().copied(), Some("; SprayPlan deposition program"));
    assert!(lines.last().is_some_and(|l| l.starts_with("M30")));

    let paths = session.paths().unwrap();
    let waypoints: usize = paths.iter().map(|p| p.len()).sum();
    let generator = MotionProgramGenerator::new(session.motion_parameters());
    assert_eq!(
        lines.len(),
        generator.header_line_count() + 2 * paths.len() + waypoints + generator.footer_line_count()
    );
    let approaches = lines.iter().filter(|l| l.starts_with("G0") && l.ends_with("; Approach"));
    assert_eq!(approaches.count(), paths.len());

    let motions = parse_motion_program(&program).unwrap();
    assert_eq!(motions.len(), waypoints);
    let first = paths[0].waypoints()[0].position;
    assert!((motions[0].x - first.x).abs() < 1e-3);
    assert!((motions[0].y - first.y).abs() < 1e-3);
    assert!((motions[0].feed - 120.0).abs() < 1e-9);
}

#[test]
fn test_simulate_stride_matches_applied_strides() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = load_session(dir.path());
    let preview = session.simulate_stride(3.0).unwrap();
    session.apply_strides(&[3.0, 3.0]).unwrap();
    assert_eq!(session.simulate().unwrap(), preview);

    for mask in session.grid().masks() {
        let stats = preview.region_stats(mask).unwrap();
        assert!(stats.mean > 0.0);
    }
}

#[test]
fn test_progress_spans_all_samples() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = load_session(dir.path());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let options = OptimizeOptions {
        progress: Some(Arc::new(move |_: usize, _: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        parallel: true,
        ..Default::default()
    };
    session.optimize_all(&options).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_cancelled_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = load_session(dir.path());
    let token = CancellationToken::new();
    token.cancel();
    let options = OptimizeOptions {
        cancel: Some(token),
        ..Default::default()
    };
    let err = session.optimize_sample(0, &options).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(session.strides(), [None, None]);
}
