//! # SprayPlan
//!
//! Spray deposition coverage planner.
//!
//! SprayPlan models how a nozzle moving over a square bed deposits
//! material, plans serpentine sweeps over sample regions, searches for the
//! line spacing that gives the most uniform coverage and writes the chosen
//! sweeps out as G-code.
//!
//! ## Architecture
//!
//! SprayPlan is organized as a workspace:
//!
//! 1. **sprayplan-core** - Grid, masks, spray model, deposition accumulator and errors
//! 2. **sprayplan-camtools** - Serpentine planner, scheduler, stride optimizer, G-code
//! 3. **sprayplan-settings** - Configuration files and optimization result files
//!
//! The root crate adds [`session::Session`], which owns one configuration's
//! grid, masks, spray model and current strides, and the `sprayplan` binary.

pub mod session;

pub use sprayplan_core::{
    AnalyticSpray, CalibratedSpray, CalibrationTable, CancellationToken, Deposition, Error,
    ExtrapolationPolicy, GaussianKernel, Grid, Mask, Point, Rect, RegionStats, Result, Shape,
    SprayKind, SprayModel, SprayProfile,
};

pub use sprayplan_camtools::{
    parse_motion_program, DepositionScheduler, MotionProgramGenerator, MotionProgramParameters,
    OptimizationResult, Scoring, SerpentineParameters, SerpentinePath, SerpentinePlanner,
    StrideEvaluation, StrideOptimizer, Waypoint,
};

pub use sprayplan_settings::{
    OptimizationRecord, ResultStore, SampleConfig, SampleShape, SprayConfig, StrideSweep,
};

pub use session::{OptimizeOptions, Session};

/// Version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date string
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Installs a `tracing` subscriber writing to stderr. The level comes from
/// `RUST_LOG` and defaults to `info`. Calling it twice is an error.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
