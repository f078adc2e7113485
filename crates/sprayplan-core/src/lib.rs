//! # SprayPlan Core
//!
//! Core types for SprayPlan.
//! Provides the bed grid and masks, the spray deposition model, the
//! deposition accumulator with its uniformity statistics, and the error type
//! shared by every SprayPlan crate.

pub mod deposition;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod mask;
pub mod spray;
pub mod types;

pub use deposition::{Deposition, RegionStats};
pub use error::{Error, Result};
pub use geometry::{Point, Rect};
pub use grid::{Grid, BED_TOLERANCE, MAX_CELLS_PER_AXIS};
pub use mask::{Mask, Shape};
pub use spray::{
    AnalyticSpray, CalibratedSpray, CalibrationTable, ExtrapolationPolicy, GaussianKernel,
    LinearFit, SprayKind, SprayModel, SprayProfile, FOOTPRINT_SIGMAS, SPRAY_AMPLITUDE,
};

// Re-export type aliases for convenience
pub use types::{CancellationToken, ProgressCallback, SharedProgressCallback};
