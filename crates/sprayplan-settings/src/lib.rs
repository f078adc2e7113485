//! SprayPlan Settings Crate
//!
//! Handles the planner configuration file and the optimization result files
//! written after each stride sweep.

pub mod config;
pub mod persistence;

pub use config::{SampleConfig, SampleShape, SprayConfig, StrideSweep};
pub use persistence::{MaskRecord, OptimizationRecord, ResultStore, RESULT_FILE_PREFIX};
