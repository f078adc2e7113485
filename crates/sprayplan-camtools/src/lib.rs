//! # SprayPlan CAM Tools
//!
//! Path planning and simulation for spray deposition.
//!
//! ## Tools Included
//!
//! - **Serpentine Planner**: Sweep lines over a mask with margin, stride, samples and passes
//! - **Deposition Scheduler**: Replays waypoints through the spray model onto the grid
//! - **Stride Optimizer**: Picks the stride with the most uniform deposition inside a mask
//! - **Motion Program Generator**: G-code for a finished path, plus a parser for round trips

pub mod gcode;
pub mod optimizer;
pub mod scheduler;
pub mod serpentine;

// Re-export commonly used items
pub use gcode::{
    parse_motion_line, parse_motion_program, MotionLine, MotionProgramGenerator,
    MotionProgramParameters,
};
pub use optimizer::{
    CandidateFailure, OptimizationResult, PersistHook, RenderHook, Scoring, StrideEvaluation,
    StrideOptimizer,
};
pub use scheduler::DepositionScheduler;
pub use serpentine::{SerpentineParameters, SerpentinePath, SerpentinePlanner, Waypoint};
