//! Type aliases for the callback shapes used by the planner.
//!
//! The scheduler and the stride optimizer accept caller-supplied hooks.
//! They run on worker threads, so every alias is `Send + Sync`.

use std::sync::Arc;

/// Progress notification: `(completed_index, total)`.
///
/// `completed_index` is zero-based; the final call for a run of `total`
/// items is `(total - 1, total)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// A progress callback that can be shared between several runs.
pub type SharedProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;
