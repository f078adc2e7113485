//! Shared types used across the SprayPlan crates.

pub mod aliases;
pub mod cancel;

pub use aliases::*;
pub use cancel::CancellationToken;
