//! Pipeline orchestration module.
//!
//! Per-commit routing that coordinates:
//! - Metrics cache lookups and write-back
//! - Working tree checkout and diff
//! - Skill classification
//! - Experience and quality extraction

pub mod analysis;
pub mod context;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::*;
pub use context::*;
