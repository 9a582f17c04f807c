//! Cross-commit aggregation.
//!
//! Folds the per-commit metric maps of a job into overall per-skill metrics.
//! Both folds are commutative: commit order never changes the result.

pub mod experience;
pub mod quality;

pub use experience::*;
pub use quality::*;
