//! Data model.
//!
//! Commit records as produced by the working-tree provider, and the
//! commit-level and overall metric records built from them.

pub mod commit;
pub mod metrics;

pub use commit::*;
pub use metrics::*;
