//! Per-commit metrics memoization.

pub mod metrics_cache;

pub use metrics_cache::*;
