//! External static-analysis orchestration.
//!
//! - `coordinator` - per-commit scan state machine and the backend trait
//! - `sonar` - SonarQube-compatible backend (scanner subprocess + measures API)

pub mod coordinator;
pub mod sonar;

pub use coordinator::*;
pub use sonar::*;
