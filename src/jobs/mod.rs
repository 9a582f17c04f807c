//! Asynchronous analysis jobs.
//!
//! Submission returns a job id at once; a worker thread runs the analysis
//! while clients poll status, wait, or cancel through the registry.

pub mod cancel;
pub mod registry;
pub mod runner;

pub use cancel::CancellationToken;
pub use registry::{AnalysisJob, JobId, JobReceipt, JobRegistry, JobState, JobStatus, StatusSnapshot};
