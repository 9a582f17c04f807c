//! Error types.
//!
//! Core components return these typed errors. Host-supplied collaborators
//! return `anyhow::Error`, which is wrapped at the pipeline boundary.

use thiserror::Error;

/// Errors raised while talking to the external static-analysis tool.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scanner executable not found: {0}")]
    ScannerNotFound(String),

    #[error("failed to launch scanner: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("scanner exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("scanner output did not contain a task id")]
    MissingTaskId,

    #[error("measures API request failed: {0}")]
    Http(String),

    #[error("could not decode measures API response: {0}")]
    Decode(String),
}

/// Errors raised by a persistent metrics store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metrics store unavailable: {0}")]
    Unavailable(String),

    #[error("metrics store rejected record for {commit_hash}: {reason}")]
    Rejected { commit_hash: String, reason: String },
}

/// Errors raised by the metrics cache.
///
/// A cache miss is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised when parsing commit timestamps.
#[derive(Debug, Error)]
#[error("unrecognised commit timestamp: {0}")]
pub struct TimestampError(pub String);

/// Errors that end an analysis run in the `Failed` state.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("repository discovery failed: {0}")]
    Discovery(#[source] anyhow::Error),

    #[error("metrics cache failure: {0}")]
    Cache(#[from] CacheError),

    #[error("analysis worker panicked: {0}")]
    Panicked(String),
}

/// Errors raised by the job registry.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to spawn analysis worker: {0}")]
    Spawn(#[from] std::io::Error),
}
