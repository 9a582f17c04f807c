//! skillmetrics-core - Skill attribution from commit history
//!
//! This crate attributes a developer's code contributions to skills
//! (languages and frameworks) and rolls them up into per-skill experience
//! and quality metrics. The implementation prioritizes:
//!
//! 1. **Determinism** - Classification is table-driven and pure
//! 2. **Logging** - Every job, repository and commit decision logged with context
//! 3. **Reuse** - Commit metrics are memoized by hash across jobs
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `classification` - Language and framework detection per file
//! - `metrics` - Per-commit experience and quality extraction
//! - `scan` - External static-analysis scan coordination
//! - `cache` - Commit metrics memoization
//! - `aggregation` - Cross-commit folds into overall per-skill metrics
//! - `jobs` - Asynchronous job registry and background worker
//! - `pipeline` - Per-commit routing through cache, classifier and extractor
//! - `collaborators` - Contracts for host-supplied discovery and profiles
//! - `git` - `git` CLI backed working trees
//! - `logging` - Structured logging with job context

pub mod aggregation;
pub mod cache;
pub mod classification;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod git;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod scan;

pub use aggregation::{fold_experience, fold_quality};
pub use cache::{MetricsCache, MetricsStore};
pub use classification::{classify_commit, classify_file, classify_frameworks, classify_language, extract_imports};
pub use collaborators::{
    CommitDescriptor, CommitSource, NoProfiles, RepositoryDescriptor, UserProfileResolver,
    WorkingTreeProvider,
};
pub use config::{AnalyzerConfig, ScannerConfig};
pub use error::{AnalysisError, CacheError, JobError, ScanError, StoreError};
pub use git::GitWorkingTree;
pub use jobs::{AnalysisJob, JobReceipt, JobRegistry, JobState, JobStatus, StatusSnapshot};
pub use metrics::{aggregate_file_measures, compute_experience, compute_quality, identify_excluded_files};
pub use models::*;
pub use pipeline::AnalysisEnvironment;
pub use scan::{ScanBackend, ScanCoordinator, ScanOutcome, SonarBackend};

/// Initialize the logger (call once at startup).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}
