//! Pipeline context management.
//!
//! `AnalysisEnvironment` bundles the shared collaborators every job uses;
//! `JobContext` carries one run's settings and the per-commit metric maps
//! it accumulates.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::MetricsCache;
use crate::collaborators::{CommitSource, UserProfileResolver, WorkingTreeProvider};
use crate::config::AnalyzerConfig;
use crate::git::GitWorkingTree;
use crate::logging::structured::LogContext;
use crate::models::{CommitExperienceMetrics, CommitQualityMetrics};
use crate::scan::coordinator::ScanCoordinator;
use crate::scan::sonar::SonarBackend;

/// Collaborators and shared state injected into every analysis job.
#[derive(Clone)]
pub struct AnalysisEnvironment {
    pub commits: Arc<dyn CommitSource>,
    pub working_trees: Arc<dyn WorkingTreeProvider>,
    pub profiles: Arc<dyn UserProfileResolver>,
    pub cache: Arc<MetricsCache>,
    pub scanner: ScanCoordinator,
}

impl std::fmt::Debug for AnalysisEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEnvironment")
            .field("cache", &self.cache)
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

impl AnalysisEnvironment {
    /// Environment backed by the `git` CLI and a SonarQube-compatible server.
    pub fn from_config(
        config: &AnalyzerConfig,
        commits: Arc<dyn CommitSource>,
        profiles: Arc<dyn UserProfileResolver>,
        cache: Arc<MetricsCache>,
    ) -> Self {
        let backend = Arc::new(SonarBackend::new(config.scanner.clone()));
        Self {
            commits,
            working_trees: Arc::new(GitWorkingTree::new(config.work_dir.clone())),
            profiles,
            cache,
            scanner: ScanCoordinator::from_config(backend, &config.scanner),
        }
    }
}

/// State of one analysis run.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    pub username: String,
    pub skip_quality_metrics: bool,
    pub experience: BTreeMap<String, CommitExperienceMetrics>,
    pub quality: BTreeMap<String, CommitQualityMetrics>,
}

impl JobContext {
    pub fn new(job_id: &str, username: &str, skip_quality_metrics: bool) -> Self {
        Self {
            job_id: job_id.to_string(),
            username: username.to_string(),
            skip_quality_metrics,
            experience: BTreeMap::new(),
            quality: BTreeMap::new(),
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.job_id)
    }

    /// Record one commit's metrics under its hash.
    pub fn record(
        &mut self,
        commit_hash: &str,
        experience: CommitExperienceMetrics,
        quality: Option<CommitQualityMetrics>,
    ) {
        self.experience.insert(commit_hash.to_string(), experience);
        if self.skip_quality_metrics {
            return;
        }
        if let Some(quality) = quality {
            self.quality.insert(commit_hash.to_string(), quality);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_record_ignores_quality_when_skipped() {
        let mut job = JobContext::new("job-1", "octo", true);
        job.record(
            "abc",
            CommitExperienceMetrics::new("https://github.com/octo/app", Utc::now()),
            Some(CommitQualityMetrics::new(Utc::now())),
        );
        assert_eq!(job.experience.len(), 1);
        assert!(job.quality.is_empty());
    }

    #[test]
    fn test_from_config_wires_defaults() {
        let env = AnalysisEnvironment::from_config(
            &AnalyzerConfig::default(),
            Arc::new(crate::pipeline::testing::FakeCommitSource::new(Vec::new())),
            Arc::new(crate::collaborators::NoProfiles),
            Arc::new(MetricsCache::new()),
        );
        let shown = format!("{:?}", env);
        assert!(shown.contains("poll_attempts: 5"));
        assert!(env.cache.is_empty());
    }

    #[test]
    fn test_log_context_carries_job_id() {
        let job = JobContext::new("job-42", "octo", false);
        assert_eq!(job.log_context().to_string(), "[job=job-42]");
    }
}
