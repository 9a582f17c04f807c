//! Scan coordination.
//!
//! One scan per commit moves through
//! `Submitted -> Polling -> {Success, Failed, TimedOut}`. Failure and timeout
//! both mean "no quality metrics for this commit"; neither is fatal to the job.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{ScannerConfig, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
use crate::error::ScanError;
use crate::logging::structured::LogContext;
use crate::models::FileQualityMeasures;

/// Identifier of a server-side analysis task.
pub type TaskId = String;

/// Status of a submitted analysis task as reported by the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Canceled,
    Other(String),
}

impl TaskStatus {
    pub fn from_api(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "PENDING" => TaskStatus::Pending,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "SUCCESS" => TaskStatus::Success,
            "FAILED" => TaskStatus::Failed,
            "CANCELED" | "CANCELLED" => TaskStatus::Canceled,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

/// The tool the coordinator drives.
pub trait ScanBackend: Send + Sync {
    /// Start an analysis of `checkout_path` under `project_key`.
    fn submit(&self, project_key: &str, checkout_path: &Path) -> Result<TaskId, ScanError>;

    fn task_status(&self, task_id: &str) -> Result<TaskStatus, ScanError>;

    /// Leaf-level measures for every analyzed file, paths relative to the checkout.
    fn file_measures(
        &self,
        project_key: &str,
        checkout_path: &Path,
    ) -> Result<Vec<FileQualityMeasures>, ScanError>;
}

/// Scan state machine position, logged on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Submitted,
    Polling { attempt: u32 },
    Success,
    Failed,
    TimedOut,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Submitted => write!(f, "submitted"),
            ScanState::Polling { attempt } => write!(f, "polling attempt={}", attempt),
            ScanState::Success => write!(f, "success"),
            ScanState::Failed => write!(f, "failed"),
            ScanState::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Terminal result of one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Success(Vec<FileQualityMeasures>),
    Failed(String),
    TimedOut { attempts: u32 },
}

impl ScanOutcome {
    pub fn into_measures(self) -> Option<Vec<FileQualityMeasures>> {
        match self {
            ScanOutcome::Success(measures) => Some(measures),
            _ => None,
        }
    }
}

/// Project key the tool files a commit's analysis under.
pub fn project_key(commit_hash: &str) -> String {
    format!("commit_{}", commit_hash)
}

/// Drives a `ScanBackend` through the scan state machine with bounded polling.
#[derive(Clone)]
pub struct ScanCoordinator {
    backend: Arc<dyn ScanBackend>,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("poll_attempts", &self.poll_attempts)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl ScanCoordinator {
    pub fn new(backend: Arc<dyn ScanBackend>) -> Self {
        Self {
            backend,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn from_config(backend: Arc<dyn ScanBackend>, config: &ScannerConfig) -> Self {
        Self::new(backend).with_polling(config.poll_attempts, config.poll_interval())
    }

    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    /// Scan one checked-out commit and collect per-file measures.
    ///
    /// Measures for paths in `excluded` are dropped.
    pub fn scan(
        &self,
        commit_hash: &str,
        checkout_path: &Path,
        excluded: &BTreeSet<String>,
        ctx: &LogContext,
    ) -> ScanOutcome {
        let key = project_key(commit_hash);

        let task_id = match self.backend.submit(&key, checkout_path) {
            Ok(task_id) => task_id,
            Err(e) => return self.fail(ctx, format!("submit: {}", e)),
        };
        log::info!(
            "{} SCAN_STATE state={} project_key={} task_id={}",
            ctx,
            ScanState::Submitted,
            key,
            task_id
        );

        for attempt in 1..=self.poll_attempts {
            log::debug!("{} SCAN_STATE state={}", ctx, ScanState::Polling { attempt });

            match self.backend.task_status(&task_id) {
                Ok(TaskStatus::Success) => return self.collect(&key, checkout_path, excluded, ctx),
                Ok(TaskStatus::Failed) => return self.fail(ctx, "task failed".to_string()),
                Ok(TaskStatus::Canceled) => return self.fail(ctx, "task canceled".to_string()),
                Ok(status) => {
                    log::debug!("{} SCAN_PENDING attempt={} status={:?}", ctx, attempt, status);
                }
                Err(e) => {
                    log::warn!("{} SCAN_STATUS_ERROR attempt={} error={}", ctx, attempt, e);
                }
            }

            if attempt < self.poll_attempts {
                thread::sleep(self.poll_interval);
            }
        }

        log::warn!(
            "{} SCAN_STATE state={} attempts={}",
            ctx,
            ScanState::TimedOut,
            self.poll_attempts
        );
        ScanOutcome::TimedOut {
            attempts: self.poll_attempts,
        }
    }

    fn collect(
        &self,
        key: &str,
        checkout_path: &Path,
        excluded: &BTreeSet<String>,
        ctx: &LogContext,
    ) -> ScanOutcome {
        match self.backend.file_measures(key, checkout_path) {
            Ok(measures) => {
                let measures: Vec<FileQualityMeasures> = measures
                    .into_iter()
                    .filter(|m| !excluded.contains(&m.path))
                    .collect();
                log::info!(
                    "{} SCAN_STATE state={} files={}",
                    ctx,
                    ScanState::Success,
                    measures.len()
                );
                ScanOutcome::Success(measures)
            }
            Err(e) => self.fail(ctx, format!("measures: {}", e)),
        }
    }

    fn fail(&self, ctx: &LogContext, reason: String) -> ScanOutcome {
        log::warn!("{} SCAN_STATE state={} reason={}", ctx, ScanState::Failed, reason);
        ScanOutcome::Failed(reason)
    }
}
