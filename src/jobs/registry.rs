//! Job registry.
//!
//! Holds every analysis job submitted to this process. Each job lives in its
//! own slot guarded by a mutex; readers always get clones, so a poller never
//! observes a half-written record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobError;
use crate::logging::structured::LogContext;
use crate::models::{OverallExperienceMetrics, OverallQualityMetrics};
use crate::pipeline::{AnalysisEnvironment, JobContext};

use super::cancel::CancellationToken;
use super::runner;

pub type JobId = String;

/// Lifecycle of a job: `Created -> Running -> {Completed, Failed, Cancelled}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// Progress record polled by clients.
///
/// `completed` is true in every terminal state; `state` and `error` tell
/// them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub total_commits: u64,
    pub analyzed_commits: u64,
    pub completed: bool,
    pub state: JobState,
    pub error: Option<String>,
}

/// Point-in-time copy of a job's status.
pub type StatusSnapshot = JobStatus;

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            total_commits: 0,
            analyzed_commits: 0,
            completed: false,
            state: JobState::Created,
            error: None,
        }
    }
}

/// One analysis request and, once completed, its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: JobId,
    pub username: String,
    pub display_name: String,
    pub skip_quality_metrics: bool,
    pub status: JobStatus,
    pub experience_metrics: Option<OverallExperienceMetrics>,
    pub quality_metrics: Option<OverallQualityMetrics>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    fn new(id: &str, username: &str, display_name: &str, skip_quality_metrics: bool) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            skip_quality_metrics,
            status: JobStatus::default(),
            experience_metrics: None,
            quality_metrics: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Returned to the submitter immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReceipt {
    pub job_id: JobId,
    pub display_name: String,
}

/// How a run ended.
#[derive(Debug)]
pub(crate) enum Termination {
    Completed {
        experience: OverallExperienceMetrics,
        quality: Option<OverallQualityMetrics>,
    },
    Failed(String),
    Cancelled,
}

/// A job record with its completion signal and cancellation flag.
#[derive(Debug)]
pub(crate) struct JobSlot {
    job: Mutex<AnalysisJob>,
    done: Condvar,
    pub(crate) cancel: CancellationToken,
}

impl JobSlot {
    fn new(job: AnalysisJob) -> Self {
        Self {
            job: Mutex::new(job),
            done: Condvar::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn mark_running(&self) {
        self.job.lock().status.state = JobState::Running;
    }

    pub(crate) fn set_total_commits(&self, total: u64) {
        self.job.lock().status.total_commits = total;
    }

    pub(crate) fn commit_attempted(&self) {
        self.job.lock().status.analyzed_commits += 1;
    }

    /// Move to a terminal state and wake every waiter. Later calls are ignored.
    pub(crate) fn finish(&self, termination: Termination) {
        let mut job = self.job.lock();
        if job.status.state.is_terminal() {
            return;
        }

        match termination {
            Termination::Completed { experience, quality } => {
                job.status.state = JobState::Completed;
                job.experience_metrics = Some(experience);
                job.quality_metrics = quality;
            }
            Termination::Failed(cause) => {
                job.status.state = JobState::Failed;
                job.status.error = Some(cause);
            }
            Termination::Cancelled => {
                job.status.state = JobState::Cancelled;
            }
        }
        job.status.completed = true;
        job.finished_at = Some(Utc::now());

        drop(job);
        self.done.notify_all();
    }

    fn snapshot(&self) -> AnalysisJob {
        self.job.lock().clone()
    }

    fn status(&self) -> JobStatus {
        self.job.lock().status.clone()
    }

    fn wait(&self, timeout: Duration) -> JobStatus {
        let deadline = Instant::now() + timeout;
        let mut job = self.job.lock();
        while !job.status.completed {
            if self.done.wait_until(&mut job, deadline).timed_out() {
                break;
            }
        }
        job.status.clone()
    }
}

#[cfg(test)]
impl JobSlot {
    pub(crate) fn for_test(job_id: &str) -> Self {
        Self::new(AnalysisJob::new(job_id, "octo", "octo", true))
    }

    pub(crate) fn snapshot_for_test(&self) -> AnalysisJob {
        self.snapshot()
    }
}

/// In-process registry of analysis jobs.
#[derive(Debug)]
pub struct JobRegistry {
    env: AnalysisEnvironment,
    jobs: RwLock<HashMap<JobId, Arc<JobSlot>>>,
}

impl JobRegistry {
    pub fn new(env: AnalysisEnvironment) -> Self {
        Self {
            env,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a job and start its worker thread. Returns without waiting.
    pub fn submit(&self, username: &str, skip_quality_metrics: bool) -> Result<JobReceipt, JobError> {
        let job_id = format!("job-{}", Uuid::new_v4());
        let ctx = LogContext::new(&job_id);
        let display_name = self.resolve_display_name(username, &ctx);

        let slot = Arc::new(JobSlot::new(AnalysisJob::new(
            &job_id,
            username,
            &display_name,
            skip_quality_metrics,
        )));
        self.jobs.write().insert(job_id.clone(), slot.clone());

        let job = JobContext::new(&job_id, username, skip_quality_metrics);
        if let Err(e) = runner::spawn_worker(self.env.clone(), slot.clone(), job) {
            log::error!("{} JOB_SPAWN_FAILED error={}", ctx, e);
            slot.finish(Termination::Failed(format!("spawn: {}", e)));
            return Err(JobError::Spawn(e));
        }

        log::info!(
            "{} JOB_SUBMITTED username={} skip_quality={}",
            ctx,
            username,
            skip_quality_metrics
        );

        Ok(JobReceipt {
            job_id,
            display_name,
        })
    }

    fn resolve_display_name(&self, username: &str, ctx: &LogContext) -> String {
        match self.env.profiles.display_name(username) {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => username.to_string(),
            Err(e) => {
                log::warn!("{} PROFILE_LOOKUP_FAILED username={} error={:#}", ctx, username, e);
                username.to_string()
            }
        }
    }

    fn slot(&self, job_id: &str) -> Option<Arc<JobSlot>> {
        self.jobs.read().get(job_id).cloned()
    }

    pub fn status(&self, job_id: &str) -> Option<StatusSnapshot> {
        self.slot(job_id).map(|slot| slot.status())
    }

    /// Full copy of the job. Metrics are present only once it has completed.
    pub fn result(&self, job_id: &str) -> Option<AnalysisJob> {
        self.slot(job_id).map(|slot| slot.snapshot())
    }

    /// Request cancellation. Returns false for unknown or already finished jobs.
    pub fn cancel(&self, job_id: &str) -> bool {
        let Some(slot) = self.slot(job_id) else {
            return false;
        };
        if slot.status().completed {
            return false;
        }
        slot.cancel.cancel();
        log::info!("{} JOB_CANCEL_REQUESTED", LogContext::new(job_id));
        true
    }

    /// Block until the job reaches a terminal state or `timeout` elapses.
    pub fn wait(&self, job_id: &str, timeout: Duration) -> Option<StatusSnapshot> {
        let slot = self.slot(job_id)?;
        Some(slot.wait(timeout))
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
