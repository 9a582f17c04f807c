//! Background analysis worker.
//!
//! One thread per job: discovery, then every repository in order, every
//! commit in order, then the aggregation folds. The worker owns its
//! `JobContext`; only progress counters and the final outcome are published
//! to the job's slot.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::aggregation::{fold_experience, fold_quality};
use crate::collaborators::{RepositoryDescriptor, WorkingTreeProvider};
use crate::error::AnalysisError;
use crate::logging::structured::LogContext;
use crate::pipeline::{analyze_commit, AnalysisEnvironment, CommitOutcome, JobContext};

use super::registry::{JobSlot, Termination};

/// Why the repository loop stopped early.
enum Interrupt {
    Cancelled,
    Failed(AnalysisError),
}

impl From<AnalysisError> for Interrupt {
    fn from(e: AnalysisError) -> Self {
        Interrupt::Failed(e)
    }
}

/// Start the worker thread for one job.
pub(crate) fn spawn_worker(
    env: AnalysisEnvironment,
    slot: Arc<JobSlot>,
    job: JobContext,
) -> io::Result<JoinHandle<()>> {
    let name = format!("analysis-{}", job.job_id.trim_start_matches("job-"));

    thread::Builder::new().name(name).spawn(move || {
        let ctx = job.log_context();
        slot.mark_running();
        crate::log_info!(ctx, "JOB_STARTED", username = job.username, skip_quality = job.skip_quality_metrics);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(&env, &slot, job)));

        let termination = match outcome {
            Ok(Ok(termination)) => termination,
            Ok(Err(e)) => {
                crate::log_error!(ctx, "JOB_FAILED", error = e.to_string());
                Termination::Failed(e.to_string())
            }
            Err(payload) => {
                let e = AnalysisError::Panicked(panic_message(payload.as_ref()));
                crate::log_error!(ctx, "JOB_FAILED", error = e.to_string());
                Termination::Failed(e.to_string())
            }
        };
        slot.finish(termination);
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one job to a terminal state.
fn run(env: &AnalysisEnvironment, slot: &JobSlot, mut job: JobContext) -> Result<Termination, AnalysisError> {
    let ctx = job.log_context();

    let repositories = env
        .commits
        .repositories(&job.username)
        .map_err(AnalysisError::Discovery)?;

    let total: usize = repositories.iter().map(|r| r.commits.len()).sum();
    slot.set_total_commits(total as u64);
    log::info!(
        "{} DISCOVERY_COMPLETE repositories={} commits={}",
        ctx,
        repositories.len(),
        total
    );

    for repository in &repositories {
        match analyze_repository(env, slot, &mut job, repository, &ctx) {
            Ok(()) => {}
            Err(Interrupt::Cancelled) => {
                crate::log_warn!(ctx, "JOB_CANCELLED", analyzed = job.experience.len());
                return Ok(Termination::Cancelled);
            }
            Err(Interrupt::Failed(e)) => return Err(e),
        }
    }

    let experience = fold_experience(&job.experience);
    let quality = if job.skip_quality_metrics {
        None
    } else {
        Some(fold_quality(&job.quality))
    };

    crate::log_info!(
        ctx,
        "JOB_COMPLETE",
        experience_skills = experience.skills.len(),
        quality_skills = quality.as_ref().map(|q| q.skills.len()).unwrap_or(0)
    );
    Ok(Termination::Completed { experience, quality })
}

/// Clone one repository, analyze each of its commits, then remove the tree.
///
/// A failed clone skips the repository without touching the counters.
fn analyze_repository(
    env: &AnalysisEnvironment,
    slot: &JobSlot,
    job: &mut JobContext,
    repository: &RepositoryDescriptor,
    job_ctx: &LogContext,
) -> Result<(), Interrupt> {
    let ctx = job_ctx.with_repo(&repository.url);

    let checkout_path = match env.working_trees.clone_repo(&repository.url) {
        Ok(Some(path)) => path,
        Ok(None) => {
            log::warn!("{} REPO_SKIPPED reason=clone_failed", ctx);
            return Ok(());
        }
        Err(e) => {
            log::warn!("{} REPO_SKIPPED reason=clone_error error={:#}", ctx, e);
            return Ok(());
        }
    };

    let tree = ClonedTree {
        trees: env.working_trees.as_ref(),
        path: checkout_path,
        ctx: &ctx,
    };
    analyze_commits(env, slot, job, repository, &tree.path, &ctx)
}

/// A cloned working tree, deleted on drop so a panicking commit still
/// cleans up.
struct ClonedTree<'a> {
    trees: &'a dyn WorkingTreeProvider,
    path: PathBuf,
    ctx: &'a LogContext,
}

impl Drop for ClonedTree<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.trees.delete(&self.path) {
            log::warn!(
                "{} WORKTREE_DELETE_FAILED path={} error={:#}",
                self.ctx,
                self.path.display(),
                e
            );
        }
    }
}

fn analyze_commits(
    env: &AnalysisEnvironment,
    slot: &JobSlot,
    job: &mut JobContext,
    repository: &RepositoryDescriptor,
    checkout_path: &Path,
    repo_ctx: &LogContext,
) -> Result<(), Interrupt> {
    for commit in &repository.commits {
        if slot.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        let ctx = repo_ctx.with_commit(&commit.hash);
        let outcome = analyze_commit(env, job, &repository.url, checkout_path, commit, &ctx)?;
        if let CommitOutcome::Skipped { reason } = &outcome {
            log::debug!("{} COMMIT_SKIPPED reason={}", ctx, reason);
        }

        // Every attempted commit counts, hit, miss or skip
        slot.commit_attempted();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::jobs::registry::{JobRegistry, JobState};
    use crate::pipeline::testing::{environment_with, repository, FakeCommitSource, FakeWorkingTree};

    const WAIT: Duration = Duration::from_secs(10);

    #[test]
    fn test_clone_failure_skips_repository() {
        let trees = Arc::new(FakeWorkingTree::with_main_and_app());
        trees.add_file("d1", "server.go", 6, "package main\n");
        trees.fail_clone("https://github.com/octo/broken");
        let env = environment_with(
            trees.clone(),
            FakeCommitSource::new(vec![
                repository("https://github.com/octo/broken", &["d1"]),
                repository("https://github.com/octo/app", &["c1"]),
            ]),
            None,
        );
        let registry = JobRegistry::new(env);

        let receipt = registry.submit("octo", true).unwrap();
        let status = registry.wait(&receipt.job_id, WAIT).unwrap();

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.total_commits, 2);
        assert_eq!(status.analyzed_commits, 1);
        let experience = registry.result(&receipt.job_id).unwrap().experience_metrics.unwrap();
        assert!(!experience.skills.contains_key("Go"));
        assert_eq!(trees.deleted().len(), 1);
    }

    #[test]
    fn test_checkout_failure_still_counts_commit() {
        let trees = Arc::new(FakeWorkingTree::with_main_and_app());
        trees.add_file("c2", "lib.py", 2, "import flask\n");
        trees.fail_checkout("c2");
        let env = environment_with(
            trees,
            FakeCommitSource::new(vec![repository("https://github.com/octo/app", &["c1", "c2"])]),
            None,
        );
        let registry = JobRegistry::new(env);

        let receipt = registry.submit("octo", true).unwrap();
        let status = registry.wait(&receipt.job_id, WAIT).unwrap();

        assert_eq!(status.analyzed_commits, 2);
        let experience = registry.result(&receipt.job_id).unwrap().experience_metrics.unwrap();
        assert!(!experience.skills.contains_key("Flask"));
        assert_eq!(experience.skills["Python"].lines_of_code, 10);
    }

    #[test]
    fn test_skip_quality_leaves_quality_empty() {
        let env = environment_with(
            Arc::new(FakeWorkingTree::with_main_and_app()),
            FakeCommitSource::new(vec![repository("https://github.com/octo/app", &["c1"])]),
            Some(Vec::new()),
        );
        let registry = JobRegistry::new(env);

        let receipt = registry.submit("octo", true).unwrap();
        registry.wait(&receipt.job_id, WAIT).unwrap();

        let job = registry.result(&receipt.job_id).unwrap();
        assert!(job.experience_metrics.is_some());
        assert!(job.quality_metrics.is_none());
    }

    #[test]
    fn test_cancel_before_first_commit() {
        let env = environment_with(
            Arc::new(FakeWorkingTree::with_main_and_app()),
            FakeCommitSource::new(vec![repository("https://github.com/octo/app", &["c1"])]),
            None,
        );
        let slot = Arc::new(JobSlot::for_test("job-cancel"));
        slot.cancel.cancel();

        let handle = spawn_worker(env, slot.clone(), JobContext::new("job-cancel", "octo", true)).unwrap();
        handle.join().unwrap();

        let job = slot.snapshot_for_test();
        assert_eq!(job.status.state, JobState::Cancelled);
        assert!(job.status.completed);
        assert_eq!(job.status.analyzed_commits, 0);
        assert!(job.experience_metrics.is_none());
    }

    struct PanickingSource;

    impl crate::collaborators::CommitSource for PanickingSource {
        fn repositories(&self, _username: &str) -> anyhow::Result<Vec<RepositoryDescriptor>> {
            panic!("discovery exploded")
        }
    }

    #[test]
    fn test_worker_panic_fails_job() {
        let mut env = environment_with(
            Arc::new(FakeWorkingTree::new()),
            FakeCommitSource::new(Vec::new()),
            None,
        );
        env.commits = Arc::new(PanickingSource);
        let registry = JobRegistry::new(env);

        let receipt = registry.submit("octo", false).unwrap();
        let status = registry.wait(&receipt.job_id, WAIT).unwrap();

        assert_eq!(status.state, JobState::Failed);
        assert!(status.error.unwrap().contains("discovery exploded"));
    }

    /// Working trees whose diff panics; everything else goes to `inner`.
    struct PanickingDiff {
        inner: Arc<FakeWorkingTree>,
    }

    impl WorkingTreeProvider for PanickingDiff {
        fn clone_repo(&self, url: &str) -> anyhow::Result<Option<PathBuf>> {
            self.inner.clone_repo(url)
        }

        fn checkout(&self, path: &Path, commit_hash: &str) -> anyhow::Result<()> {
            self.inner.checkout(path, commit_hash)
        }

        fn diff_files(
            &self,
            _path: &Path,
            _commit_hash: &str,
        ) -> anyhow::Result<std::collections::BTreeMap<String, crate::models::FileChange>> {
            panic!("diff exploded")
        }

        fn delete(&self, path: &Path) -> anyhow::Result<()> {
            self.inner.delete(path)
        }
    }

    #[test]
    fn test_commit_panic_still_deletes_tree() {
        let inner = Arc::new(FakeWorkingTree::with_main_and_app());
        let mut env = environment_with(
            inner.clone(),
            FakeCommitSource::new(vec![repository("https://github.com/octo/app", &["c1"])]),
            None,
        );
        env.working_trees = Arc::new(PanickingDiff { inner: inner.clone() });
        let registry = JobRegistry::new(env);

        let receipt = registry.submit("octo", true).unwrap();
        let status = registry.wait(&receipt.job_id, WAIT).unwrap();

        assert_eq!(status.state, JobState::Failed);
        assert!(status.error.unwrap().contains("diff exploded"));
        assert_eq!(inner.deleted(), vec![PathBuf::from("/fake/app")]);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
