//! Per-commit analysis.
//!
//! Routes one commit through the cache, the working tree, the classifier and
//! the metrics extractor:
//! 1. Cache lookup (a complete hit short-circuits everything else)
//! 2. Checkout and diff
//! 3. Skill classification
//! 4. Experience metrics
//! 5. Quality metrics via the scanner, unless skipped
//! 6. Cache write-back

use std::path::Path;

use crate::classification::classify_commit;
use crate::collaborators::CommitDescriptor;
use crate::error::AnalysisError;
use crate::logging::structured::LogContext;
use crate::metrics::{compute_experience, compute_quality, identify_excluded_files};
use crate::models::{CommitMetrics, CommitQualityMetrics, CommitRecord};

use super::context::{AnalysisEnvironment, JobContext};

/// What happened to one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Metrics came from the cache; nothing was recomputed.
    CacheHit,
    /// Metrics were computed and saved.
    Analyzed { skills: usize, quality: bool },
    /// Checkout or diff failed; nothing recorded.
    Skipped { reason: String },
}

/// Whether a cached entry satisfies this run without recomputation.
///
/// A commit with no classified files is never scanned, so its entry is
/// complete without quality.
fn is_complete(cached: &CommitMetrics, skip_quality: bool) -> bool {
    match &cached.experience {
        Some(experience) => skip_quality || experience.is_empty() || cached.quality.is_some(),
        None => false,
    }
}

/// Analyze one commit of a checked-out repository.
///
/// Only cache failures are errors; working tree failures skip the commit.
pub fn analyze_commit(
    env: &AnalysisEnvironment,
    job: &mut JobContext,
    repo_url: &str,
    checkout_path: &Path,
    descriptor: &CommitDescriptor,
    ctx: &LogContext,
) -> Result<CommitOutcome, AnalysisError> {
    let cached = env.cache.find(&descriptor.hash)?;

    if let Some(hit) = &cached {
        if is_complete(hit, job.skip_quality_metrics) {
            log::debug!("{} COMMIT_CACHE_HIT", ctx);
            if let Some(experience) = hit.experience.clone() {
                job.record(&descriptor.hash, experience, hit.quality.clone());
            }
            return Ok(CommitOutcome::CacheHit);
        }
    }

    if let Err(e) = env.working_trees.checkout(checkout_path, &descriptor.hash) {
        log::warn!("{} COMMIT_CHECKOUT_FAILED error={:#}", ctx, e);
        return Ok(CommitOutcome::Skipped {
            reason: format!("checkout: {:#}", e),
        });
    }

    let files = match env.working_trees.diff_files(checkout_path, &descriptor.hash) {
        Ok(files) => files,
        Err(e) => {
            log::warn!("{} COMMIT_DIFF_FAILED error={:#}", ctx, e);
            return Ok(CommitOutcome::Skipped {
                reason: format!("diff: {:#}", e),
            });
        }
    };

    let mut commit = CommitRecord {
        hash: descriptor.hash.clone(),
        repo_url: repo_url.to_string(),
        timestamp: descriptor.timestamp,
        message: descriptor.message.clone(),
        files,
    };
    classify_commit(&mut commit);

    let excluded = identify_excluded_files(&commit);
    let experience = compute_experience(&commit, &excluded);

    let quality = if job.skip_quality_metrics {
        None
    } else if experience.is_empty() {
        log::debug!("{} SCAN_SKIPPED reason=no_classified_files", ctx);
        None
    } else {
        compute_quality(&commit, &excluded, checkout_path, &env.scanner, ctx)
    };

    log::info!(
        "{} COMMIT_ANALYZED files={} excluded={} skills={} quality={}",
        ctx,
        commit.files.len(),
        excluded.len(),
        experience.skills().len(),
        quality.is_some()
    );

    // A run that skipped the scan keeps whatever quality an earlier run cached
    let saved_quality: Option<CommitQualityMetrics> =
        quality.clone().or_else(|| cached.and_then(|c| c.quality));

    env.cache.save(
        repo_url,
        &descriptor.hash,
        CommitMetrics {
            repo_url: repo_url.to_string(),
            experience: Some(experience.clone()),
            quality: saved_quality,
        },
    )?;

    let outcome = CommitOutcome::Analyzed {
        skills: experience.skills().len(),
        quality: quality.is_some(),
    };
    job.record(&descriptor.hash, experience, quality);
    Ok(outcome)
}
