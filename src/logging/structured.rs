//! Structured logging utilities.
//!
//! Provides context-aware logging with job_id, repository and commit
//! included in every log message.

use std::fmt;

/// Length of the abbreviated commit hash shown in log lines.
const SHORT_HASH_LEN: usize = 12;

/// Logging context for an analysis job.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub job_id: String,
    pub repo: Option<String>,
    pub commit: Option<String>,
}

impl LogContext {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            repo: None,
            commit: None,
        }
    }

    pub fn with_repo(&self, repo: &str) -> Self {
        Self {
            job_id: self.job_id.clone(),
            repo: Some(repo.to_string()),
            commit: None,
        }
    }

    pub fn with_commit(&self, commit: &str) -> Self {
        Self {
            job_id: self.job_id.clone(),
            repo: self.repo.clone(),
            commit: Some(commit.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[job={}]", self.job_id)?;
        if let Some(repo) = &self.repo {
            write!(f, " [repo={}]", repo)?;
        }
        if let Some(commit) = &self.commit {
            let short = commit.get(..SHORT_HASH_LEN).unwrap_or(commit);
            write!(f, " [commit={}]", short)?;
        }
        Ok(())
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}
