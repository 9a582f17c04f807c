//! Contracts for host-supplied collaborators.
//!
//! The core never talks to source-hosting APIs or user directories itself.
//! Implementations return `anyhow::Result`; the pipeline converts failures
//! into its own error types or skips the affected repository or commit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::FileChange;

/// One commit as listed by discovery. Merge commits are already filtered out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDescriptor {
    pub hash: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A repository and the user's commits in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub url: String,
    pub name: String,
    pub commits: Vec<CommitDescriptor>,
}

/// Lists the repositories and commits authored by a user.
pub trait CommitSource: Send + Sync {
    fn repositories(&self, username: &str) -> anyhow::Result<Vec<RepositoryDescriptor>>;
}

/// Materializes repository working trees.
pub trait WorkingTreeProvider: Send + Sync {
    /// Clone `url` into a fresh working tree. `Ok(None)` when the clone failed
    /// in a way that should skip the repository.
    fn clone_repo(&self, url: &str) -> anyhow::Result<Option<PathBuf>>;

    fn checkout(&self, path: &Path, commit_hash: &str) -> anyhow::Result<()>;

    /// Files changed by `commit_hash` relative to its first parent, with content.
    fn diff_files(&self, path: &Path, commit_hash: &str) -> anyhow::Result<BTreeMap<String, FileChange>>;

    fn delete(&self, path: &Path) -> anyhow::Result<()>;
}

/// Resolves a username to a human-readable display name.
pub trait UserProfileResolver: Send + Sync {
    fn display_name(&self, username: &str) -> anyhow::Result<Option<String>>;
}

/// Resolver that always falls back to the username.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProfiles;

impl UserProfileResolver for NoProfiles {
    fn display_name(&self, _username: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
