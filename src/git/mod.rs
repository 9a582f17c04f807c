//! `git` CLI backed working trees.
//!
//! Repositories are cloned under a base directory as `<owner>/<repo>`, checked
//! out per commit, and diffed against the commit's first parent.

pub mod command;
pub mod numstat;

pub use command::GitCommand;
pub use numstat::{parse_numstat, NumstatEntry};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::collaborators::WorkingTreeProvider;
use crate::models::FileChange;

/// Hash of git's empty tree, diffed against for root commits.
pub const EMPTY_TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// `WorkingTreeProvider` that shells out to `git`.
#[derive(Debug, Clone)]
pub struct GitWorkingTree {
    base_dir: PathBuf,
}

impl GitWorkingTree {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Where `url` is cloned: `<base_dir>/<owner>/<repo>`.
    pub fn checkout_dir(&self, url: &str) -> PathBuf {
        let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
        let mut parts = trimmed.rsplit(|c: char| c == '/' || c == ':');
        let repo = parts.next().unwrap_or("repo");
        let owner = parts.next().unwrap_or("unknown");
        self.base_dir.join(owner).join(repo)
    }

    fn parent_of(path: &Path, commit_hash: &str) -> Result<String> {
        let parents = GitCommand::for_repo(path, ["rev-list", "--parents", "-n", "1", commit_hash])?
            .output()
            .context("git rev-list failed")?;

        // "<hash> <parent1> <parent2> ..."
        Ok(parents
            .split_whitespace()
            .nth(1)
            .unwrap_or(EMPTY_TREE_SHA)
            .to_string())
    }
}

impl WorkingTreeProvider for GitWorkingTree {
    fn clone_repo(&self, url: &str) -> Result<Option<PathBuf>> {
        let target = self.checkout_dir(url);
        if target.exists() {
            log::info!("CLONE_TARGET_EXISTS path={} action=remove", target.display());
            fs::remove_dir_all(&target)
                .with_context(|| format!("removing stale checkout {}", target.display()))?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let target_arg = target.display().to_string();
        match GitCommand::new(["clone", "--quiet", url, target_arg.as_str()])?.output() {
            Ok(_) => Ok(Some(target)),
            Err(e) => {
                log::warn!("CLONE_FAILED url={} error={}", url, e);
                Ok(None)
            }
        }
    }

    fn checkout(&self, path: &Path, commit_hash: &str) -> Result<()> {
        GitCommand::for_repo(path, ["checkout", "--force", "--quiet", commit_hash])?
            .output()
            .with_context(|| format!("git checkout {} failed", commit_hash))?;
        Ok(())
    }

    fn diff_files(&self, path: &Path, commit_hash: &str) -> Result<BTreeMap<String, FileChange>> {
        let parent = Self::parent_of(path, commit_hash)?;
        let numstat = GitCommand::for_repo(path, ["diff", "--numstat", "-M", parent.as_str(), commit_hash])?
            .output()
            .context("git diff failed")?;

        let mut files = BTreeMap::new();
        for entry in parse_numstat(&numstat) {
            let object = format!("{}:{}", commit_hash, entry.path);
            // Deleted files have no content at this commit
            let content = GitCommand::for_repo(path, ["show", object.as_str()])?.output().ok();

            let file = FileChange::new(&entry.path, entry.additions, entry.deletions, content);
            files.insert(entry.path, file);
        }
        Ok(files)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))
    }
}
