//! In-memory collaborators for pipeline and job tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use crate::cache::MetricsCache;
use crate::collaborators::{
    CommitDescriptor, CommitSource, NoProfiles, RepositoryDescriptor, WorkingTreeProvider,
};
use crate::error::ScanError;
use crate::models::{FileChange, FileQualityMeasures};
use crate::scan::coordinator::{ScanBackend, ScanCoordinator, TaskId, TaskStatus};

use super::context::AnalysisEnvironment;

pub const MAIN_PY: &str = "import os\n\ndef main():\n    print(os.getcwd())\n";
pub const APP_JS: &str = "import React from 'react';\n\nexport default function App() {\n  return null;\n}\n";

pub fn descriptor(hash: &str) -> CommitDescriptor {
    CommitDescriptor {
        hash: hash.to_string(),
        message: format!("commit {}", hash),
        timestamp: Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap(),
    }
}

#[derive(Default)]
struct TreeState {
    files: HashMap<String, BTreeMap<String, FileChange>>,
    failing_checkouts: HashSet<String>,
    failing_clones: HashSet<String>,
    checkout_calls: u32,
    diff_calls: u32,
    deleted: Vec<PathBuf>,
}

/// Working trees served from memory: every commit's diff is scripted.
#[derive(Default)]
pub struct FakeWorkingTree {
    state: Mutex<TreeState>,
}

impl FakeWorkingTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `c1` adds `main.py` (10 lines) and `app.js` (20 lines).
    pub fn with_main_and_app() -> Self {
        let trees = Self::new();
        trees.add_file("c1", "main.py", 10, MAIN_PY);
        trees.add_file("c1", "app.js", 20, APP_JS);
        trees
    }

    pub fn add_file(&self, commit: &str, path: &str, additions: u64, content: &str) {
        let file = FileChange::new(path, additions, 0, Some(content.to_string()));
        self.state
            .lock()
            .files
            .entry(commit.to_string())
            .or_default()
            .insert(path.to_string(), file);
    }

    pub fn fail_checkout(&self, commit: &str) {
        self.state.lock().failing_checkouts.insert(commit.to_string());
    }

    pub fn fail_clone(&self, url: &str) {
        self.state.lock().failing_clones.insert(url.to_string());
    }

    pub fn checkout_calls(&self) -> u32 {
        self.state.lock().checkout_calls
    }

    pub fn diff_calls(&self) -> u32 {
        self.state.lock().diff_calls
    }

    pub fn deleted(&self) -> Vec<PathBuf> {
        self.state.lock().deleted.clone()
    }
}

impl WorkingTreeProvider for FakeWorkingTree {
    fn clone_repo(&self, url: &str) -> Result<Option<PathBuf>> {
        if self.state.lock().failing_clones.contains(url) {
            return Ok(None);
        }
        Ok(Some(PathBuf::from("/fake").join(url.rsplit('/').next().unwrap_or("repo"))))
    }

    fn checkout(&self, _path: &Path, commit_hash: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.checkout_calls += 1;
        if state.failing_checkouts.contains(commit_hash) {
            return Err(anyhow!("reference is not a tree: {}", commit_hash));
        }
        Ok(())
    }

    fn diff_files(&self, _path: &Path, commit_hash: &str) -> Result<BTreeMap<String, FileChange>> {
        let mut state = self.state.lock();
        state.diff_calls += 1;
        Ok(state.files.get(commit_hash).cloned().unwrap_or_default())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.state.lock().deleted.push(path.to_path_buf());
        Ok(())
    }
}

/// Discovery that returns a fixed repository list, or fails.
pub struct FakeCommitSource {
    pub repositories: Result<Vec<RepositoryDescriptor>, String>,
}

impl FakeCommitSource {
    pub fn new(repositories: Vec<RepositoryDescriptor>) -> Self {
        Self {
            repositories: Ok(repositories),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            repositories: Err(message.to_string()),
        }
    }
}

impl CommitSource for FakeCommitSource {
    fn repositories(&self, _username: &str) -> Result<Vec<RepositoryDescriptor>> {
        self.repositories.clone().map_err(|e| anyhow!(e))
    }
}

pub fn repository(url: &str, hashes: &[&str]) -> RepositoryDescriptor {
    RepositoryDescriptor {
        url: url.to_string(),
        name: url.rsplit('/').next().unwrap_or(url).to_string(),
        commits: hashes.iter().map(|h| descriptor(h)).collect(),
    }
}

/// Backend whose every scan succeeds immediately with the same measures.
pub struct FixedScanBackend {
    measures: Vec<FileQualityMeasures>,
}

impl ScanBackend for FixedScanBackend {
    fn submit(&self, project_key: &str, _checkout_path: &Path) -> Result<TaskId, ScanError> {
        Ok(format!("task-{}", project_key))
    }

    fn task_status(&self, _task_id: &str) -> Result<TaskStatus, ScanError> {
        Ok(TaskStatus::Success)
    }

    fn file_measures(&self, _project_key: &str, _checkout_path: &Path) -> Result<Vec<FileQualityMeasures>, ScanError> {
        Ok(self.measures.clone())
    }
}

/// Backend whose scanner always exits non-zero.
pub struct BrokenScanBackend;

impl ScanBackend for BrokenScanBackend {
    fn submit(&self, _project_key: &str, _checkout_path: &Path) -> Result<TaskId, ScanError> {
        Err(ScanError::ExitStatus {
            code: Some(2),
            stderr: "ERROR: Not authorized".to_string(),
        })
    }

    fn task_status(&self, _task_id: &str) -> Result<TaskStatus, ScanError> {
        Ok(TaskStatus::Failed)
    }

    fn file_measures(&self, _project_key: &str, _checkout_path: &Path) -> Result<Vec<FileQualityMeasures>, ScanError> {
        Ok(Vec::new())
    }
}

/// Environment over `trees`; scans succeed with `measures`, or fail when `None`.
pub fn environment(trees: Arc<FakeWorkingTree>, measures: Option<Vec<FileQualityMeasures>>) -> AnalysisEnvironment {
    environment_with(trees, FakeCommitSource::new(Vec::new()), measures)
}

pub fn environment_with(
    trees: Arc<FakeWorkingTree>,
    source: FakeCommitSource,
    measures: Option<Vec<FileQualityMeasures>>,
) -> AnalysisEnvironment {
    let backend: Arc<dyn ScanBackend> = match measures {
        Some(measures) => Arc::new(FixedScanBackend { measures }),
        None => Arc::new(BrokenScanBackend),
    };

    AnalysisEnvironment {
        commits: Arc::new(source),
        working_trees: trees,
        profiles: Arc::new(NoProfiles),
        cache: Arc::new(MetricsCache::new()),
        scanner: ScanCoordinator::new(backend).with_polling(2, Duration::ZERO),
    }
}
