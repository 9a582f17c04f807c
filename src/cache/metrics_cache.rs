//! Metrics cache.
//!
//! Commit metrics keyed by commit hash, shared by every job in the process.
//! An optional persistent store sits behind the in-memory map: writes go to
//! both, reads try memory first and promote store hits.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{CacheError, StoreError};
use crate::models::CommitMetrics;

/// Host-supplied persistent backing for the cache.
pub trait MetricsStore: Send + Sync {
    fn find_by_commit_hash(&self, commit_hash: &str) -> Result<Option<CommitMetrics>, StoreError>;

    fn save(&self, repo_url: &str, commit_hash: &str, metrics: &CommitMetrics) -> Result<(), StoreError>;
}

/// Commit-hash keyed metrics cache.
///
/// The key is the hash alone; the repository URL is kept inside the value.
#[derive(Default)]
pub struct MetricsCache {
    entries: RwLock<HashMap<String, CommitMetrics>>,
    store: Option<Arc<dyn MetricsStore>>,
}

impl std::fmt::Debug for MetricsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCache")
            .field("entries", &self.entries.read().len())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that writes through to `store`.
    pub fn with_store(store: Arc<dyn MetricsStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: Some(store),
        }
    }

    /// Look up a commit.
    ///
    /// A miss is `Ok(None)`; a failing store is `Err(CacheError::Store)`.
    pub fn find(&self, commit_hash: &str) -> Result<Option<CommitMetrics>, CacheError> {
        if let Some(hit) = self.entries.read().get(commit_hash) {
            return Ok(Some(hit.clone()));
        }

        let Some(store) = &self.store else {
            return Ok(None);
        };

        let found = store.find_by_commit_hash(commit_hash)?;
        if let Some(metrics) = &found {
            self.entries
                .write()
                .insert(commit_hash.to_string(), metrics.clone());
        }
        Ok(found)
    }

    /// Insert or replace a commit's metrics. Last writer wins.
    pub fn save(
        &self,
        repo_url: &str,
        commit_hash: &str,
        metrics: CommitMetrics,
    ) -> Result<(), CacheError> {
        if let Some(store) = &self.store {
            store.save(repo_url, commit_hash, &metrics)?;
        }
        self.entries.write().insert(commit_hash.to_string(), metrics);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every in-memory entry. The backing store is untouched.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
