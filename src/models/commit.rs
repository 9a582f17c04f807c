//! Commit and file change records.
//!
//! These are transient: produced by the working-tree provider for one commit,
//! classified in place, consumed by the metrics extractor.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimestampError;

/// A language or framework name used as an aggregation key.
pub type Skill = String;

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub extension: String, // lower-cased, no leading dot
    pub additions: u64,
    pub deletions: u64,
    pub line_count: u64,
    pub char_count: u64,

    // Classification, filled once by the skill classifier.
    // `None` is the Unknown sentinel: the file is excluded from all metrics.
    pub language: Option<Skill>,
    pub frameworks: BTreeSet<Skill>,

    pub content: Option<String>,
}

impl FileChange {
    pub fn new(path: &str, additions: u64, deletions: u64, content: Option<String>) -> Self {
        let (line_count, char_count) = content
            .as_deref()
            .map(|c| (c.matches('\n').count() as u64, c.chars().count() as u64))
            .unwrap_or((0, 0));

        Self {
            path: path.to_string(),
            extension: extension_of(path),
            additions,
            deletions,
            line_count,
            char_count,
            language: None,
            frameworks: BTreeSet::new(),
            content,
        }
    }

    /// All skills this file contributes to: its language plus every framework.
    pub fn skills(&self) -> Vec<&Skill> {
        match &self.language {
            Some(language) => std::iter::once(language)
                .chain(self.frameworks.iter())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Extension of a path: the text after the last dot of the file name, lower-cased.
pub fn extension_of(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// One commit under analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub repo_url: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub files: BTreeMap<String, FileChange>,
}

impl CommitRecord {
    pub fn languages(&self) -> BTreeSet<&Skill> {
        self.files
            .values()
            .filter_map(|f| f.language.as_ref())
            .collect()
    }

    pub fn frameworks(&self) -> BTreeSet<&Skill> {
        self.files.values().flat_map(|f| f.frameworks.iter()).collect()
    }
}

/// Parse a commit timestamp, normalising to UTC.
///
/// Accepts RFC 3339, git's `%Y-%m-%d %H:%M:%S %z`, and naive timestamps,
/// which are taken to be UTC.
pub fn parse_commit_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError(raw.to_string()))
}
