//! Commit metrics extraction.
//!
//! Turns one classified commit into experience metrics (lines per skill) and,
//! when a scan succeeds, quality metrics (scanner measures per skill).

pub mod experience;
pub mod quality;

pub use experience::*;
pub use quality::*;

use std::collections::BTreeSet;

use crate::models::CommitRecord;

/// Paths of every file that has no language and so counts toward no skill.
pub fn identify_excluded_files(commit: &CommitRecord) -> BTreeSet<String> {
    commit
        .files
        .values()
        .filter(|f| f.language.is_none())
        .map(|f| f.path.clone())
        .collect()
}
