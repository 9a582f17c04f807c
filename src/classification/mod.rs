//! Skill classification.
//!
//! Derives a file's language from its extension and its frameworks from its
//! import statements. Everything is table-driven and free of I/O:
//! - `language` - extension to language lookup
//! - `imports` - per-language import line grammar
//! - `frameworks` - fingerprint similarity and content overrides

pub mod frameworks;
pub mod imports;
pub mod language;

pub use frameworks::*;
pub use imports::*;
pub use language::*;

use crate::models::{CommitRecord, FileChange};

/// Fill the language and framework fields of one file.
pub fn classify_file(file: &mut FileChange) {
    file.language = classify_language(file);
    file.frameworks = classify_frameworks(file);
}

/// Classify every file of a commit in place.
pub fn classify_commit(commit: &mut CommitRecord) {
    for file in commit.files.values_mut() {
        classify_file(file);
    }
}
