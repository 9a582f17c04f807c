use std::collections::BTreeSet;

use crate::models::{CommitExperienceMetrics, CommitRecord};

/// Lines added per skill for one commit.
///
/// A file's additions are credited in full to its language and to every
/// framework it uses, so one line can count toward several skills. Summing
/// `lines_of_code` across skills therefore overcounts the commit's size.
///
/// Files in `excluded` or without a language contribute nothing. A file with
/// zero additions still registers its skills.
pub fn compute_experience(
    commit: &CommitRecord,
    excluded: &BTreeSet<String>,
) -> CommitExperienceMetrics {
    let mut metrics = CommitExperienceMetrics::new(&commit.repo_url, commit.timestamp);

    for file in commit.files.values() {
        if excluded.contains(&file.path) {
            continue;
        }
        for skill in file.skills() {
            metrics.add_lines(skill, file.additions);
        }
    }

    metrics
}
