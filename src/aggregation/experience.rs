use std::collections::{BTreeMap, BTreeSet};

use crate::models::{CommitExperienceMetrics, OverallExperienceMetrics, SkillExperience};

/// Fold per-commit experience into per-skill totals.
///
/// Per skill: lines summed, earliest and latest commit timestamps, and the
/// set of repositories the skill appeared in.
pub fn fold_experience(commits: &BTreeMap<String, CommitExperienceMetrics>) -> OverallExperienceMetrics {
    let mut overall = OverallExperienceMetrics::default();

    for metrics in commits.values() {
        for (skill, lines) in metrics.lines_of_code() {
            let timestamp = metrics.timestamp();
            let entry = overall
                .skills
                .entry(skill.clone())
                .or_insert_with(|| SkillExperience {
                    lines_of_code: 0,
                    first_commit_timestamp: timestamp,
                    last_commit_timestamp: timestamp,
                    repos: BTreeSet::new(),
                });

            entry.lines_of_code += lines;
            entry.first_commit_timestamp = entry.first_commit_timestamp.min(timestamp);
            entry.last_commit_timestamp = entry.last_commit_timestamp.max(timestamp);
            entry.repos.insert(metrics.repo_url().to_string());
        }
    }

    overall
}
