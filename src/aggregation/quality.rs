use std::collections::BTreeMap;

use crate::models::{round1, CommitQualityMetrics, OverallQualityMetrics, Rating, Skill, SkillQuality};

/// Per-skill running sums across commits.
#[derive(Debug, Default)]
struct QualityTotals {
    bugs: f64,
    code_smells: f64,
    complexity: f64,
    vulnerabilities: f64,
    coverage: f64,
    duplicated_lines_density: f64,
    reliability_rating: f64,
    security_rating: f64,
    maintainability_rating: f64,
    commits: u64,
}

impl QualityTotals {
    fn add(&mut self, skill: &Skill, quality: &CommitQualityMetrics) {
        let count = |map: &BTreeMap<Skill, u64>| map.get(skill).copied().unwrap_or(0) as f64;
        let float = |map: &BTreeMap<Skill, f64>| map.get(skill).copied().unwrap_or(0.0);

        self.bugs += count(&quality.bugs);
        self.code_smells += count(&quality.code_smells);
        self.complexity += count(&quality.complexity);
        self.vulnerabilities += count(&quality.vulnerabilities);
        self.coverage += float(&quality.coverage);
        self.duplicated_lines_density += float(&quality.duplicated_lines_density);
        self.reliability_rating += float(&quality.reliability_rating);
        self.security_rating += float(&quality.security_rating);
        self.maintainability_rating += float(&quality.maintainability_rating);
        self.commits += 1;
    }

    fn finish(&self) -> Option<SkillQuality> {
        if self.commits == 0 {
            return None;
        }
        let average = |sum: f64| sum / self.commits as f64;
        let per_commit = |sum: f64| round1(average(sum));

        Some(SkillQuality {
            bugs_per_commit: per_commit(self.bugs),
            code_smells_per_commit: per_commit(self.code_smells),
            complexity_per_commit: per_commit(self.complexity),
            vulnerabilities_per_commit: per_commit(self.vulnerabilities),
            code_coverage: per_commit(self.coverage),
            duplicated_lines_density: per_commit(self.duplicated_lines_density),
            // Letters come from the unrounded average
            reliability_rating: Rating::from_score(average(self.reliability_rating)),
            security_rating: Rating::from_score(average(self.security_rating)),
            maintainability_rating: Rating::from_score(average(self.maintainability_rating)),
            total_commits: self.commits,
        })
    }
}

/// Fold per-commit quality into per-skill averages.
///
/// A skill's `total_commits` is the number of commits listing it in
/// `skills`; every measure is summed over those commits and divided by that
/// count. A commit that lacks a measure for the skill adds zero to the sum.
pub fn fold_quality(commits: &BTreeMap<String, CommitQualityMetrics>) -> OverallQualityMetrics {
    let mut totals: BTreeMap<Skill, QualityTotals> = BTreeMap::new();

    for quality in commits.values() {
        for skill in &quality.skills {
            totals.entry(skill.clone()).or_default().add(skill, quality);
        }
    }

    OverallQualityMetrics {
        skills: totals
            .into_iter()
            .filter_map(|(skill, totals)| totals.finish().map(|q| (skill, q)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn quality(skill: &str, bugs: u64, coverage: f64, rating: f64) -> CommitQualityMetrics {
        let mut q = CommitQualityMetrics::new(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        q.skills = BTreeSet::from([skill.to_string()]);
        q.bugs.insert(skill.to_string(), bugs);
        q.coverage.insert(skill.to_string(), coverage);
        q.reliability_rating.insert(skill.to_string(), rating);
        q.security_rating.insert(skill.to_string(), rating);
        q.maintainability_rating.insert(skill.to_string(), rating);
        q
    }

    #[test]
    fn test_fold_averages_per_commit() {
        let commits = BTreeMap::from([
            ("c1".to_string(), quality("Python", 3, 80.0, 1.0)),
            ("c2".to_string(), quality("Python", 0, 60.0, 3.0)),
        ]);

        let overall = fold_quality(&commits);
        let python = &overall.skills["Python"];
        assert_eq!(python.total_commits, 2);
        assert_eq!(python.bugs_per_commit, 1.5);
        assert_eq!(python.code_coverage, 70.0);
        assert_eq!(python.code_smells_per_commit, 0.0);
        assert_eq!(python.reliability_rating, Rating::B);
    }

    #[test]
    fn test_missing_measure_counts_as_zero() {
        let mut sparse = quality("Go", 4, 0.0, 1.0);
        sparse.coverage.clear();
        let commits = BTreeMap::from([
            ("c1".to_string(), quality("Go", 0, 90.0, 1.0)),
            ("c2".to_string(), sparse),
        ]);

        assert_eq!(fold_quality(&commits).skills["Go"].code_coverage, 45.0);
    }

    #[test]
    fn test_skill_without_commits_is_omitted() {
        let mut empty = CommitQualityMetrics::new(Utc::now());
        empty.bugs.insert("Rust".to_string(), 2);
        let commits = BTreeMap::from([("c1".to_string(), empty)]);

        assert!(fold_quality(&commits).skills.is_empty());
    }

    #[test]
    fn test_rating_letters_from_averages() {
        let commits = BTreeMap::from([("c1".to_string(), quality("PHP", 0, 0.0, 4.6))]);
        let php = &fold_quality(&commits).skills["PHP"];
        assert_eq!(php.reliability_rating, Rating::E);
        assert_eq!(php.maintainability_rating, Rating::E);
    }

    #[test]
    fn test_rating_letter_uses_unrounded_average() {
        let commits = BTreeMap::from([
            ("c1".to_string(), quality("Go", 0, 0.0, 1.0)),
            ("c2".to_string(), quality("Go", 0, 0.0, 1.0)),
            ("c3".to_string(), quality("Go", 0, 0.0, 2.6)),
        ]);

        // 4.6 / 3 is 1.533..., above the 1.5 bound for A
        let go = &fold_quality(&commits).skills["Go"];
        assert_eq!(go.reliability_rating, Rating::B);
        assert_eq!(go.security_rating, Rating::B);
        assert_eq!(go.maintainability_rating, Rating::B);
    }

    proptest! {
        #[test]
        fn test_fold_is_order_independent(
            entries in prop::collection::vec((0u64..20, 0u32..200, 2u32..10, 0usize..2), 1..10)
        ) {
            const SKILLS: [&str; 2] = ["Python", "JavaScript"];

            // Halves are exact in binary, so float sums match in any order
            let built: Vec<CommitQualityMetrics> = entries
                .iter()
                .map(|(bugs, cov, rating, skill)| {
                    quality(SKILLS[*skill], *bugs, *cov as f64 * 0.5, *rating as f64 * 0.5)
                })
                .collect();

            let count = built.len();
            let forward: BTreeMap<String, _> = built
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, q)| (format!("c{:03}", i), q))
                .collect();
            let reversed: BTreeMap<String, _> = built
                .into_iter()
                .enumerate()
                .map(|(i, q)| (format!("c{:03}", count - i), q))
                .collect();

            prop_assert_eq!(fold_quality(&forward), fold_quality(&reversed));
        }

        #[test]
        fn test_rating_is_monotonic(a in 0.0f64..6.0, b in 0.0f64..6.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Rating::from_score(low) <= Rating::from_score(high));
        }
    }
}
