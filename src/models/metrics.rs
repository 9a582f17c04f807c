//! Commit-level and overall metric records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::commit::Skill;

/// Lines of code attributed to each skill by one commit.
///
/// `skills` and the keys of `lines_of_code` are always the same set; the
/// fields are private so `add_lines` is the only way to grow either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitExperienceMetrics {
    repo_url: String,
    timestamp: DateTime<Utc>,
    skills: BTreeSet<Skill>,
    lines_of_code: BTreeMap<Skill, u64>,
}

impl CommitExperienceMetrics {
    pub fn new(repo_url: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            repo_url: repo_url.to_string(),
            timestamp,
            skills: BTreeSet::new(),
            lines_of_code: BTreeMap::new(),
        }
    }

    pub fn add_lines(&mut self, skill: &str, lines: u64) {
        *self.lines_of_code.entry(skill.to_string()).or_insert(0) += lines;
        self.skills.insert(skill.to_string());
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn skills(&self) -> &BTreeSet<Skill> {
        &self.skills
    }

    pub fn lines_of_code(&self) -> &BTreeMap<Skill, u64> {
        &self.lines_of_code
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Leaf-level measures the scanner reported for one file.
///
/// Every measure is optional: the scanner omits measures it did not compute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileQualityMeasures {
    pub path: String,
    pub bugs: Option<u64>,
    pub vulnerabilities: Option<u64>,
    pub code_smells: Option<u64>,
    pub complexity: Option<u64>,
    pub coverage: Option<f64>,
    pub duplicated_lines_density: Option<f64>,
    pub reliability_rating: Option<f64>,
    pub security_rating: Option<f64>,
    pub maintainability_rating: Option<f64>,
    pub ncloc: Option<u64>,
    pub cognitive_complexity: Option<u64>,
}

impl FileQualityMeasures {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }
}

/// Quality measures grouped by skill for one commit.
///
/// Integer maps hold sums across the skill's files; float maps hold averages
/// over the files that reported that particular measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitQualityMetrics {
    pub timestamp: DateTime<Utc>,
    pub skills: BTreeSet<Skill>,

    pub bugs: BTreeMap<Skill, u64>,
    pub code_smells: BTreeMap<Skill, u64>,
    pub complexity: BTreeMap<Skill, u64>,
    pub vulnerabilities: BTreeMap<Skill, u64>,

    pub coverage: BTreeMap<Skill, f64>,
    pub duplicated_lines_density: BTreeMap<Skill, f64>,
    pub reliability_rating: BTreeMap<Skill, f64>,
    pub security_rating: BTreeMap<Skill, f64>,
    pub maintainability_rating: BTreeMap<Skill, f64>,
}

impl CommitQualityMetrics {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            skills: BTreeSet::new(),
            bugs: BTreeMap::new(),
            code_smells: BTreeMap::new(),
            complexity: BTreeMap::new(),
            vulnerabilities: BTreeMap::new(),
            coverage: BTreeMap::new(),
            duplicated_lines_density: BTreeMap::new(),
            reliability_rating: BTreeMap::new(),
            security_rating: BTreeMap::new(),
            maintainability_rating: BTreeMap::new(),
        }
    }
}

/// Everything memoized for one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitMetrics {
    pub repo_url: String,
    pub experience: Option<CommitExperienceMetrics>,
    pub quality: Option<CommitQualityMetrics>,
}

/// Experience folded across all commits for one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillExperience {
    pub lines_of_code: u64,
    pub first_commit_timestamp: DateTime<Utc>,
    pub last_commit_timestamp: DateTime<Utc>,
    pub repos: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallExperienceMetrics {
    pub skills: BTreeMap<Skill, SkillExperience>,
}

/// Letter grade for a 1-5 numeric rating average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
    E,
}

impl Rating {
    /// Bucket a 1-5 average: `<=1.5` A, `<=2.5` B, `<=3.5` C, `<=4.5` D, else E.
    pub fn from_score(score: f64) -> Self {
        if score <= 1.5 {
            Rating::A
        } else if score <= 2.5 {
            Rating::B
        } else if score <= 3.5 {
            Rating::C
        } else if score <= 4.5 {
            Rating::D
        } else {
            Rating::E
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality folded across all commits for one skill.
///
/// Every figure is a per-commit average over `total_commits`, the number of
/// commits in which the skill had quality metrics at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillQuality {
    pub bugs_per_commit: f64,
    pub code_smells_per_commit: f64,
    pub complexity_per_commit: f64,
    pub vulnerabilities_per_commit: f64,
    pub code_coverage: f64,
    pub duplicated_lines_density: f64,
    pub reliability_rating: Rating,
    pub security_rating: Rating,
    pub maintainability_rating: Rating,
    pub total_commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallQualityMetrics {
    pub skills: BTreeMap<Skill, SkillQuality>,
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_lines_keeps_skills_in_sync() {
        let mut metrics = CommitExperienceMetrics::new("https://example.com/r", Utc::now());
        metrics.add_lines("Python", 10);
        metrics.add_lines("Django", 10);
        metrics.add_lines("Python", 5);

        let keys: BTreeSet<Skill> = metrics.lines_of_code().keys().cloned().collect();
        assert_eq!(&keys, metrics.skills());
        assert_eq!(metrics.lines_of_code()["Python"], 15);
    }

    #[test]
    fn test_zero_line_file_still_registers_skill() {
        let mut metrics = CommitExperienceMetrics::new("https://example.com/r", Utc::now());
        metrics.add_lines("Go", 0);
        assert!(metrics.skills().contains("Go"));
        assert_eq!(metrics.lines_of_code()["Go"], 0);
    }

    #[test]
    fn test_rating_boundaries() {
        assert_eq!(Rating::from_score(1.4), Rating::A);
        assert_eq!(Rating::from_score(1.5), Rating::A);
        assert_eq!(Rating::from_score(1.6), Rating::B);
        assert_eq!(Rating::from_score(2.5), Rating::B);
        assert_eq!(Rating::from_score(2.6), Rating::C);
        assert_eq!(Rating::from_score(3.5), Rating::C);
        assert_eq!(Rating::from_score(4.5), Rating::D);
        assert_eq!(Rating::from_score(4.6), Rating::E);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::C.to_string(), "C");
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(2.34), 2.3);
        assert_eq!(round1(2.36), 2.4);
        assert_eq!(round1(7.0), 7.0);
    }
}
