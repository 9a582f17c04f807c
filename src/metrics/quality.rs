use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::logging::structured::LogContext;
use crate::models::{round1, CommitQualityMetrics, CommitRecord, FileQualityMeasures, Skill};
use crate::scan::coordinator::{ScanCoordinator, ScanOutcome};

/// Running sum and contributor count for one float measure of one skill.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        round1(self.sum / self.count as f64)
    }
}

fn add_count(map: &mut BTreeMap<Skill, u64>, skill: &Skill, value: Option<u64>) {
    if let Some(value) = value {
        *map.entry(skill.clone()).or_insert(0) += value;
    }
}

fn add_mean(map: &mut BTreeMap<Skill, Mean>, skill: &Skill, value: Option<f64>) {
    if let Some(value) = value {
        map.entry(skill.clone()).or_default().add(value);
    }
}

fn finish(map: BTreeMap<Skill, Mean>) -> BTreeMap<Skill, f64> {
    map.into_iter().map(|(skill, mean)| (skill, mean.value())).collect()
}

/// Group per-file scanner measures by skill.
///
/// Integer measures are summed; float measures are averaged over the files
/// that reported them. Measures for files outside the commit, in `excluded`,
/// or without a language are ignored.
pub fn aggregate_file_measures(
    commit: &CommitRecord,
    excluded: &BTreeSet<String>,
    measures: &[FileQualityMeasures],
) -> CommitQualityMetrics {
    let mut quality = CommitQualityMetrics::new(commit.timestamp);

    let mut coverage = BTreeMap::new();
    let mut duplication = BTreeMap::new();
    let mut reliability = BTreeMap::new();
    let mut security = BTreeMap::new();
    let mut maintainability = BTreeMap::new();

    for measure in measures {
        if excluded.contains(&measure.path) {
            continue;
        }
        let Some(file) = commit.files.get(&measure.path) else {
            continue;
        };

        for skill in file.skills() {
            add_count(&mut quality.bugs, skill, measure.bugs);
            add_count(&mut quality.code_smells, skill, measure.code_smells);
            add_count(&mut quality.complexity, skill, measure.complexity);
            add_count(&mut quality.vulnerabilities, skill, measure.vulnerabilities);

            add_mean(&mut coverage, skill, measure.coverage);
            add_mean(&mut duplication, skill, measure.duplicated_lines_density);
            add_mean(&mut reliability, skill, measure.reliability_rating);
            add_mean(&mut security, skill, measure.security_rating);
            add_mean(&mut maintainability, skill, measure.maintainability_rating);
        }
    }

    quality.coverage = finish(coverage);
    quality.duplicated_lines_density = finish(duplication);
    quality.reliability_rating = finish(reliability);
    quality.security_rating = finish(security);
    quality.maintainability_rating = finish(maintainability);

    quality.skills = quality
        .bugs
        .keys()
        .chain(quality.code_smells.keys())
        .chain(quality.complexity.keys())
        .chain(quality.vulnerabilities.keys())
        .chain(quality.coverage.keys())
        .chain(quality.duplicated_lines_density.keys())
        .chain(quality.reliability_rating.keys())
        .chain(quality.security_rating.keys())
        .chain(quality.maintainability_rating.keys())
        .cloned()
        .collect();

    quality
}

/// Scan a checked-out commit and group the results by skill.
///
/// Returns `None` when the scan fails or times out.
pub fn compute_quality(
    commit: &CommitRecord,
    excluded: &BTreeSet<String>,
    checkout_path: &Path,
    coordinator: &ScanCoordinator,
    ctx: &LogContext,
) -> Option<CommitQualityMetrics> {
    match coordinator.scan(&commit.hash, checkout_path, excluded, ctx) {
        ScanOutcome::Success(measures) => {
            let quality = aggregate_file_measures(commit, excluded, &measures);
            log::debug!(
                "{} QUALITY_COMPUTED files={} skills={}",
                ctx,
                measures.len(),
                quality.skills.len()
            );
            Some(quality)
        }
        ScanOutcome::Failed(_) | ScanOutcome::TimedOut { .. } => None,
    }
}
