//! SonarQube-compatible scan backend.
//!
//! Submits analyses by running the scanner CLI against a checked-out tree,
//! then talks to the server's compute-engine and measures APIs over HTTP.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use ureq::{Agent, AgentBuilder, Request};

use crate::config::ScannerConfig;
use crate::error::ScanError;
use crate::models::FileQualityMeasures;
use crate::scan::coordinator::{ScanBackend, TaskId, TaskStatus};

/// Measures requested for every file.
pub const METRIC_KEYS: &[&str] = &[
    "bugs",
    "vulnerabilities",
    "code_smells",
    "reliability_rating",
    "security_rating",
    "sqale_rating",
    "coverage",
    "duplicated_lines_density",
    "ncloc",
    "complexity",
    "cognitive_complexity",
];

/// Upper bound on measures API pages fetched for one project.
const MAX_PAGES: u32 = 200;

/// Per-request HTTP timeout.
const HTTP_TIMEOUT_SECS: u64 = 30;

lazy_static! {
    /// Task link printed by the scanner on upload.
    static ref TASK_URL_PATTERN: Regex =
        Regex::new(r"api/ce/task\?id=([A-Za-z0-9_\-]+)").unwrap();
}

#[derive(Debug, Deserialize)]
struct CeTaskResponse {
    task: CeTask,
}

#[derive(Debug, Deserialize)]
struct CeTask {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct ComponentTreeResponse {
    #[serde(default)]
    pub paging: Option<Paging>,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(rename = "pageIndex")]
    pub page_index: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub qualifier: String,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

#[derive(Debug, Deserialize)]
pub struct Measure {
    pub metric: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Scanner CLI plus HTTP API client.
pub struct SonarBackend {
    config: ScannerConfig,
    agent: Agent,
}

impl std::fmt::Debug for SonarBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarBackend")
            .field("host_url", &self.config.host_url)
            .field("scanner_binary", &self.config.scanner_binary)
            .finish()
    }
}

impl SonarBackend {
    pub fn new(config: ScannerConfig) -> Self {
        let agent = AgentBuilder::new()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build();
        Self { config, agent }
    }

    fn get(&self, path: &str) -> Request {
        let url = format!("{}{}", self.config.host_url.trim_end_matches('/'), path);
        let request = self.agent.get(&url);
        let token = self.config.effective_api_token();
        if token.is_empty() {
            request
        } else {
            request.set("Authorization", &format!("Bearer {}", token))
        }
    }

    fn scanner_args(&self, project_key: &str, checkout_path: &Path) -> Vec<String> {
        let mut args = vec![
            format!("-Dsonar.projectKey={}", project_key),
            format!("-Dsonar.projectName=Commit Analysis {}", project_key),
            "-Dsonar.projectVersion=1.0".to_string(),
            format!("-Dsonar.sources={}", checkout_path.display()),
            format!("-Dsonar.host.url={}", self.config.host_url),
            "-Dsonar.sourceEncoding=UTF-8".to_string(),
            "-Dsonar.scm.disabled=true".to_string(),
        ];
        if !self.config.token.is_empty() {
            args.push(format!("-Dsonar.token={}", self.config.token));
        }
        args
    }
}

impl ScanBackend for SonarBackend {
    fn submit(&self, project_key: &str, checkout_path: &Path) -> Result<TaskId, ScanError> {
        let scanner = which::which(&self.config.scanner_binary)
            .map_err(|e| ScanError::ScannerNotFound(format!("{}: {}", self.config.scanner_binary, e)))?;

        let args = self.scanner_args(project_key, checkout_path);
        log_scanner_args(&args);

        let output = Command::new(&scanner)
            .args(&args)
            .current_dir(checkout_path)
            .output()?;

        if !output.status.success() {
            return Err(ScanError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(task_id) = parse_task_id(&stdout) {
            return Ok(task_id);
        }

        let report = checkout_path.join(".scannerwork").join("report-task.txt");
        std::fs::read_to_string(report)
            .ok()
            .and_then(|contents| parse_report_task(&contents))
            .ok_or(ScanError::MissingTaskId)
    }

    fn task_status(&self, task_id: &str) -> Result<TaskStatus, ScanError> {
        let response: CeTaskResponse = self
            .get("/api/ce/task")
            .query("id", task_id)
            .call()
            .map_err(|e| ScanError::Http(e.to_string()))?
            .into_json()
            .map_err(|e| ScanError::Decode(e.to_string()))?;

        Ok(TaskStatus::from_api(&response.task.status))
    }

    fn file_measures(
        &self,
        project_key: &str,
        checkout_path: &Path,
    ) -> Result<Vec<FileQualityMeasures>, ScanError> {
        let metric_keys = METRIC_KEYS.join(",");
        let page_size = self.config.page_size.max(1);
        let mut measures = Vec::new();

        for page in 1..=MAX_PAGES {
            let response: ComponentTreeResponse = self
                .get("/api/measures/component_tree")
                .query("component", project_key)
                .query("metricKeys", &metric_keys)
                .query("qualifiers", "FIL")
                .query("strategy", "leaves")
                .query("ps", &page_size.to_string())
                .query("p", &page.to_string())
                .call()
                .map_err(|e| ScanError::Http(e.to_string()))?
                .into_json()
                .map_err(|e| ScanError::Decode(e.to_string()))?;

            let fetched = response.components.len();
            measures.extend(parse_components(&response.components, checkout_path));

            if !has_more_pages(page, fetched, response.paging.as_ref()) {
                break;
            }
        }

        Ok(measures)
    }
}

/// Whether another page follows `page`.
///
/// Uses the page size the server reports, which may be smaller than the one
/// requested.
fn has_more_pages(page: u32, fetched: usize, paging: Option<&Paging>) -> bool {
    let Some(paging) = paging else {
        return false;
    };
    let page_size = if paging.page_size > 0 {
        paging.page_size
    } else {
        fetched as u32
    };
    fetched > 0 && page.saturating_mul(page_size) < paging.total
}

/// Log scanner arguments with the token redacted.
fn log_scanner_args(args: &[String]) {
    for (index, arg) in args.iter().enumerate() {
        let shown = if arg.starts_with("-Dsonar.token=") {
            "-Dsonar.token=<redacted>"
        } else {
            arg.as_str()
        };
        log::debug!("SCANNER_ARG index={} value={}", index, shown);
    }
}

/// Task id from the scanner's console output.
pub fn parse_task_id(stdout: &str) -> Option<String> {
    TASK_URL_PATTERN
        .captures(stdout)
        .map(|c| c[1].to_string())
}

/// Task id from the scanner's `report-task.txt`.
pub fn parse_report_task(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.trim().strip_prefix("ceTaskId="))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// File-level measures from a component tree page.
///
/// Non-file components are skipped; paths are made relative to the checkout.
pub fn parse_components(components: &[Component], checkout_path: &Path) -> Vec<FileQualityMeasures> {
    let root = checkout_path.display().to_string();
    let root = root.trim_end_matches('/');

    components
        .iter()
        .filter(|c| c.qualifier == "FIL")
        .filter_map(|c| {
            let raw = c.path.as_deref()?;
            let path = raw
                .strip_prefix(root)
                .unwrap_or(raw)
                .trim_start_matches("./")
                .trim_start_matches('/');

            let mut file = FileQualityMeasures::new(path);
            for measure in &c.measures {
                let Some(value) = measure.value.as_deref() else {
                    continue;
                };
                match measure.metric.as_str() {
                    "bugs" => file.bugs = parse_count(value),
                    "vulnerabilities" => file.vulnerabilities = parse_count(value),
                    "code_smells" => file.code_smells = parse_count(value),
                    "complexity" => file.complexity = parse_count(value),
                    "ncloc" => file.ncloc = parse_count(value),
                    "cognitive_complexity" => file.cognitive_complexity = parse_count(value),
                    "coverage" => file.coverage = parse_ratio(value),
                    "duplicated_lines_density" => file.duplicated_lines_density = parse_ratio(value),
                    "reliability_rating" => file.reliability_rating = parse_ratio(value),
                    "security_rating" => file.security_rating = parse_ratio(value),
                    "sqale_rating" => file.maintainability_rating = parse_ratio(value),
                    _ => {}
                }
            }
            Some(file)
        })
        .collect()
}

fn parse_count(value: &str) -> Option<u64> {
    let value = value.trim();
    value.parse::<u64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}

fn parse_ratio(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
