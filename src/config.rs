//! Runtime configuration.
//!
//! Settings are read from the environment with defaults for local
//! development. Host and credentials for the scanner are always external.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of task-status queries before a scan is declared timed out.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;

/// Default delay between task-status queries.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Page size for the measures API.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// External static-analysis tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub host_url: String,
    pub token: String,
    /// Token for the measures API; falls back to `token` when empty.
    pub api_token: String,
    pub scanner_binary: String,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub page_size: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            host_url: "http://localhost:9000".to_string(),
            token: String::new(),
            api_token: String::new(),
            scanner_binary: "sonar-scanner".to_string(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ScannerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host_url: env_string("SONAR_HOST_URL", &defaults.host_url),
            token: env_string("SONAR_TOKEN", &defaults.token),
            api_token: env_string("SONAR_API_TOKEN", &defaults.api_token),
            scanner_binary: env_string("SONAR_SCANNER_BIN", &defaults.scanner_binary),
            poll_attempts: env_parse("SCAN_POLL_ATTEMPTS", defaults.poll_attempts),
            poll_interval_ms: env_parse("SCAN_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            page_size: defaults.page_size,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Token used for measures API requests.
    pub fn effective_api_token(&self) -> &str {
        if self.api_token.is_empty() {
            &self.token
        } else {
            &self.api_token
        }
    }
}

/// Top-level analyzer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub scanner: ScannerConfig,
    /// Directory working trees are cloned into.
    pub work_dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            work_dir: PathBuf::from("local_repo_dir"),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_env() -> Self {
        Self {
            scanner: ScannerConfig::from_env(),
            work_dir: env::var("ANALYZER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::default().work_dir),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!(
                "CONFIG_INVALID key={} value={:?} using_default={}",
                key,
                raw,
                default
            );
            default
        }),
        Err(_) => default,
    }
}
